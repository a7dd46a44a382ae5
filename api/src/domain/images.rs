//! Image domain - DB queries for uploaded images
//!
//! All functions use the generic Executor pattern, allowing them to work with
//! both `&PgPool` (for standalone queries) and `&mut PgConnection` (for transactions).

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Executor, Postgres};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Image {
    pub id: String,
    pub original_name: String,
    pub filename: String,
    pub mimetype: Option<String>,
    pub size: Option<i32>,
    pub public_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Fields recorded for a freshly stored upload
#[derive(Debug)]
pub struct NewImage<'a> {
    pub id: &'a str,
    pub original_name: &'a str,
    pub filename: &'a str,
    pub mimetype: &'a str,
    pub size: i32,
    pub public_url: &'a str,
}

pub async fn insert_image<'e, E>(executor: E, image: &NewImage<'_>) -> Result<Image, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        INSERT INTO images (id, original_name, filename, mimetype, size, public_url)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, original_name, filename, mimetype, size, public_url, created_at
        "#,
    )
    .bind(image.id)
    .bind(image.original_name)
    .bind(image.filename)
    .bind(image.mimetype)
    .bind(image.size)
    .bind(image.public_url)
    .fetch_one(executor)
    .await
}

/// All images, newest first
pub async fn list_images<'e, E>(executor: E) -> Result<Vec<Image>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, original_name, filename, mimetype, size, public_url, created_at
        FROM images
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(executor)
    .await
}

pub async fn get_image<'e, E>(executor: E, id: &str) -> Result<Option<Image>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, original_name, filename, mimetype, size, public_url, created_at
        FROM images
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Delete an image row; posts referencing it keep their row with a NULL image
pub async fn delete_image<'e, E>(executor: E, id: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("DELETE FROM images WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}
