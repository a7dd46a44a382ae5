//! Post domain - Instagram publish attempts and their outcome
//!
//! A post is inserted as `draft` before the remote publish starts and moves to
//! exactly one terminal state: `published` or `failed`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef};
use sqlx::{Decode, Encode, Executor, Postgres, Type};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Draft,
    Published,
    Failed,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
            PostStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "published" => PostStatus::Published,
            "failed" => PostStatus::Failed,
            _ => PostStatus::Draft,
        }
    }
}

impl Type<Postgres> for PostStatus {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <String as Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for PostStatus {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <String as Decode<Postgres>>::decode(value)?;
        Ok(PostStatus::parse(&s))
    }
}

impl Encode<'_, Postgres> for PostStatus {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        <String as Encode<Postgres>>::encode_by_ref(&self.as_str().to_owned(), buf)
    }
}

/// Post joined with its image, as listed on the dashboard
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PostRow {
    pub id: i32,
    pub image_id: Option<String>,
    pub caption: Option<String>,
    pub instagram_id: Option<String>,
    pub status: PostStatus,
    pub error: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
    pub image_name: Option<String>,
}

/// Insert a draft post and return its id
pub async fn insert_draft<'e, E>(
    executor: E,
    image_id: Option<&str>,
    caption: &str,
) -> Result<i32, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let row: (i32,) = sqlx::query_as(
        r#"
        INSERT INTO posts (image_id, caption, status)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(image_id)
    .bind(caption)
    .bind(PostStatus::Draft)
    .fetch_one(executor)
    .await?;

    Ok(row.0)
}

pub async fn mark_published<'e, E>(
    executor: E,
    post_id: i32,
    instagram_id: &str,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        UPDATE posts
        SET status = $1, instagram_id = $2, published_at = NOW(), error = NULL
        WHERE id = $3
        "#,
    )
    .bind(PostStatus::Published)
    .bind(instagram_id)
    .bind(post_id)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn mark_failed<'e, E>(executor: E, post_id: i32, error: &str) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query("UPDATE posts SET status = $1, error = $2 WHERE id = $3")
        .bind(PostStatus::Failed)
        .bind(error)
        .bind(post_id)
        .execute(executor)
        .await?;

    Ok(())
}

/// All posts with image URL and name, newest first
pub async fn list_posts<'e, E>(executor: E) -> Result<Vec<PostRow>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT p.id, p.image_id, p.caption, p.instagram_id, p.status, p.error,
               p.created_at, p.published_at,
               i.public_url AS image_url, i.original_name AS image_name
        FROM posts p
        LEFT JOIN images i ON p.image_id = i.id
        ORDER BY p.created_at DESC
        "#,
    )
    .fetch_all(executor)
    .await
}
