//! Blog history domain - titles and categories of published articles

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Executor, Postgres};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BlogHistoryEntry {
    pub id: i32,
    pub title: String,
    pub category: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

pub async fn insert_blog_history<'e, E>(
    executor: E,
    title: &str,
    category: &str,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query("INSERT INTO blog_history (title, category) VALUES ($1, $2)")
        .bind(title)
        .bind(category)
        .execute(executor)
        .await?;

    Ok(())
}

/// Most recent articles, newest first
pub async fn recent_blog_history<'e, E>(
    executor: E,
    limit: i64,
) -> Result<Vec<BlogHistoryEntry>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, title, category, created_at
        FROM blog_history
        ORDER BY created_at DESC, id DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(executor)
    .await
}
