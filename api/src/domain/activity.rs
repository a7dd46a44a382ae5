//! Activity log domain - append-only audit trail

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Executor, Postgres};

/// Kinds of activity shown on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Upload,
    Delete,
    Post,
    Blog,
    Error,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Upload => "upload",
            ActivityKind::Delete => "delete",
            ActivityKind::Post => "post",
            ActivityKind::Blog => "blog",
            ActivityKind::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ActivityEntry {
    pub id: i32,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub message: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

pub async fn record_activity<'e, E>(
    executor: E,
    kind: ActivityKind,
    message: &str,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query("INSERT INTO activity_log (type, message) VALUES ($1, $2)")
        .bind(kind.as_str())
        .bind(message)
        .execute(executor)
        .await?;

    Ok(())
}

/// Most recent entries, newest first
pub async fn recent_activity<'e, E>(executor: E, limit: i64) -> Result<Vec<ActivityEntry>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, type, message, created_at
        FROM activity_log
        ORDER BY created_at DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(executor)
    .await
}
