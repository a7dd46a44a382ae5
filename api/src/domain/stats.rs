//! Dashboard counters

use serde::Serialize;
use sqlx::{Executor, Postgres};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Stats {
    pub total_images: i64,
    pub total_posts: i64,
    pub published_posts: i64,
    pub failed_posts: i64,
}

pub async fn get_stats<'e, E>(executor: E) -> Result<Stats, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM images) AS total_images,
            (SELECT COUNT(*) FROM posts) AS total_posts,
            (SELECT COUNT(*) FROM posts WHERE status = 'published') AS published_posts,
            (SELECT COUNT(*) FROM posts WHERE status = 'failed') AS failed_posts
        "#,
    )
    .fetch_one(executor)
    .await
}
