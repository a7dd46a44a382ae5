//! Daily blog publishing background job using apalis
//!
//! A cron stream is piped into Postgres-backed apalis storage; each tick
//! generates an article and publishes it to WordPress.

use apalis::prelude::*;
use apalis_cron::{CronStream, Schedule};
use apalis_sql::postgres::PostgresStorage;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::str::FromStr;
use std::sync::Arc;

use crate::services::blog::BlogPublisher;

/// Job input - one tick of the daily schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogJob {
    pub scheduled_at: chrono::DateTime<chrono::Utc>,
}

impl From<chrono::DateTime<chrono::Utc>> for BlogJob {
    fn from(dt: chrono::DateTime<chrono::Utc>) -> Self {
        BlogJob { scheduled_at: dt }
    }
}

/// Shared context for the blog job
#[derive(Clone)]
pub struct BlogContext {
    pub publisher: Arc<BlogPublisher>,
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Invalid cron expression {expr:?}: {reason}")]
    InvalidCron { expr: String, reason: String },
    #[error("Failed to set up job storage: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("Worker monitor failed: {0}")]
    Monitor(String),
}

/// Accept standard 5-field cron (minute first) by adding a zero seconds field
pub fn normalize_cron(expr: &str) -> String {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() == 5 {
        format!("0 {}", fields.join(" "))
    } else {
        fields.join(" ")
    }
}

/// Parse a 5- or 6-field cron expression (UTC)
pub fn parse_schedule(expr: &str) -> Result<Schedule, SchedulerError> {
    let normalized = normalize_cron(expr);
    Schedule::from_str(&normalized).map_err(|e| SchedulerError::InvalidCron {
        expr: expr.to_string(),
        reason: e.to_string(),
    })
}

/// Job handler - always returns Ok; a failed run is logged and waits for the next tick
async fn process_blog_job(job: BlogJob, ctx: Data<BlogContext>) -> Result<(), Error> {
    tracing::info!(scheduled_at = %job.scheduled_at, "Running daily blog post");

    match ctx.publisher.publish_daily(None).await {
        Ok(article) => tracing::info!(link = %article.link, "Daily blog post complete"),
        Err(e) => tracing::error!("Daily post failed: {e}"),
    }
    Ok(())
}

/// Start the blog worker and run until the monitor stops
pub async fn run_blog_worker(
    pool: PgPool,
    publisher: Arc<BlogPublisher>,
    cron_expr: &str,
) -> Result<(), SchedulerError> {
    let schedule = parse_schedule(cron_expr)?;

    // Run apalis migrations
    PostgresStorage::setup(&pool).await?;

    let storage: PostgresStorage<BlogJob> = PostgresStorage::new(pool);
    let backend = CronStream::new(schedule).pipe_to_storage(storage);

    tracing::info!(cron = %normalize_cron(cron_expr), "Blog scheduler started (UTC)");

    let worker = WorkerBuilder::new("blog-worker")
        .data(BlogContext { publisher })
        .backend(backend)
        .build_fn(process_blog_job);

    Monitor::new()
        .register(worker)
        .run()
        .await
        .map_err(|e| SchedulerError::Monitor(e.to_string()))
}
