//! Dashboard listings (/api/activity, /api/stats)

use axum::{Json, Router, extract::State, routing::get};
use std::sync::Arc;

use crate::AppState;
use crate::constants::RECENT_ACTIVITY_LIMIT;
use crate::domain::activity::{self, ActivityEntry};
use crate::domain::stats::{self, Stats};
use crate::services::error::{ApiError, LogErr};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/activity", get(list_activity))
        .route("/api/stats", get(get_stats))
}

/// GET /api/activity - Most recent activity, newest first
async fn list_activity(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ActivityEntry>>, ApiError> {
    let entries = activity::recent_activity(&state.db, RECENT_ACTIVITY_LIMIT)
        .await
        .log_500("List activity error")?;
    Ok(Json(entries))
}

/// GET /api/stats - Image and post counters
async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<Stats>, ApiError> {
    let stats = stats::get_stats(&state.db).await.log_500("Stats error")?;
    Ok(Json(stats))
}
