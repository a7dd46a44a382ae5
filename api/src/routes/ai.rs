//! AI authoring endpoints (/generate, /daily-post, /blog/preview)

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};

use crate::AppState;
use crate::services::blog::BlogDraft;
use crate::services::error::{ApiError, LogErr};
use crate::services::replies::ContentKind;
use crate::services::wordpress::PublishedArticle;

pub fn routes() -> Router<Arc<AppState>> {
    // Each call costs model tokens: burst of 5, then 1 every 12 seconds per client IP
    let rate_limit_config = GovernorConfigBuilder::default()
        .per_second(12)
        .burst_size(5)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .expect("Failed to build rate limit config");

    let rate_limit_layer = GovernorLayer {
        config: rate_limit_config.into(),
    };

    Router::new()
        .route("/generate", post(generate))
        .route("/daily-post", post(daily_post))
        .route("/blog/preview", post(preview_blog))
        .layer(rate_limit_layer)
}

#[derive(Deserialize)]
struct GenerateRequest {
    #[serde(rename = "type")]
    kind: Option<String>,
    prompt: Option<String>,
}

#[derive(Serialize)]
struct GenerateResponse {
    success: bool,
    #[serde(rename = "type")]
    kind: ContentKind,
    text: String,
}

/// POST /generate - Draft a caption, comment or reply
async fn generate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let prompt = req
        .prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Provide a prompt describing what to write."))?;
    let kind = ContentKind::parse_or_default(req.kind.as_deref());

    let text = state
        .replies
        .content(kind, &prompt)
        .await
        .log_500("Generate error")?;

    Ok(Json(GenerateResponse {
        success: true,
        kind,
        text,
    }))
}

#[derive(Default, Deserialize)]
struct BlogRequest {
    custom_prompt: Option<String>,
}

#[derive(Serialize)]
struct DailyPostResponse {
    success: bool,
    result: PublishedArticle,
}

/// POST /daily-post - Generate and publish a blog article now
async fn daily_post(
    State(state): State<Arc<AppState>>,
    req: Option<Json<BlogRequest>>,
) -> Result<Json<DailyPostResponse>, ApiError> {
    let req = req.map(|Json(r)| r).unwrap_or_default();

    let result = state
        .blog
        .publish_daily(req.custom_prompt.as_deref())
        .await
        .log_500("Manual daily post error")?;

    Ok(Json(DailyPostResponse {
        success: true,
        result,
    }))
}

#[derive(Serialize)]
struct PreviewResponse {
    success: bool,
    draft: BlogDraft,
}

/// POST /blog/preview - Generate an article without publishing it
async fn preview_blog(
    State(state): State<Arc<AppState>>,
    req: Option<Json<BlogRequest>>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let req = req.map(|Json(r)| r).unwrap_or_default();

    let draft = state
        .blog
        .generate(req.custom_prompt.as_deref())
        .await
        .log_500("Blog preview error")?;

    Ok(Json(PreviewResponse {
        success: true,
        draft,
    }))
}
