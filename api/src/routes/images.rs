//! Image library endpoints (/api/upload, /api/images)

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{HeaderMap, StatusCode, header},
    routing::{delete, get, post},
};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;
use crate::constants::MAX_IMAGE_UPLOAD_SIZE;
use crate::domain::activity::{self, ActivityKind};
use crate::domain::images::{self, Image, NewImage};
use crate::services::error::{ApiError, LogErr};
use crate::storage;

const UPLOAD_FIELD: &str = "image";

/// Room for multipart framing around the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/upload",
            post(upload_image).layer(DefaultBodyLimit::max(MAX_IMAGE_UPLOAD_SIZE + MULTIPART_OVERHEAD)),
        )
        .route("/api/images", get(list_images))
        .route("/api/images/{id}", delete(delete_image))
}

/// Base for public upload URLs: configured value, else the request's forwarded proto and host
fn public_base_url(configured: Option<&str>, headers: &HeaderMap) -> Option<String> {
    if let Some(base) = configured {
        return Some(base.to_string());
    }

    let host = headers.get(header::HOST).and_then(|v| v.to_str().ok())?;
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .unwrap_or("http");

    Some(format!("{proto}://{host}"))
}

/// POST /api/upload - Store an image and record it
///
/// Accepts multipart form data with a single "image" field.
async fn upload_image(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Image>, ApiError> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;

        upload = Some((original_name, content_type, data));
        break;
    }

    let (original_name, content_type, data) =
        upload.ok_or_else(|| ApiError::bad_request("No image provided"))?;

    if data.len() > MAX_IMAGE_UPLOAD_SIZE {
        return Err(ApiError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "Image exceeds the 10 MB limit",
        ));
    }

    let ext = storage::validate_image(&original_name, content_type.as_deref(), &data)
        .log_status("Upload rejected", StatusCode::BAD_REQUEST)?;

    let base = public_base_url(state.public_base_url.as_deref(), &headers).ok_or_else(|| {
        ApiError::bad_request("Cannot determine public URL (set PUBLIC_BASE_URL)")
    })?;

    let id = uuid::Uuid::new_v4().to_string();
    let filename = format!("{id}.{ext}");
    let public_url = format!("{base}/uploads/{filename}");

    storage::save_upload(&state.uploads_dir, &filename, &data)
        .await
        .log_500("Upload write error")?;

    let new_image = NewImage {
        id: &id,
        original_name: &original_name,
        filename: &filename,
        mimetype: content_type.as_deref().unwrap_or_default(),
        size: i32::try_from(data.len()).unwrap_or(i32::MAX),
        public_url: &public_url,
    };

    let image = match images::insert_image(&state.db, &new_image).await {
        Ok(image) => image,
        Err(e) => {
            if let Err(io_err) = storage::remove_upload(&state.uploads_dir, &filename).await {
                tracing::warn!(filename = %filename, "Failed to clean up upload: {io_err}");
            }
            return Err(e).log_500("Insert image error");
        }
    };

    activity::record_activity(
        &state.db,
        ActivityKind::Upload,
        &format!("Uploaded image: {original_name}"),
    )
    .await
    .log_500("Record activity error")?;

    tracing::info!(image_id = %image.id, size = data.len(), "Image uploaded");
    Ok(Json(image))
}

/// GET /api/images - All images, newest first
async fn list_images(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Image>>, ApiError> {
    let rows = images::list_images(&state.db)
        .await
        .log_500("List images error")?;
    Ok(Json(rows))
}

#[derive(Serialize)]
struct DeleteResponse {
    success: bool,
}

/// DELETE /api/images/{id} - Remove the file and its record
async fn delete_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let image = images::get_image(&state.db, &id)
        .await
        .log_500("Get image error")?
        .ok_or_else(|| ApiError::not_found("Image not found"))?;

    storage::remove_upload(&state.uploads_dir, &image.filename)
        .await
        .log_500("Delete file error")?;

    images::delete_image(&state.db, &id)
        .await
        .log_500("Delete image error")?;

    activity::record_activity(
        &state.db,
        ActivityKind::Delete,
        &format!("Deleted image: {}", image.original_name),
    )
    .await
    .log_500("Record activity error")?;

    Ok(Json(DeleteResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_public_base_url() {
        let mut headers = HeaderMap::new();
        assert_eq!(public_base_url(None, &headers), None);

        headers.insert(header::HOST, HeaderValue::from_static("bot.example.com"));
        assert_eq!(
            public_base_url(None, &headers).as_deref(),
            Some("http://bot.example.com")
        );

        headers.insert("x-forwarded-proto", HeaderValue::from_static("https, http"));
        assert_eq!(
            public_base_url(None, &headers).as_deref(),
            Some("https://bot.example.com")
        );

        assert_eq!(
            public_base_url(Some("https://cdn.example.com"), &headers).as_deref(),
            Some("https://cdn.example.com")
        );
    }
}
