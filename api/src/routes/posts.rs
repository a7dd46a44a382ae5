//! Instagram publishing endpoints (/post, /api/publish, /api/posts)

use axum::{
    Json, Router,
    extract::{FromRequest, Multipart, Request, State, multipart::MultipartError},
    http::header,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;
use crate::domain::activity::{self, ActivityKind};
use crate::domain::{images, posts};
use crate::services::error::{ApiError, LogErr};
use crate::services::publisher::PublishedMedia;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/post", post(post_image))
        .route("/api/publish", post(publish))
        .route("/api/posts", get(list_posts))
}

#[derive(Deserialize)]
struct PostRequest {
    image_url: Option<String>,
    caption: Option<String>,
}

#[derive(Serialize)]
struct PostResponse {
    success: bool,
    result: PublishedMedia,
}

const FILE_NEEDS_PUBLIC_URL: &str = "File upload received, but Instagram requires a public URL. \
    Upload the image via /api/upload (or any public host) and pass image_url instead.";

/// `/post` body, from JSON or a multipart form with an optional `file`
#[derive(Default)]
struct PostForm {
    image_url: Option<String>,
    caption: Option<String>,
    has_file: bool,
}

impl From<PostRequest> for PostForm {
    fn from(req: PostRequest) -> Self {
        Self {
            image_url: req.image_url,
            caption: req.caption,
            has_file: false,
        }
    }
}

async fn read_post_form(mut multipart: Multipart) -> Result<PostForm, ApiError> {
    let mut form = PostForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))?
    {
        let to_api = |e: MultipartError| ApiError::new(e.status(), e.body_text());
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image_url") => form.image_url = Some(field.text().await.map_err(to_api)?),
            Some("caption") => form.caption = Some(field.text().await.map_err(to_api)?),
            Some("file") => form.has_file = true,
            _ => {}
        }
    }

    Ok(form)
}

/// Publishing needs a public URL; a bare file upload gets guidance instead
fn post_target(image_url: Option<String>, has_file: bool) -> Result<String, ApiError> {
    match (non_blank(image_url), has_file) {
        (Some(url), _) => Ok(url),
        (None, true) => Err(ApiError::bad_request(FILE_NEEDS_PUBLIC_URL)),
        (None, false) => Err(ApiError::bad_request("Provide image_url or upload a file.")),
    }
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"))
}

/// POST /post - Publish an image URL without recording it
///
/// Accepts JSON `{image_url, caption}` or multipart form data.
async fn post_image(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<PostResponse>, ApiError> {
    let form = if is_multipart(&request) {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
        read_post_form(multipart).await?
    } else {
        let Json(req) = Json::<PostRequest>::from_request(request, &state)
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
        PostForm::from(req)
    };

    let image_url = post_target(form.image_url, form.has_file)?;
    let caption = form.caption.unwrap_or_default();

    let result = state
        .publisher
        .publish(&image_url, &caption)
        .await
        .log_500("Post upload error")?;

    Ok(Json(PostResponse {
        success: true,
        result,
    }))
}

#[derive(Deserialize)]
struct PublishRequest {
    image_url: Option<String>,
    image_id: Option<String>,
    caption: Option<String>,
}

#[derive(Serialize)]
struct PublishResponse {
    success: bool,
    post_id: i32,
    result: PublishedMedia,
}

/// POST /api/publish - Publish and track the attempt as a post record
async fn publish(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PublishRequest>,
) -> Result<Json<PublishResponse>, ApiError> {
    let caption = req.caption.unwrap_or_default();
    let explicit_url = non_blank(req.image_url);

    let image = match non_blank(req.image_id) {
        Some(id) => images::get_image(&state.db, &id)
            .await
            .log_500("Get image error")?,
        None => None,
    };

    let image_url = explicit_url
        .or_else(|| image.as_ref().and_then(|i| i.public_url.clone()))
        .ok_or_else(|| ApiError::bad_request("image_url or a known image_id is required"))?;
    let image_id = image.as_ref().map(|i| i.id.as_str());

    let post_id = posts::insert_draft(&state.db, image_id, &caption)
        .await
        .log_500("Insert post error")?;
    activity::record_activity(&state.db, ActivityKind::Post, "Publishing post to Instagram...")
        .await
        .log_500("Record activity error")?;

    match state.publisher.publish(&image_url, &caption).await {
        Ok(result) => {
            posts::mark_published(&state.db, post_id, &result.id)
                .await
                .log_500("Update post error")?;
            activity::record_activity(
                &state.db,
                ActivityKind::Post,
                &format!("Post published to Instagram (ID: {})", result.id),
            )
            .await
            .log_500("Record activity error")?;

            Ok(Json(PublishResponse {
                success: true,
                post_id,
                result,
            }))
        }
        Err(e) => {
            let message = e.to_string();
            tracing::error!(post_id, "Publish error: {message}");

            if let Err(db_err) = posts::mark_failed(&state.db, post_id, &message).await {
                tracing::error!(post_id, "Failed to mark post failed: {db_err}");
            }
            if let Err(db_err) = activity::record_activity(
                &state.db,
                ActivityKind::Error,
                &format!("Post failed: {message}"),
            )
            .await
            {
                tracing::error!("Record activity error: {db_err}");
            }

            Err(ApiError::new(
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                message,
            ))
        }
    }
}

/// GET /api/posts - All posts, newest first
async fn list_posts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<posts::PostRow>>, ApiError> {
    let rows = posts::list_posts(&state.db).await.log_500("List posts error")?;
    Ok(Json(rows))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::tests::test_state;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BOUNDARY: &str = "igbot-boundary";

    fn multipart_body(parts: &[(&str, Option<&str>, &str)]) -> String {
        let mut body = String::new();
        for (name, filename, value) in parts {
            body.push_str(&format!("--{BOUNDARY}\r\n"));
            match filename {
                Some(filename) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                     Content-Type: image/jpeg\r\n\r\n"
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
                )),
            }
            body.push_str(value);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        body
    }

    async fn send_post(server: &MockServer, content_type: &str, body: String) -> (StatusCode, Value) {
        let (state, _) = test_state(&server.uri(), None);
        let response = routes()
            .with_state(state)
            .oneshot(
                Request::post("/post")
                    .header(header::CONTENT_TYPE, content_type)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn forbid_graph(server: &MockServer) {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "x" })))
            .expect(0)
            .mount(server)
            .await;
    }

    #[test]
    fn test_post_target() {
        assert_eq!(post_target(Some(" https://x/y.jpg ".into()), true).unwrap(), "https://x/y.jpg");

        let ApiError { status, message } = post_target(None, true).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, FILE_NEEDS_PUBLIC_URL);

        let ApiError { message, .. } = post_target(Some("  ".into()), false).unwrap_err();
        assert_eq!(message, "Provide image_url or upload a file.");
    }

    #[tokio::test]
    async fn test_multipart_file_without_url_gets_guidance() {
        let server = MockServer::start().await;
        forbid_graph(&server).await;

        let body = multipart_body(&[
            ("caption", None, "Fresh pulls"),
            ("file", Some("pack.jpg"), "not really a jpeg"),
        ]);
        let (status, json) = send_post(
            &server,
            &format!("multipart/form-data; boundary={BOUNDARY}"),
            body,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, json!({ "error": FILE_NEEDS_PUBLIC_URL }));
    }

    #[tokio::test]
    async fn test_json_without_url_is_rejected() {
        let server = MockServer::start().await;
        forbid_graph(&server).await;

        let (status, json) =
            send_post(&server, "application/json", json!({ "caption": "hi" }).to_string()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, json!({ "error": "Provide image_url or upload a file." }));
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  https://x/y.jpg ".into())).as_deref(), Some("https://x/y.jpg"));
        assert_eq!(non_blank(Some("   ".into())), None);
        assert_eq!(non_blank(None), None);
    }
}
