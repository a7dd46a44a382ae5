//! Two-phase Instagram image publishing
//!
//! A media container is created for the image, its status is polled until the
//! provider finishes processing it, and the container is then published.

use serde::Serialize;
use std::time::Duration;

use super::instagram::{ContainerStatus, InstagramClient, InstagramError};

/// Polling budget for container processing
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

/// A post that is live on Instagram
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedMedia {
    pub id: String,
    pub permalink: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Failed to create media container: {0}")]
    CreateContainer(#[source] InstagramError),
    #[error("Failed to check media container status: {0}")]
    StatusCheck(#[source] InstagramError),
    #[error("Media container {container_id} processing failed")]
    ProcessingFailed { container_id: String },
    #[error("Media container {container_id} processing timed out after {attempts} status checks")]
    TimedOut { container_id: String, attempts: u32 },
    #[error("Failed to publish media container: {0}")]
    Publish(#[source] InstagramError),
}

#[derive(Clone)]
pub struct MediaPublisher {
    instagram: InstagramClient,
    poll: PollConfig,
}

impl MediaPublisher {
    pub fn new(instagram: InstagramClient, poll: PollConfig) -> Self {
        Self { instagram, poll }
    }

    /// Publish an image from a public URL with the given caption
    pub async fn publish(&self, image_url: &str, caption: &str) -> Result<PublishedMedia, PublishError> {
        tracing::info!(image_url, "Creating media container");
        let container_id = self
            .instagram
            .create_container(image_url, caption)
            .await
            .map_err(PublishError::CreateContainer)?;
        tracing::info!(container_id = %container_id, "Media container created");

        self.wait_until_finished(&container_id).await?;

        tracing::info!(container_id = %container_id, "Publishing media container");
        let published = self
            .instagram
            .publish_container(&container_id)
            .await
            .map_err(PublishError::Publish)?;

        let permalink = match published.permalink {
            Some(link) => Some(link),
            None => self.lookup_permalink(&published.id).await,
        };

        tracing::info!(media_id = %published.id, permalink = ?permalink, "Post published");
        Ok(PublishedMedia {
            id: published.id,
            permalink,
        })
    }

    /// Poll until the container reports FINISHED, failing on ERROR or when the budget runs out
    async fn wait_until_finished(&self, container_id: &str) -> Result<(), PublishError> {
        for attempt in 1..=self.poll.max_attempts {
            let status = self
                .instagram
                .container_status(container_id)
                .await
                .map_err(PublishError::StatusCheck)?;
            tracing::debug!(container_id, attempt, status = ?status, "Container status");

            match status {
                ContainerStatus::Finished => return Ok(()),
                ContainerStatus::Error => {
                    tracing::error!(container_id, "Media container processing failed");
                    return Err(PublishError::ProcessingFailed {
                        container_id: container_id.to_string(),
                    });
                }
                ContainerStatus::InProgress | ContainerStatus::Unknown(_) => {
                    if attempt < self.poll.max_attempts {
                        tokio::time::sleep(self.poll.interval).await;
                    }
                }
            }
        }

        tracing::error!(container_id, attempts = self.poll.max_attempts, "Media container timed out");
        Err(PublishError::TimedOut {
            container_id: container_id.to_string(),
            attempts: self.poll.max_attempts,
        })
    }

    async fn lookup_permalink(&self, media_id: &str) -> Option<String> {
        match self.instagram.media_permalink(media_id).await {
            Ok(link) => link,
            Err(e) => {
                tracing::warn!(media_id, "Could not fetch permalink: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::instagram::tests::{ACCOUNT_ID, test_client};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

    fn publisher(server: &MockServer, max_attempts: u32) -> MediaPublisher {
        MediaPublisher::new(
            test_client(&server.uri()),
            PollConfig {
                interval: Duration::from_millis(1),
                max_attempts,
            },
        )
    }

    async fn mount_create(server: &MockServer, container_id: &str) {
        Mock::given(method("POST"))
            .and(path(format!("/{ACCOUNT_ID}/media")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": container_id })),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    fn status_mock(container_id: &str, code: &str) -> Mock {
        Mock::given(method("GET"))
            .and(path(format!("/{container_id}")))
            .and(query_param("fields", "status_code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status_code": code,
                "id": container_id
            })))
    }

    fn publish_mock(creation_id: &str) -> MockBuilder {
        Mock::given(method("POST"))
            .and(path(format!("/{ACCOUNT_ID}/media_publish")))
            .and(query_param("creation_id", creation_id))
    }

    #[tokio::test]
    async fn test_publishes_after_container_finishes() {
        let server = MockServer::start().await;
        let in_progress_polls = 3;

        mount_create(&server, "C7").await;
        status_mock("C7", "IN_PROGRESS")
            .up_to_n_times(in_progress_polls)
            .expect(in_progress_polls)
            .mount(&server)
            .await;
        status_mock("C7", "FINISHED").expect(1).mount(&server).await;
        publish_mock("C7")
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "P7",
                "permalink": "https://www.instagram.com/p/P7/"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let published = publisher(&server, 10)
            .publish("https://x/y.jpg", "caption")
            .await
            .unwrap();
        assert_eq!(published.id, "P7");
    }

    #[tokio::test]
    async fn test_first_poll_finished_returns_publish_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(format!("/{ACCOUNT_ID}/media")))
            .and(query_param("image_url", "https://x/y.jpg"))
            .and(query_param("caption", "New drop"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "C1" })))
            .expect(1)
            .mount(&server)
            .await;
        status_mock("C1", "FINISHED").expect(1).mount(&server).await;
        publish_mock("C1")
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "P1",
                "permalink": "https://www.instagram.com/p/abc/"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let published = publisher(&server, 10)
            .publish("https://x/y.jpg", "New drop")
            .await
            .unwrap();
        assert_eq!(
            published,
            PublishedMedia {
                id: "P1".into(),
                permalink: Some("https://www.instagram.com/p/abc/".into()),
            }
        );
    }

    #[tokio::test]
    async fn test_error_status_never_publishes() {
        let server = MockServer::start().await;

        mount_create(&server, "C2").await;
        status_mock("C2", "ERROR").expect(1).mount(&server).await;
        publish_mock("C2")
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "P2" })))
            .expect(0)
            .mount(&server)
            .await;

        let err = publisher(&server, 10)
            .publish("https://x/y.jpg", "caption")
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::ProcessingFailed { ref container_id } if container_id == "C2"));
    }

    #[tokio::test]
    async fn test_times_out_when_never_finished() {
        let server = MockServer::start().await;

        mount_create(&server, "C3").await;
        status_mock("C3", "IN_PROGRESS").expect(4).mount(&server).await;
        publish_mock("C3")
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "P3" })))
            .expect(0)
            .mount(&server)
            .await;

        let err = publisher(&server, 4)
            .publish("https://x/y.jpg", "caption")
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::TimedOut { attempts: 4, .. }));
    }

    #[tokio::test]
    async fn test_create_failure_is_wrapped() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(format!("/{ACCOUNT_ID}/media")))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": { "message": "Only photo or video can be accepted as media type." }
            })))
            .mount(&server)
            .await;

        let err = publisher(&server, 10)
            .publish("https://x/not-an-image", "caption")
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::CreateContainer(InstagramError::Api { status: 400, .. })));
    }

    #[tokio::test]
    async fn test_missing_permalink_is_looked_up() {
        let server = MockServer::start().await;

        mount_create(&server, "C4").await;
        status_mock("C4", "FINISHED").mount(&server).await;
        publish_mock("C4")
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "P4" })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/P4"))
            .and(query_param("fields", "permalink"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "permalink": "https://www.instagram.com/p/P4/",
                "id": "P4"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let published = publisher(&server, 10)
            .publish("https://x/y.jpg", "caption")
            .await
            .unwrap();
        assert_eq!(published.permalink.as_deref(), Some("https://www.instagram.com/p/P4/"));
    }
}
