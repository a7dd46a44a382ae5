//! Instagram Graph API client: DMs, comment replies and content publishing

use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::config::InstagramConfig;

#[derive(Clone)]
pub struct InstagramClient {
    access_token: String,
    account_id: String,
    /// Base for content publishing and comment endpoints
    graph_url: String,
    /// Base for the messaging endpoint
    messaging_url: String,
    http: Client,
}

impl InstagramClient {
    pub fn new(config: &InstagramConfig) -> Self {
        Self {
            access_token: config.access_token.clone(),
            account_id: config.account_id.clone(),
            graph_url: config.graph_url.trim_end_matches('/').to_string(),
            messaging_url: config.messaging_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    /// The bot's own account id
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Send a text DM to an Instagram-scoped user id
    pub async fn send_message(
        &self,
        recipient_id: &str,
        text: &str,
    ) -> Result<MessageReceipt, InstagramError> {
        let url = format!("{}/{}/messages", self.messaging_url, self.account_id);

        let body = serde_json::json!({
            "recipient": { "id": recipient_id },
            "message": { "text": text }
        });

        let resp = self
            .http
            .post(url)
            .query(&[("access_token", self.access_token.as_str())])
            .json(&body)
            .send()
            .await?;

        let receipt: MessageReceipt = read_json(resp, "send message").await?;
        tracing::info!(recipient_id, message_id = ?receipt.message_id, "DM reply sent");
        Ok(receipt)
    }

    /// Post a public reply under a comment
    pub async fn reply_to_comment(
        &self,
        comment_id: &str,
        text: &str,
    ) -> Result<String, InstagramError> {
        let url = format!("{}/{}/replies", self.graph_url, comment_id);

        let resp = self
            .http
            .post(url)
            .query(&[
                ("message", text),
                ("access_token", self.access_token.as_str()),
            ])
            .send()
            .await?;

        let created: IdResponse = read_json(resp, "reply to comment").await?;
        tracing::info!(comment_id, reply_id = %created.id, "Comment reply sent");
        Ok(created.id)
    }

    /// Step 1 of publishing: create a media container for a public image URL
    pub async fn create_container(
        &self,
        image_url: &str,
        caption: &str,
    ) -> Result<String, InstagramError> {
        let url = format!("{}/{}/media", self.graph_url, self.account_id);

        let resp = self
            .http
            .post(url)
            .query(&[
                ("image_url", image_url),
                ("caption", caption),
                ("access_token", self.access_token.as_str()),
            ])
            .send()
            .await?;

        let created: IdResponse = read_json(resp, "create container").await?;
        Ok(created.id)
    }

    /// Current processing status of a media container
    pub async fn container_status(
        &self,
        container_id: &str,
    ) -> Result<ContainerStatus, InstagramError> {
        let url = format!("{}/{}", self.graph_url, container_id);

        let resp = self
            .http
            .get(url)
            .query(&[
                ("fields", "status_code"),
                ("access_token", self.access_token.as_str()),
            ])
            .send()
            .await?;

        let status: StatusResponse = read_json(resp, "container status").await?;
        Ok(ContainerStatus::from_code(status.status_code.as_deref()))
    }

    /// Step 2 of publishing: publish a finished container
    pub async fn publish_container(
        &self,
        creation_id: &str,
    ) -> Result<PublishResponse, InstagramError> {
        let url = format!("{}/{}/media_publish", self.graph_url, self.account_id);

        let resp = self
            .http
            .post(url)
            .query(&[
                ("creation_id", creation_id),
                ("access_token", self.access_token.as_str()),
            ])
            .send()
            .await?;

        read_json(resp, "publish container").await
    }

    /// Look up the public permalink of a published media object
    pub async fn media_permalink(&self, media_id: &str) -> Result<Option<String>, InstagramError> {
        let url = format!("{}/{}", self.graph_url, media_id);

        let resp = self
            .http
            .get(url)
            .query(&[
                ("fields", "permalink"),
                ("access_token", self.access_token.as_str()),
            ])
            .send()
            .await?;

        let media: PermalinkResponse = read_json(resp, "media permalink").await?;
        Ok(media.permalink)
    }
}

/// Decode a successful response, or log the provider's raw error body and fail
async fn read_json<T: serde::de::DeserializeOwned>(
    resp: Response,
    operation: &str,
) -> Result<T, InstagramError> {
    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
        tracing::error!(operation, status = %status, body = %text, "Instagram API call failed");
        return Err(InstagramError::Api {
            status: status.as_u16(),
            body: text,
        });
    }

    serde_json::from_str(&text).map_err(|e| {
        tracing::error!(operation, body = %text, "Unexpected Instagram response: {e}");
        InstagramError::Decode(format!("{e} - body: {text}"))
    })
}

/// Processing state reported for a media container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerStatus {
    InProgress,
    Finished,
    Error,
    Unknown(String),
}

impl ContainerStatus {
    fn from_code(code: Option<&str>) -> Self {
        match code {
            Some("IN_PROGRESS") => ContainerStatus::InProgress,
            Some("FINISHED") => ContainerStatus::Finished,
            Some("ERROR") => ContainerStatus::Error,
            Some(other) => ContainerStatus::Unknown(other.to_string()),
            None => ContainerStatus::Unknown(String::new()),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MessageReceipt {
    pub recipient_id: Option<String>,
    pub message_id: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PublishResponse {
    pub id: String,
    pub permalink: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PermalinkResponse {
    permalink: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum InstagramError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Instagram API error (status {status}): {body}")]
    Api { status: u16, body: String },
    #[error("Failed to parse Instagram response: {0}")]
    Decode(String),
}
