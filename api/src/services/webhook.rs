//! Instagram webhook handling: subscription handshake and event dispatch
//!
//! Deliveries are acknowledged by the route before anything here runs, so
//! `handle_delivery` never returns an error; every failure ends in a log line.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Deserializer};
use sha2::Sha256;
use std::sync::Arc;

use super::instagram::{InstagramClient, InstagramError};
use super::replies::ReplyGenerator;

const SUBSCRIBE_MODE: &str = "subscribe";
const INSTAGRAM_OBJECT: &str = "instagram";
const COMMENTS_FIELD: &str = "comments";
const SIGNATURE_PREFIX: &str = "sha256=";

/// Query parameters sent with the subscription handshake
#[derive(Debug, Default, Deserialize)]
pub struct HandshakeQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("Webhook verification failed")]
pub struct HandshakeRejected;

/// Echo the challenge when mode and token match, otherwise reject
pub fn verify_handshake(
    query: &HandshakeQuery,
    expected_token: &str,
) -> Result<String, HandshakeRejected> {
    match (&query.mode, &query.verify_token, &query.challenge) {
        (Some(mode), Some(token), Some(challenge))
            if mode == SUBSCRIBE_MODE && token == expected_token =>
        {
            Ok(challenge.clone())
        }
        _ => Err(HandshakeRejected),
    }
}

/// Check an `X-Hub-Signature-256` header against the raw request body
pub fn verify_signature(app_secret: &str, body: &[u8], header: Option<&str>) -> bool {
    let Some(expected) = header
        .and_then(|h| h.strip_prefix(SIGNATURE_PREFIX))
        .and_then(|h| hex::decode(h).ok())
    else {
        return false;
    };

    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(app_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

// ============================================================================
// Payload
// ============================================================================

/// Absent and `null` lists both decode as empty
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    pub object: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookEntry {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub messaging: Vec<MessagingEvent>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub changes: Vec<Change>,
}

#[derive(Debug, Deserialize)]
pub struct MessagingEvent {
    pub sender: Option<Participant>,
    pub message: Option<InboundMessage>,
}

#[derive(Debug, Deserialize)]
pub struct Participant {
    pub id: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub is_echo: bool,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct CommentValue {
    pub id: Option<String>,
    pub text: Option<String>,
    pub from: Option<Participant>,
}

// ============================================================================
// Dispatch
// ============================================================================

pub struct WebhookDispatcher {
    replies: Arc<ReplyGenerator>,
    instagram: InstagramClient,
    app_secret: Option<String>,
}

impl WebhookDispatcher {
    pub fn new(
        replies: Arc<ReplyGenerator>,
        instagram: InstagramClient,
        app_secret: Option<String>,
    ) -> Self {
        Self {
            replies,
            instagram,
            app_secret,
        }
    }

    /// Verify, decode and process one raw delivery
    pub async fn handle_delivery(&self, signature: Option<&str>, body: &[u8]) {
        if let Some(secret) = &self.app_secret {
            if !verify_signature(secret, body, signature) {
                tracing::warn!("Webhook signature mismatch, dropping delivery");
                return;
            }
        }

        let payload: WebhookPayload = match serde_json::from_slice(body) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Unparseable webhook body: {e}");
                return;
            }
        };

        if let Err(e) = self.dispatch(payload).await {
            tracing::error!("Webhook processing error: {e}");
        }
    }

    /// Walk a delivery in arrival order; the first outbound failure stops the batch
    pub async fn dispatch(&self, payload: WebhookPayload) -> Result<(), InstagramError> {
        if payload.object.as_deref() != Some(INSTAGRAM_OBJECT) {
            tracing::info!(object = ?payload.object, "Ignoring webhook object type");
            return Ok(());
        }

        for entry in &payload.entry {
            for event in &entry.messaging {
                self.process_message(event).await?;
            }

            for change in &entry.changes {
                if change.field == COMMENTS_FIELD {
                    self.process_comment(&change.value).await?;
                }
            }
        }

        Ok(())
    }

    async fn process_message(&self, event: &MessagingEvent) -> Result<(), InstagramError> {
        let Some(message) = &event.message else {
            return Ok(());
        };
        if message.is_echo {
            return Ok(());
        }

        let sender_id = event
            .sender
            .as_ref()
            .and_then(|s| non_empty(s.id.as_deref()));
        let (Some(sender_id), Some(text)) = (sender_id, non_empty(message.text.as_deref())) else {
            tracing::debug!("Non-text message or missing sender, skipping");
            return Ok(());
        };

        tracing::info!(sender_id, text, "DM received");
        let reply = self.replies.dm_reply(sender_id, text).await;
        self.instagram.send_message(sender_id, &reply).await?;
        Ok(())
    }

    async fn process_comment(&self, value: &serde_json::Value) -> Result<(), InstagramError> {
        let comment = match CommentValue::deserialize(value) {
            Ok(comment) => comment,
            Err(e) => {
                tracing::warn!("Undecodable comment change: {e}");
                return Ok(());
            }
        };

        let author = comment.from.as_ref();
        if author.and_then(|f| f.id.as_deref()) == Some(self.instagram.account_id()) {
            return Ok(());
        }

        let (Some(comment_id), Some(text)) = (
            non_empty(comment.id.as_deref()),
            non_empty(comment.text.as_deref()),
        ) else {
            tracing::debug!("Comment without id or text, skipping");
            return Ok(());
        };

        let author_name = author
            .and_then(|f| f.username.as_deref().or(f.id.as_deref()))
            .unwrap_or("unknown");
        tracing::info!(comment_id, author = author_name, text, "Comment received");

        let reply = self.replies.comment_reply(text).await;
        self.instagram.reply_to_comment(comment_id, &reply).await?;
        Ok(())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
