//! Reply generation over the chat-completion API
//!
//! DM and comment replies always produce a displayable string (failures fall
//! back to a fixed reply); authoring calls propagate failures to the caller.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::conversations::ConversationStore;
use super::openai::{ChatClient, ChatError, CompletionRequest};
use crate::constants::{COMMENT_FALLBACK_REPLY, DM_FALLBACK_REPLY};
use crate::models::ChatMessage;
use crate::prompts;

/// Log a failed reply call and answer with a fixed string instead
fn or_fallback(context: &str, outcome: Result<String, ChatError>, fallback: &str) -> String {
    outcome.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "{context} failed, using fallback reply");
        fallback.to_string()
    })
}

/// Log a failed authoring call and hand the error back
fn logged(context: &str, outcome: Result<String, ChatError>) -> Result<String, ChatError> {
    outcome.inspect_err(|e| tracing::error!(error = %e, "{context} failed"))
}

/// Kind of authored content, selecting the instruction prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[default]
    Caption,
    Comment,
    Reply,
}

impl ContentKind {
    /// Parse a requested kind; anything unrecognised is treated as a caption
    pub fn parse_or_default(s: Option<&str>) -> Self {
        match s.map(str::trim) {
            Some("comment") => ContentKind::Comment,
            Some("reply") => ContentKind::Reply,
            _ => ContentKind::Caption,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Caption => "caption",
            ContentKind::Comment => "comment",
            ContentKind::Reply => "reply",
        }
    }

    fn instruction(&self) -> &'static str {
        match self {
            ContentKind::Caption => "Write a post caption based on the following context:",
            ContentKind::Comment => "Write a comment to post under this content:",
            ContentKind::Reply => "Write a reply to this comment:",
        }
    }
}

/// Sampling settings for one kind of generation call
#[derive(Debug, Clone, Copy)]
pub struct Sampling {
    pub max_tokens: u32,
    pub temperature: f32,
}

const DM_SAMPLING: Sampling = Sampling {
    max_tokens: 500,
    temperature: 0.7,
};
const COMMENT_SAMPLING: Sampling = Sampling {
    max_tokens: 300,
    temperature: 0.7,
};
const CONTENT_SAMPLING: Sampling = Sampling {
    max_tokens: 400,
    temperature: 0.8,
};

pub struct ReplyGenerator {
    chat: ChatClient,
    conversations: Arc<dyn ConversationStore>,
    dm_system_prompt: String,
}

impl ReplyGenerator {
    pub fn new(
        chat: ChatClient,
        conversations: Arc<dyn ConversationStore>,
        dm_system_prompt: Option<String>,
    ) -> Self {
        Self {
            chat,
            conversations,
            dm_system_prompt: dm_system_prompt
                .unwrap_or_else(|| prompts::DM_SYSTEM_PROMPT.to_string()),
        }
    }

    /// Reply to a DM using the sender's recent history.
    ///
    /// The inbound message is recorded before the call; the assistant reply is
    /// recorded only when generation succeeds.
    pub async fn dm_reply(&self, sender_id: &str, message: &str) -> String {
        self.conversations
            .append(sender_id, ChatMessage::user(message))
            .await;
        let history = self.conversations.history(sender_id).await;
        tracing::debug!(sender_id, turns = history.len(), "Generating DM reply");

        let request = CompletionRequest {
            system: self.dm_system_prompt.clone(),
            messages: history,
            max_tokens: DM_SAMPLING.max_tokens,
            temperature: DM_SAMPLING.temperature,
        };

        let outcome = self.chat.complete(&request).await;
        if let Ok(text) = &outcome {
            self.conversations
                .append(sender_id, ChatMessage::assistant(text.as_str()))
                .await;
        }

        or_fallback("DM reply", outcome, DM_FALLBACK_REPLY)
    }

    /// Reply to a public comment; no history is kept
    pub async fn comment_reply(&self, comment_text: &str) -> String {
        let outcome = self
            .single_turn(prompts::COMMENT_SYSTEM_PROMPT, comment_text, COMMENT_SAMPLING)
            .await;
        or_fallback("Comment reply", outcome, COMMENT_FALLBACK_REPLY)
    }

    /// Write a caption, comment or reply draft
    pub async fn content(&self, kind: ContentKind, prompt: &str) -> Result<String, ChatError> {
        tracing::info!(kind = kind.as_str(), "Generating content");
        let user_message = format!("{}\n\n{}", kind.instruction(), prompt);
        let outcome = self
            .single_turn(prompts::WRITER_SYSTEM_PROMPT, &user_message, CONTENT_SAMPLING)
            .await;
        logged("Content generation", outcome)
    }

    /// Authoring call with caller-chosen prompt and sampling; failures propagate
    pub async fn author(
        &self,
        system: &str,
        user_message: &str,
        sampling: Sampling,
    ) -> Result<String, ChatError> {
        let outcome = self.single_turn(system, user_message, sampling).await;
        logged("Authoring", outcome)
    }

    async fn single_turn(
        &self,
        system: &str,
        user_message: &str,
        sampling: Sampling,
    ) -> Result<String, ChatError> {
        let request = CompletionRequest {
            system: system.to_string(),
            messages: vec![ChatMessage::user(user_message)],
            max_tokens: sampling.max_tokens,
            temperature: sampling.temperature,
        };

        self.chat.complete(&request).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::services::conversations::InMemoryConversations;
    use crate::services::openai::tests::{completion_body, test_client};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) fn test_generator(
        chat_url: &str,
    ) -> (ReplyGenerator, Arc<InMemoryConversations>) {
        let store = Arc::new(InMemoryConversations::new(20));
        let generator = ReplyGenerator::new(test_client(chat_url), store.clone(), None);
        (generator, store)
    }

    #[test]
    fn test_content_kind_parsing() {
        assert_eq!(ContentKind::parse_or_default(Some("comment")), ContentKind::Comment);
        assert_eq!(ContentKind::parse_or_default(Some("reply")), ContentKind::Reply);
        assert_eq!(ContentKind::parse_or_default(Some("caption")), ContentKind::Caption);
        assert_eq!(ContentKind::parse_or_default(Some("haiku")), ContentKind::Caption);
        assert_eq!(ContentKind::parse_or_default(None), ContentKind::Caption);
    }

    #[test]
    fn test_failure_handling() {
        assert_eq!(or_fallback("DM reply", Ok("hi".into()), "sorry"), "hi");
        assert_eq!(or_fallback("DM reply", Err(ChatError::Empty), "sorry"), "sorry");
        assert!(matches!(logged("Authoring", Err(ChatError::Empty)), Err(ChatError::Empty)));
    }

    #[tokio::test]
    async fn test_dm_reply_records_both_turns() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("We do!")))
            .expect(1)
            .mount(&server)
            .await;

        let (generator, store) = test_generator(&server.uri());
        let reply = generator.dm_reply("U7", "Any Pokemon packs left?").await;

        assert_eq!(reply, "We do!");
        assert_eq!(
            store.history("U7").await,
            vec![
                ChatMessage::user("Any Pokemon packs left?"),
                ChatMessage::assistant("We do!")
            ]
        );
    }

    #[tokio::test]
    async fn test_dm_reply_falls_back_on_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let (generator, store) = test_generator(&server.uri());
        let reply = generator.dm_reply("U1", "hello?").await;

        assert_eq!(reply, DM_FALLBACK_REPLY);
        // Only the inbound message is remembered
        assert_eq!(store.history("U1").await, vec![ChatMessage::user("hello?")]);
    }

    #[tokio::test]
    async fn test_dm_reply_falls_back_on_empty_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("")))
            .mount(&server)
            .await;

        let (generator, _) = test_generator(&server.uri());
        assert_eq!(generator.dm_reply("U1", "hello?").await, DM_FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn test_dm_reply_falls_back_when_unreachable() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let (generator, _) = test_generator(&uri);
        assert_eq!(generator.dm_reply("U1", "hello?").await, DM_FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn test_comment_reply_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let (generator, _) = test_generator(&server.uri());
        assert_eq!(generator.comment_reply("legit?").await, COMMENT_FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn test_content_prefixes_instruction() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("Write a reply to this comment:"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Appreciate it.")))
            .expect(1)
            .mount(&server)
            .await;

        let (generator, _) = test_generator(&server.uri());
        let text = generator
            .content(ContentKind::Reply, "love this pull")
            .await
            .unwrap();
        assert_eq!(text, "Appreciate it.");
    }

    #[tokio::test]
    async fn test_content_propagates_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let (generator, _) = test_generator(&server.uri());
        let err = generator
            .content(ContentKind::Caption, "new drop")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Api { status: 500, .. }));
    }
}
