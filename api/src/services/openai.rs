//! Chat-completion API client

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::OpenAiConfig;
use crate::models::ChatMessage;

/// One chat-completion call: a system prompt followed by the ordered conversation
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Clone)]
pub struct ChatClient {
    api_key: String,
    model: String,
    base_url: String,
    http: Client,
}

impl ChatClient {
    pub fn new(config: &OpenAiConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    /// Run a completion and return the trimmed assistant text.
    ///
    /// A response without usable text is reported as [`ChatError::Empty`].
    pub async fn complete(&self, request: &CompletionRequest) -> Result<String, ChatError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(ChatMessage::system(request.system.as_str()));
        messages.extend(request.messages.iter().cloned());

        let body = ChatRequestBody {
            model: &self.model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await?;
            return Err(ChatError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        let completion: ChatResponseBody = resp.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(ChatError::Empty)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequestBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponseBody {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Chat API error (status {status}): {body}")]
    Api { status: u16, body: String },
    #[error("Empty response from chat API")]
    Empty,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) fn test_client(base_url: &str) -> ChatClient {
        ChatClient::new(&OpenAiConfig {
            api_key: "sk-test".into(),
            model: "gpt-4o-mini".into(),
            base_url: base_url.to_string(),
        })
    }

    pub(crate) fn completion_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }]
        })
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            system: "be brief".into(),
            messages: vec![ChatMessage::user("hello")],
            max_tokens: 50,
            temperature: 0.7,
        }
    }

    #[tokio::test]
    async fn test_complete_prepends_system_prompt() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o-mini",
                "max_tokens": 50,
                "messages": [
                    { "role": "system", "content": "be brief" },
                    { "role": "user", "content": "hello" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("  hi there \n")))
            .expect(1)
            .mount(&server)
            .await;

        let text = test_client(&server.uri()).complete(&request()).await.unwrap();
        assert_eq!(text, "hi there");
    }

    #[tokio::test]
    async fn test_blank_content_is_empty_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("   ")))
            .mount(&server)
            .await;

        let err = test_client(&server.uri()).complete(&request()).await.unwrap_err();
        assert!(matches!(err, ChatError::Empty));
    }

    #[tokio::test]
    async fn test_error_status_keeps_provider_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(429)
                    .set_body_json(serde_json::json!({ "error": { "type": "rate_limit_exceeded" } })),
            )
            .mount(&server)
            .await;

        let err = test_client(&server.uri()).complete(&request()).await.unwrap_err();
        match err {
            ChatError::Api { status, body } => {
                assert_eq!(status, 429);
                assert!(body.contains("rate_limit_exceeded"), "got: {body}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
