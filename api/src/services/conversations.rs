//! Per-sender conversation history for DM replies
//!
//! The reply generator only depends on [`ConversationStore`]; the in-memory
//! store keeps history for the lifetime of the process and never evicts
//! senders. A durable store (Redis, Postgres) can implement the same trait.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::models::ChatMessage;

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Current ordered history for a sender (empty if unseen)
    async fn history(&self, sender_id: &str) -> Vec<ChatMessage>;

    /// Append an entry and return the trimmed history
    async fn append(&self, sender_id: &str, entry: ChatMessage) -> Vec<ChatMessage>;
}

/// Process-local history keyed by sender id, capped at `max_entries` per sender
pub struct InMemoryConversations {
    max_entries: usize,
    conversations: Mutex<HashMap<String, Vec<ChatMessage>>>,
}

impl InMemoryConversations {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            conversations: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversations {
    async fn history(&self, sender_id: &str) -> Vec<ChatMessage> {
        let conversations = self
            .conversations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        conversations.get(sender_id).cloned().unwrap_or_default()
    }

    async fn append(&self, sender_id: &str, entry: ChatMessage) -> Vec<ChatMessage> {
        let mut conversations = self
            .conversations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let history = conversations.entry(sender_id.to_string()).or_default();
        history.push(entry);
        trim_to_most_recent(history, self.max_entries);
        history.clone()
    }
}

/// Drop the oldest entries so at most `max` remain, keeping relative order
fn trim_to_most_recent(history: &mut Vec<ChatMessage>, max: usize) {
    if history.len() > max {
        let excess = history.len() - max;
        history.drain(..excess);
    }
}
