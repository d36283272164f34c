use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::types::{ConversationDigest, Message, Role};

/// Persistence seam for the chat core: the per-conversation message log,
/// the rolling digest, and the chat-day streak counter.
///
/// Injected at construction so tests can substitute a deterministic stub.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Append a message, assigning its id and timestamp. Storage
    /// unavailability surfaces as an error — never a silent drop.
    async fn append(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
    ) -> Result<Message, StoreError>;

    /// The most recent messages for a conversation, ascending by
    /// `(created_at, id)`, oldest first, at most `limit` items.
    async fn fetch_recent(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>, StoreError>;

    /// Count of user messages on the given calendar day, excluding one
    /// message id (the one just written).
    async fn count_user_messages_on(
        &self,
        conversation_id: &str,
        day: NaiveDate,
        exclude: Uuid,
    ) -> Result<usize, StoreError>;

    /// Overwrite the conversation's digest. Last write wins.
    async fn upsert_digest(&self, conversation_id: &str, digest: &str) -> Result<(), StoreError>;

    async fn fetch_digest(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationDigest>, StoreError>;

    /// Increment the chat-day streak and return the new value.
    async fn bump_chat_days(&self, conversation_id: &str) -> Result<u32, StoreError>;

    async fn chat_days(&self, conversation_id: &str) -> Result<u32, StoreError>;
}

/// In-memory `ChatStore`. A document-backed implementation slots in behind
/// the same trait once one is needed; everything above the trait is
/// indifferent to which is live.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    messages: HashMap<String, Vec<Message>>,
    digests: HashMap<String, ConversationDigest>,
    streaks: HashMap<String, u32>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total stored messages across all conversations.
    pub async fn message_count(&self) -> usize {
        let inner = self.inner.read().await;
        inner.messages.values().map(|v| v.len()).sum()
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn append(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
    ) -> Result<Message, StoreError> {
        let message = Message::new(conversation_id, role, content);
        let mut inner = self.inner.write().await;
        inner
            .messages
            .entry(conversation_id.to_string())
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    async fn fetch_recent(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>, StoreError> {
        let inner = self.inner.read().await;
        let Some(log) = inner.messages.get(conversation_id) else {
            return Ok(Vec::new());
        };

        let mut ordered = log.clone();
        ordered.sort_by_key(Message::sort_key);
        let skip = ordered.len().saturating_sub(limit);
        Ok(ordered.split_off(skip))
    }

    async fn count_user_messages_on(
        &self,
        conversation_id: &str,
        day: NaiveDate,
        exclude: Uuid,
    ) -> Result<usize, StoreError> {
        let inner = self.inner.read().await;
        let count = inner
            .messages
            .get(conversation_id)
            .map(|log| {
                log.iter()
                    .filter(|m| {
                        m.role == Role::User
                            && m.id != exclude
                            && m.created_at.date_naive() == day
                    })
                    .count()
            })
            .unwrap_or(0);
        Ok(count)
    }

    async fn upsert_digest(&self, conversation_id: &str, digest: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.digests.insert(
            conversation_id.to_string(),
            ConversationDigest {
                conversation_id: conversation_id.to_string(),
                digest: digest.to_string(),
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn fetch_digest(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationDigest>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.digests.get(conversation_id).cloned())
    }

    async fn bump_chat_days(&self, conversation_id: &str) -> Result<u32, StoreError> {
        let mut inner = self.inner.write().await;
        let days = inner.streaks.entry(conversation_id.to_string()).or_insert(0);
        *days += 1;
        Ok(*days)
    }

    async fn chat_days(&self, conversation_id: &str) -> Result<u32, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.streaks.get(conversation_id).copied().unwrap_or(0))
    }
}
