use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a message. Closed set — the original document format used a
/// free string ("user"/"ai"/"system"), which allowed invalid roles to reach
/// the prompt builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[serde(rename = "ai")]
    Agent,
    System,
}

impl Role {
    /// Label used when formatting history for the summarizer.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Agent => "Companion",
            Role::System => "System",
        }
    }
}

/// One stored chat message. Append-only; never mutated or deleted.
///
/// Ordering within a conversation is `(created_at, id)` ascending — the id
/// breaks ties between messages written in the same instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(conversation_id: &str, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id: conversation_id.to_string(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// Ordering key within a conversation.
    pub fn sort_key(&self) -> (DateTime<Utc>, Uuid) {
        (self.created_at, self.id)
    }
}

/// One element of the assembled prompt sequence sent to the generation
/// capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub role: Role,
    pub content: String,
}

impl ContextEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn from_message(msg: &Message) -> Self {
        Self {
            role: msg.role,
            content: msg.content.clone(),
        }
    }
}

/// The rolling digest persisted per conversation. Exactly one live record
/// per conversation; each save overwrites the prior digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationDigest {
    pub conversation_id: String,
    pub digest: String,
    pub updated_at: DateTime<Utc>,
}

/// Structured facts pulled from the older slice of a conversation.
/// Transient: recomputed on every compaction, never merged with a prior
/// value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyFacts {
    pub interests: Vec<String>,
    pub emotional_state: String,
    pub events: Vec<String>,
    pub people: Vec<String>,
    pub preferences: Vec<String>,
}

impl KeyFacts {
    /// True when every field is absent. An all-empty value produces no
    /// facts entry in the assembled context.
    pub fn is_empty(&self) -> bool {
        self.interests.is_empty()
            && self.emotional_state.is_empty()
            && self.events.is_empty()
            && self.people.is_empty()
            && self.preferences.is_empty()
    }
}
