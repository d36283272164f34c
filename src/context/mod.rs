pub mod facts;
pub mod summary;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::StoreError;
use crate::generate::Generator;
use crate::store::ChatStore;
use crate::types::{ContextEntry, KeyFacts, Message, Role};

/// Tuning for the context window. Defaults mirror the deployed values:
/// up to 20 raw messages, compaction target of half that.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Most raw messages an assembled context may carry.
    pub max_messages: usize,
    /// Post-compaction target; `recent_count = min(5, target_length / 2)`.
    pub target_length: usize,
    /// Per-call bound on summarizer / extractor generation calls.
    pub generation_timeout: Duration,
    /// How many trailing messages the periodic summary path scans.
    pub periodic_scan: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        let max_messages = 20;
        Self {
            max_messages,
            target_length: max_messages / 2,
            generation_timeout: Duration::from_secs(20),
            periodic_scan: 50,
        }
    }
}

/// Decides what slice of a conversation's history is fed to the generation
/// capability on each turn.
///
/// Histories at or under `max_messages` pass through raw, with no
/// generation calls. Longer histories are split: the older slice is
/// compacted into one digest entry plus one key-facts entry (both
/// best-effort, each with its own degraded fallback), and at most five
/// recent turns ride along verbatim. The digest is persisted per
/// conversation, last write wins.
pub struct ContextManager {
    store: Arc<dyn ChatStore>,
    generator: Arc<dyn Generator>,
    config: ContextConfig,
}

impl ContextManager {
    pub fn new(
        store: Arc<dyn ChatStore>,
        generator: Arc<dyn Generator>,
        config: ContextConfig,
    ) -> Self {
        Self {
            store,
            generator,
            config,
        }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Durably record one message. Storage failure propagates: a message
    /// that cannot be recorded must not be silently dropped.
    pub async fn record_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
    ) -> Result<Message, StoreError> {
        let message = self.store.append(conversation_id, role, content).await?;
        debug!(conversation = conversation_id, id = %message.id, "recorded message");
        Ok(message)
    }

    /// Build the ordered context for the next reply.
    ///
    /// The window state is recomputed from the message count on every call;
    /// nothing is carried between requests.
    pub async fn get_context(
        &self,
        conversation_id: &str,
        personality_hint: &str,
    ) -> Result<Vec<ContextEntry>, StoreError> {
        // Probe past the threshold so an over-long history is observable.
        let probe = self.config.max_messages * 2;
        let messages = self.store.fetch_recent(conversation_id, probe).await?;

        if messages.len() <= self.config.max_messages {
            // Common case: raw pass-through, no generation calls at all.
            return Ok(messages.iter().map(ContextEntry::from_message).collect());
        }

        let recent_count = 5.min(self.config.target_length / 2);
        let split = messages.len() - recent_count;
        let (older, recent) = messages.split_at(split);

        info!(
            conversation = conversation_id,
            older = older.len(),
            recent = recent.len(),
            "compacting context window"
        );

        // Same read-only input, no data dependency: run both at once. Each
        // resolves its own failures, so neither can abort the other.
        let timeout = self.config.generation_timeout;
        let (digest, key_facts) = tokio::join!(
            summary::digest(self.generator.as_ref(), older, personality_hint, timeout),
            facts::extract(self.generator.as_ref(), older, timeout),
        );

        let mut context = Vec::with_capacity(recent.len() + 2);
        if !key_facts.is_empty() {
            context.push(ContextEntry::new(Role::System, encode_facts(&key_facts)));
        }
        context.push(ContextEntry::new(
            Role::System,
            format!("[prior conversation summary] {digest}"),
        ));
        context.extend(recent.iter().map(ContextEntry::from_message));

        // The digest outlives this turn; the periodic path reads it back.
        self.store.upsert_digest(conversation_id, &digest).await?;

        Ok(context)
    }

    /// Lower-frequency summary refresh, run after a reply: digest the
    /// trailing window and overwrite the stored record. Same digest format
    /// as the per-turn path.
    pub async fn save_periodic_summary(
        &self,
        conversation_id: &str,
        personality_hint: &str,
    ) -> Result<Option<String>, StoreError> {
        let messages = self
            .store
            .fetch_recent(conversation_id, self.config.periodic_scan)
            .await?;
        if messages.is_empty() {
            return Ok(None);
        }

        let digest = summary::digest(
            self.generator.as_ref(),
            &messages,
            personality_hint,
            self.config.generation_timeout,
        )
        .await;
        self.store.upsert_digest(conversation_id, &digest).await?;

        debug!(conversation = conversation_id, "refreshed periodic summary");
        Ok(Some(digest))
    }
}

/// Encode key facts as one compact system entry.
fn encode_facts(facts: &KeyFacts) -> String {
    let json = serde_json::to_string(facts).unwrap_or_default();
    format!("Key facts from the earlier conversation, use them where relevant:\n{json}")
}
