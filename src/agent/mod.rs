use std::sync::Arc;

use tracing::{info, warn};

use crate::config::PersonaConfig;
use crate::context::ContextManager;
use crate::error::StoreError;
use crate::generate::Generator;
use crate::store::ChatStore;
use crate::types::{ContextEntry, Message, Role};

/// Canned reply used when the generation capability fails. A broken model
/// call must read as a stumble, not an error page.
const FALLBACK_REPLY: &str =
    "Sorry, I lost my train of thought for a second. Could you say that again?";

/// Outcome of recording a user message.
#[derive(Debug, Clone)]
pub struct SendReceipt {
    pub message: Message,
    /// Whether this was the first user message of its calendar day.
    pub first_of_day: bool,
    pub chat_days: u32,
}

/// Persona-flavored reply generation over the assembled context.
pub struct ReplyEngine {
    context: Arc<ContextManager>,
    generator: Arc<dyn Generator>,
    store: Arc<dyn ChatStore>,
    persona: PersonaConfig,
}

impl ReplyEngine {
    pub fn new(
        context: Arc<ContextManager>,
        generator: Arc<dyn Generator>,
        store: Arc<dyn ChatStore>,
        persona: PersonaConfig,
    ) -> Self {
        Self {
            context,
            generator,
            store,
            persona,
        }
    }

    /// Record an incoming user message and maintain the chat-day streak.
    ///
    /// The streak check is not exactly-once: two near-simultaneous first
    /// messages of a day can each observe zero prior messages and both bump
    /// the counter. The counter is cosmetic, so no coordination is added.
    pub async fn send_message(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<SendReceipt, StoreError> {
        let message = self
            .context
            .record_message(conversation_id, Role::User, content)
            .await?;

        let today = message.created_at.date_naive();
        let prior_today = self
            .store
            .count_user_messages_on(conversation_id, today, message.id)
            .await?;

        let (first_of_day, chat_days) = if prior_today == 0 {
            let days = self.store.bump_chat_days(conversation_id).await?;
            info!(conversation = conversation_id, days, "first message of the day");
            (true, days)
        } else {
            (false, self.store.chat_days(conversation_id).await?)
        };

        Ok(SendReceipt {
            message,
            first_of_day,
            chat_days,
        })
    }

    /// Generate, record, and return the companion's reply to `user_content`.
    ///
    /// Context enrichment and the post-reply summary refresh are both
    /// best-effort; only storage failures propagate.
    pub async fn reply(
        &self,
        conversation_id: &str,
        user_content: &str,
    ) -> Result<Message, StoreError> {
        let mut entries = self
            .context
            .get_context(conversation_id, &self.persona.personality)
            .await?;
        entries.push(ContextEntry::new(Role::User, user_content));

        let text = match self
            .generator
            .generate(&self.system_prompt(), &entries, 0.7, 200)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(conversation = conversation_id, "reply generation failed: {e}");
                FALLBACK_REPLY.to_string()
            }
        };

        let reply = self
            .context
            .record_message(conversation_id, Role::Agent, &text)
            .await?;

        if let Err(e) = self
            .context
            .save_periodic_summary(conversation_id, &self.persona.personality)
            .await
        {
            warn!(conversation = conversation_id, "periodic summary not saved: {e}");
        }

        Ok(reply)
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are a companion named {}. Your character: {}. \
             Reply warmly and attentively, like a real partner would. \
             Do not mention being an AI. Keep replies short, usually under 100 words.",
            self.persona.name, self.persona.personality
        )
    }
}
