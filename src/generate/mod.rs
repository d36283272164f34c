use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::GenerationError;
use crate::types::{ContextEntry, Role};

/// The text-generation capability, behind a trait so the context core and
/// tests can swap in deterministic stubs.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Ask the model for one completion over the given entries.
    async fn generate(
        &self,
        system_instructions: &str,
        messages: &[ContextEntry],
        temperature: f32,
        max_output_tokens: u32,
    ) -> Result<String, GenerationError>;
}

/// OpenAI-compatible chat-completions client.
pub struct OpenAiGenerator {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_base_url("https://api.openai.com/v1".into(), api_key, model)
    }

    /// Point at a compatible endpoint (proxy, local server).
    pub fn with_base_url(base_url: String, api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
            model,
        }
    }

    fn wire_role(role: Role) -> &'static str {
        match role {
            Role::User => "user",
            Role::Agent => "assistant",
            Role::System => "system",
        }
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(
        &self,
        system_instructions: &str,
        messages: &[ContextEntry],
        temperature: f32,
        max_output_tokens: u32,
    ) -> Result<String, GenerationError> {
        let mut wire_messages = Vec::with_capacity(messages.len() + 1);
        wire_messages.push(serde_json::json!({
            "role": "system",
            "content": system_instructions,
        }));
        for entry in messages {
            wire_messages.push(serde_json::json!({
                "role": Self::wire_role(entry.role),
                "content": entry.content,
            }));
        }

        let body = serde_json::json!({
            "model": self.model,
            "messages": wire_messages,
            "temperature": temperature,
            "max_tokens": max_output_tokens,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Transient(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Transient(format!("{status}: {text}")));
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;

        debug!(model = %self.model, "generation call completed");

        let content = parsed
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|c| c.pointer("/message/content"))
            .and_then(|c| c.as_str())
            .map(|c| c.trim().to_string());

        match content {
            Some(text) if !text.is_empty() => Ok(text),
            _ => Err(GenerationError::Malformed(
                "response carried no message content".into(),
            )),
        }
    }
}
