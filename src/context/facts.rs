use std::time::Duration;

use tracing::warn;

use crate::generate::Generator;
use crate::types::{ContextEntry, KeyFacts, Message, Role};

use super::summary::format_history;

const EXTRACTION_INSTRUCTIONS: &str = r#"You are an information extraction expert. From the conversation, extract:
1. the user's interests
2. the user's emotional state
3. important events or plans
4. names of people the user mentioned
5. the user's preferences

Respond with JSON only, in exactly this shape:
{
  "interests": ["..."],
  "emotional_state": "...",
  "events": ["..."],
  "people": ["..."],
  "preferences": ["..."]
}

Use an empty list or empty string for anything that is absent."#;

/// Derive structured key facts from the older message slice.
///
/// Never fails: any generation or parse problem resolves to the all-empty
/// `KeyFacts`, which the assembler then omits.
pub async fn extract(
    generator: &dyn Generator,
    messages: &[Message],
    timeout: Duration,
) -> KeyFacts {
    if messages.is_empty() {
        return KeyFacts::default();
    }

    let history = format_history(messages);
    let request = vec![ContextEntry::new(
        Role::User,
        format!("Extract the key facts from this conversation:\n\n{history}"),
    )];

    let call = generator.generate(EXTRACTION_INSTRUCTIONS, &request, 0.3, 300);
    let raw = match tokio::time::timeout(timeout, call).await {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            warn!("fact extraction skipped: {e}");
            return KeyFacts::default();
        }
        Err(_) => {
            warn!("fact extraction skipped: timed out after {}s", timeout.as_secs());
            return KeyFacts::default();
        }
    };

    parse_response(&raw)
}

/// Three-stage parse of a model response, each stage tried only when the
/// prior one fails:
/// 1. the whole response as a JSON record;
/// 2. the first balanced brace-delimited substring as a JSON record;
/// 3. the all-empty default.
pub fn parse_response(raw: &str) -> KeyFacts {
    if let Ok(facts) = serde_json::from_str::<KeyFacts>(raw) {
        return facts;
    }

    if let Some(candidate) = first_balanced_braces(raw) {
        if let Ok(facts) = serde_json::from_str::<KeyFacts>(candidate) {
            return facts;
        }
    }

    warn!("unparseable fact-extraction response, returning empty facts");
    KeyFacts::default()
}

/// The first balanced `{...}` substring, tracking string literals and
/// escapes so braces inside quoted text do not unbalance the scan.
fn first_balanced_braces(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in s[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}
