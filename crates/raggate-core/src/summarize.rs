//! Search-result condensation
//!
//! Function results feed straight back into the model's context, and raw
//! search payloads routinely blow past what a second completion can afford.
//! Results longer than the configured threshold are summarized by the chat
//! model itself and passed on as plain text; raw payloads travel under the
//! fixed `search_result` envelope key.

use crate::message::Message;
use crate::prompts::summarization_instruction;
use crate::provider::{ChatModel, GenerationParams};
use serde_json::{json, Value};
use std::sync::Arc;

pub struct ResultSummarizer {
    chat: Arc<dyn ChatModel>,
    threshold: usize,
}

impl ResultSummarizer {
    pub fn new(chat: Arc<dyn ChatModel>, threshold: usize) -> Self {
        Self { chat, threshold }
    }

    /// Turn a tool result into function-message content.
    ///
    /// Payloads at or under the threshold are wrapped in the envelope and
    /// returned as-is. Oversized ones get one summarization call quoting the
    /// executed search query, and the summary is returned bare; if that call
    /// fails the wrapped unabridged payload is returned.
    pub async fn condense(
        &self,
        query: &str,
        payload: &Value,
        model: &str,
        extra: &GenerationParams,
    ) -> String {
        let serialized = payload.to_string();
        if serialized.chars().count() <= self.threshold {
            return json!({ "search_result": payload }).to_string();
        }

        let instruction = summarization_instruction(query, &serialized);
        match self.chat.ask(&[Message::user(&instruction)], model, extra).await {
            Ok(outcome) => {
                tracing::debug!(
                    original_chars = serialized.chars().count(),
                    summary_chars = outcome.content.chars().count(),
                    "condensed oversized search result"
                );
                outcome.content
            }
            Err(e) => {
                tracing::warn!("summarization failed, passing the raw result through: {}", e);
                json!({ "search_result": payload }).to_string()
            }
        }
    }
}
