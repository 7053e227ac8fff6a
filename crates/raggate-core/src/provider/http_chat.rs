//! HTTP chat client for the provider gateway
//!
//! The gateway is not OpenAI-shaped: system messages travel in a dedicated
//! `systemPrompt` field, every message carries a `contentType`, and replies
//! arrive inside a `{code, data, msg}` envelope where `code == 0` means
//! success even though the HTTP status is 200 either way.

use crate::config::GatewayConfig;
use crate::error::{RaggateError, Result};
use crate::message::{Message, Role};
use crate::provider::traits::{ByteStream, ChatModel, ChatOutcome, GenerationParams};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Chat message as the gateway expects it
#[derive(Debug, Serialize)]
struct WireMessage {
    role: Role,
    content: String,
    #[serde(rename = "contentType")]
    content_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatPayload {
    messages: Vec<WireMessage>,
    model: String,
    #[serde(rename = "sessionId")]
    session_id: String,
    extra: GenerationParams,
    #[serde(rename = "systemPrompt", skip_serializing_if = "Option::is_none")]
    system_prompt: Option<String>,
}

/// Merge system messages into `systemPrompt` and tag the rest for the wire
fn build_payload(messages: &[Message], model: &str, extra: &GenerationParams) -> ChatPayload {
    let system_prompt: Vec<&str> = messages
        .iter()
        .filter(|msg| msg.role == Role::System)
        .map(|msg| msg.content.as_str())
        .collect();

    let wire_messages = messages
        .iter()
        .filter(|msg| msg.role != Role::System)
        .map(|msg| WireMessage {
            role: msg.role,
            content: msg.content.clone(),
            content_type: "text",
            name: msg.name.clone(),
        })
        .collect();

    ChatPayload {
        messages: wire_messages,
        model: model.to_string(),
        session_id: Uuid::new_v4().to_string(),
        extra: extra.clone(),
        system_prompt: if system_prompt.is_empty() {
            None
        } else {
            Some(system_prompt.join("\n"))
        },
    }
}

/// Envelope chat client
pub struct HttpChatModel {
    http_client: reqwest::Client,
    config: GatewayConfig,
}

impl HttpChatModel {
    /// Create a new chat client from gateway configuration
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(RaggateError::Http)?;

        Ok(Self {
            http_client,
            config,
        })
    }

    fn request(&self, url: &str, payload: &ChatPayload) -> reqwest::RequestBuilder {
        let mut req = self
            .http_client
            .post(url)
            .query(&[("requestId", Uuid::new_v4().to_string())])
            .json(payload);

        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }
        req
    }
}

#[async_trait]
impl ChatModel for HttpChatModel {
    async fn ask(
        &self,
        messages: &[Message],
        model: &str,
        extra: &GenerationParams,
    ) -> Result<ChatOutcome> {
        #[derive(Deserialize)]
        struct Envelope {
            code: i64,
            #[serde(default)]
            data: Option<Value>,
            #[serde(default)]
            msg: Option<String>,
        }

        let payload = build_payload(messages, model, extra);
        let start = Instant::now();

        let response = self.request(&self.config.url, &payload).send().await?;
        let elapsed = start.elapsed();

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RaggateError::ExternalError(format!(
                "chat gateway error (HTTP {}): {}",
                status, body
            )));
        }

        let envelope: Envelope = response.json().await.map_err(|e| {
            RaggateError::ExternalError(format!("chat gateway sent a non-JSON 200 body: {}", e))
        })?;

        if envelope.code != 0 {
            return Err(RaggateError::Provider(format!(
                "chat gateway code {}: {}",
                envelope.code,
                envelope.msg.unwrap_or_default()
            )));
        }

        let content = envelope
            .data
            .as_ref()
            .and_then(|data| data.get("content"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                RaggateError::ExternalError(
                    "chat gateway replied code 0 without data.content".to_string(),
                )
            })?;

        Ok(ChatOutcome {
            content: content.to_string(),
            elapsed,
        })
    }

    async fn ask_stream(
        &self,
        messages: &[Message],
        model: &str,
        extra: &GenerationParams,
    ) -> Result<ByteStream> {
        let payload = build_payload(messages, model, extra);
        let url = self.config.streaming_url().to_string();

        let response = self.request(&url, &payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RaggateError::ExternalError(format!(
                "chat gateway refused the stream (HTTP {}): {}",
                status, body
            )));
        }

        Ok(response
            .bytes_stream()
            .map_err(RaggateError::Http)
            .boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_messages_merge_into_system_prompt() {
        let messages = vec![
            Message::system("first"),
            Message::user("question"),
            Message::system("second"),
        ];
        let payload = build_payload(&messages, "raggate-chat", &GenerationParams::new());

        assert_eq!(payload.system_prompt.as_deref(), Some("first\nsecond"));
        assert_eq!(payload.messages.len(), 1);
        assert_eq!(payload.messages[0].content, "question");
    }

    #[test]
    fn wire_messages_carry_content_type_and_name() {
        let messages = vec![
            Message::user("q"),
            Message::assistant("a"),
            Message::function("web_search", "{}"),
        ];
        let payload = build_payload(&messages, "raggate-chat", &GenerationParams::new());
        let value = serde_json::to_value(&payload).unwrap();

        assert!(value.get("systemPrompt").is_none());
        assert_eq!(value["messages"][0]["contentType"], "text");
        assert_eq!(value["messages"][2]["role"], "function");
        assert_eq!(value["messages"][2]["name"], "web_search");
        assert!(value["messages"][0].get("name").is_none());
    }
}
