//! OpenAI-compatible wire schemas
//!
//! The subset of the chat-completions API this gateway speaks, plus the
//! model-card shapes served on `/v1/models`.

use crate::message::{MessageContent, Role};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Inbound chat message; content may be a string or typed parts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub role: Role,
    pub content: MessageContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// POST /v1/chat/completions request body
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<InboundMessage>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub user: Option<String>,
    /// Extra generation parameters passed through to the provider verbatim
    #[serde(default)]
    pub extra: Option<Map<String, Value>>,
    /// Knowledge-base augmentation toggle, on unless the client opts out
    #[serde(default = "default_enable_rag")]
    pub enable_rag: bool,
    /// Knowledge entries to retrieve; absent or zero falls back to config
    #[serde(default)]
    pub rag_top_k: Option<usize>,
}

fn default_enable_rag() -> bool {
    true
}

/// Token usage estimates (character count / 4, not a real tokenizer)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageInfo {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

impl UsageInfo {
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Outbound assistant message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub role: Role,
    pub content: String,
}

/// One completion choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionChoice {
    pub index: usize,
    pub message: OutboundMessage,
    pub finish_reason: Option<String>,
}

/// Full (non-streaming) completion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatCompletionChoice>,
    pub usage: UsageInfo,
}

impl ChatCompletionResponse {
    /// Single-choice response with `finish_reason: "stop"`
    pub fn single(id: String, model: String, content: String, usage: UsageInfo) -> Self {
        Self {
            id,
            object: "chat.completion".to_string(),
            created: unix_now(),
            model,
            choices: vec![ChatCompletionChoice {
                index: 0,
                message: OutboundMessage {
                    role: Role::Assistant,
                    content,
                },
                finish_reason: Some("stop".to_string()),
            }],
            usage,
        }
    }
}

/// Incremental message delta inside a streamed chunk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeltaMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// One streamed choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionStreamChoice {
    pub index: usize,
    pub delta: DeltaMessage,
    pub finish_reason: Option<String>,
}

/// Streamed chunk envelope (`object: "chat.completion.chunk"`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionStreamResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatCompletionStreamChoice>,
}

impl ChatCompletionStreamResponse {
    fn with_choice(id: &str, model: &str, choice: ChatCompletionStreamChoice) -> Self {
        Self {
            id: id.to_string(),
            object: "chat.completion.chunk".to_string(),
            created: unix_now(),
            model: model.to_string(),
            choices: vec![choice],
        }
    }

    /// First chunk: announces the assistant role with empty content
    pub fn role_preamble(id: &str, model: &str) -> Self {
        Self::with_choice(
            id,
            model,
            ChatCompletionStreamChoice {
                index: 0,
                delta: DeltaMessage {
                    role: Some(Role::Assistant),
                    content: Some(String::new()),
                },
                finish_reason: None,
            },
        )
    }

    /// Content delta chunk
    pub fn delta(id: &str, model: &str, content: String) -> Self {
        Self::with_choice(
            id,
            model,
            ChatCompletionStreamChoice {
                index: 0,
                delta: DeltaMessage {
                    role: None,
                    content: Some(content),
                },
                finish_reason: None,
            },
        )
    }

    /// Terminal chunk with `finish_reason: "stop"`; followed only by `[DONE]`
    pub fn finish(id: &str, model: &str) -> Self {
        Self::with_choice(
            id,
            model,
            ChatCompletionStreamChoice {
                index: 0,
                delta: DeltaMessage::default(),
                finish_reason: Some("stop".to_string()),
            },
        )
    }
}

/// Permission block advertised on model cards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPermission {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub allow_create_engine: bool,
    pub allow_sampling: bool,
    pub allow_logprobs: bool,
    pub allow_search_indices: bool,
    pub allow_view: bool,
    pub allow_fine_tuning: bool,
    pub organization: String,
    pub group: Option<String>,
    pub is_blocking: bool,
}

impl Default for ModelPermission {
    fn default() -> Self {
        Self {
            id: "modelperm-default".to_string(),
            object: "model_permission".to_string(),
            created: unix_now(),
            allow_create_engine: false,
            allow_sampling: true,
            allow_logprobs: true,
            allow_search_indices: false,
            allow_view: true,
            allow_fine_tuning: false,
            organization: "*".to_string(),
            group: None,
            is_blocking: false,
        }
    }
}

/// One entry on /v1/models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCard {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
    pub permission: Vec<ModelPermission>,
    pub root: Option<String>,
    pub parent: Option<String>,
}

impl ModelCard {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object: "model".to_string(),
            created: unix_now(),
            owned_by: "owner".to_string(),
            permission: vec![ModelPermission::default()],
            root: None,
            parent: None,
        }
    }
}

/// GET /v1/models response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelList {
    pub object: String,
    pub data: Vec<ModelCard>,
}

impl ModelList {
    pub fn new(data: Vec<ModelCard>) -> Self {
        Self {
            object: "list".to_string(),
            data,
        }
    }
}
