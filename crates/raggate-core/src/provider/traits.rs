//! Provider trait definitions

use crate::error::Result;
use crate::message::Message;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;

/// Extra generation parameters forwarded to the provider verbatim
pub type GenerationParams = Map<String, Value>;

/// Raw provider byte stream, consumed by the SSE relay
pub type ByteStream = BoxStream<'static, Result<bytes::Bytes>>;

/// A completed synchronous chat call
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub content: String,
    pub elapsed: Duration,
}

/// Chat completion trait
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Synchronous completion; the error carries the provider's cause
    async fn ask(
        &self,
        messages: &[Message],
        model: &str,
        extra: &GenerationParams,
    ) -> Result<ChatOutcome>;

    /// Streaming completion; an error means the stream never started
    async fn ask_stream(
        &self,
        messages: &[Message],
        model: &str,
        extra: &GenerationParams,
    ) -> Result<ByteStream>;
}

/// Embedding generation trait
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for batch of texts
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Web search trait; never fails, failures come back as an `error` key
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, params: &SearchParams) -> Value;
}

/// Multimodal vision trait
#[async_trait]
pub trait Vision: Send + Sync {
    /// OCR: extract the raw text visible in the image
    async fn extract_text(&self, image_b64: &str) -> Result<String>;

    /// Produce a natural-language description of the image
    async fn describe(&self, image_b64: &str) -> Result<String>;
}

/// Web search request parameters
#[derive(Debug, Clone, Serialize)]
pub struct SearchParams {
    pub search_query: String,
    pub search_engine: String,
    pub search_intent: bool,
    pub count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_domain_filter: Option<String>,
    pub search_recency_filter: String,
    pub content_size: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl SearchParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            search_query: query.into(),
            search_engine: "search_std".to_string(),
            search_intent: false,
            count: 10,
            search_domain_filter: None,
            search_recency_filter: "noLimit".to_string(),
            content_size: "medium".to_string(),
            request_id: None,
            user_id: None,
        }
    }

    /// Build from a parsed tool-call parameter mapping, filling defaults
    pub fn from_tool_parameters(parameters: &Map<String, Value>, user_id: &str) -> Self {
        let mut params = Self::new(
            parameters
                .get("search_query")
                .and_then(Value::as_str)
                .unwrap_or_default(),
        );
        if let Some(engine) = parameters.get("search_engine").and_then(Value::as_str) {
            params.search_engine = engine.to_string();
        }
        if let Some(intent) = parameters.get("search_intent").and_then(Value::as_bool) {
            params.search_intent = intent;
        }
        if let Some(count) = parameters.get("count").and_then(Value::as_u64) {
            params.count = count as u32;
        }
        params.search_domain_filter = parameters
            .get("search_domain_filter")
            .and_then(Value::as_str)
            .map(str::to_string);
        if let Some(recency) = parameters
            .get("search_recency_filter")
            .and_then(Value::as_str)
        {
            params.search_recency_filter = recency.to_string();
        }
        if let Some(size) = parameters.get("content_size").and_then(Value::as_str) {
            params.content_size = size.to_string();
        }
        params.request_id = parameters
            .get("request_id")
            .and_then(Value::as_str)
            .map(str::to_string);
        params.user_id = Some(user_id.to_string());
        params
    }
}
