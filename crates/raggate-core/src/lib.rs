//! Raggate Core Library
//!
//! Core functionality for the raggate OpenAI-compatible chat gateway.
//!
//! # Features
//! - Chat-completions pipeline over an envelope-protocol LLM provider
//! - Retrieval-augmented generation from an in-memory knowledge base
//! - Inline `<APIs>` tool-call loop with web search and result condensation
//! - OCR and caption folding for image messages
//! - Per-user capped session history
//! - SSE stream translation into OpenAI `chat.completion.chunk` frames

pub mod api;
pub mod config;
pub mod error;
pub mod knowledge;
pub mod message;
pub mod orchestrator;
pub mod prompts;
pub mod provider;
pub mod rag;
pub mod session;
pub mod stream;
pub mod summarize;
pub mod toolcall;

pub use api::{
    ChatCompletionRequest, ChatCompletionResponse, ChatCompletionStreamResponse, InboundMessage,
    ModelCard, ModelList, UsageInfo,
};
pub use config::{ChatConfig, Config, GatewayConfig, SearchConfig, ServerConfig};
pub use error::{RaggateError, Result};
pub use knowledge::{
    cosine_similarity, CosineRetriever, KnowledgeEntry, KnowledgeStore, RankedResult, Retriever,
};
pub use message::{normalize_content, Message, MessageContent, Role, Segment};
pub use orchestrator::{Orchestrator, TurnOutput, DEFAULT_USER_KEY};
pub use provider::{
    ByteStream, ChatModel, ChatOutcome, Embedder, GenerationParams, HttpChatModel, HttpEmbedder,
    HttpVision, HttpWebSearch, SearchParams, Vision, WebSearch,
};
pub use rag::RagContextBuilder;
pub use session::{SessionStats, SessionStore};
pub use stream::{OutboundFrame, RelayHandle, StreamStep, StreamTranslator, DONE_SENTINEL};
pub use summarize::ResultSummarizer;
pub use toolcall::{detect_tool_call, ToolCall, ToolCallOutcome};

/// Crate version, surfaced on the service banner
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "raggate";
