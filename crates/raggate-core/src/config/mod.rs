//! Configuration management

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP bind settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream gateway (chat, embeddings, vision)
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Web search service
    #[serde(default)]
    pub search: SearchConfig,

    /// Knowledge base file
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Chat pipeline behavior
    #[serde(default)]
    pub chat: ChatConfig,
}

/// HTTP server bind configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("RAGGATE_HOST").unwrap_or_else(|_| default_host()),
            port: std::env::var("RAGGATE_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_port),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Upstream gateway configuration for chat, embeddings and vision calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL for synchronous chat completions
    #[serde(default = "default_gateway_url")]
    pub url: String,

    /// URL for streaming chat completions (falls back to `url`)
    #[serde(default)]
    pub stream_url: Option<String>,

    /// API key sent as a bearer token (optional, for authenticated gateways)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Chat request timeout in seconds
    #[serde(default = "default_chat_timeout")]
    pub timeout_secs: u64,

    /// Base URL for the embeddings service (falls back to `url`)
    #[serde(default)]
    pub embedding_url: Option<String>,

    /// Model name for embeddings
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Embedding request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub embedding_timeout_secs: u64,

    /// Base URL for the multimodal vision service (falls back to `url`)
    #[serde(default)]
    pub vision_url: Option<String>,

    /// Model name for OCR and image description calls
    #[serde(default = "default_vision_model")]
    pub vision_model: String,

    /// Vision request timeout in seconds
    #[serde(default = "default_vision_timeout")]
    pub vision_timeout_secs: u64,
}

impl GatewayConfig {
    /// Streaming URL (falls back to the synchronous URL)
    pub fn streaming_url(&self) -> &str {
        self.stream_url.as_deref().unwrap_or(&self.url)
    }

    /// Embeddings URL (falls back to the main URL)
    pub fn embeddings_url(&self) -> &str {
        self.embedding_url.as_deref().unwrap_or(&self.url)
    }

    /// Vision URL (falls back to the main URL)
    pub fn vision_service_url(&self) -> &str {
        self.vision_url.as_deref().unwrap_or(&self.url)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: default_gateway_url(),
            stream_url: std::env::var("RAGGATE_GATEWAY_STREAM_URL").ok(),
            api_key: std::env::var("RAGGATE_GATEWAY_API_KEY").ok(),
            timeout_secs: default_chat_timeout(),
            embedding_url: std::env::var("RAGGATE_EMBEDDING_URL").ok(),
            embedding_model: default_embedding_model(),
            embedding_timeout_secs: default_embedding_timeout(),
            vision_url: std::env::var("RAGGATE_VISION_URL").ok(),
            vision_model: default_vision_model(),
            vision_timeout_secs: default_vision_timeout(),
        }
    }
}

fn default_gateway_url() -> String {
    std::env::var("RAGGATE_GATEWAY_URL")
        .unwrap_or_else(|_| "http://localhost:9000/completions".to_string())
}

fn default_chat_timeout() -> u64 {
    100
}

fn default_embedding_model() -> String {
    std::env::var("RAGGATE_EMBEDDING_MODEL").unwrap_or_else(|_| "m3e-base".to_string())
}

fn default_embedding_timeout() -> u64 {
    20
}

fn default_vision_model() -> String {
    std::env::var("RAGGATE_VISION_MODEL").unwrap_or_else(|_| "raggate-vision".to_string())
}

fn default_vision_timeout() -> u64 {
    15
}

/// Web search service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search endpoint URL
    #[serde(default = "default_search_url")]
    pub url: String,

    /// API key sent as a bearer token
    #[serde(default)]
    pub api_key: Option<String>,

    /// Search request timeout in seconds
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            url: default_search_url(),
            api_key: std::env::var("RAGGATE_SEARCH_API_KEY").ok(),
            timeout_secs: default_search_timeout(),
        }
    }
}

fn default_search_url() -> String {
    std::env::var("RAGGATE_SEARCH_URL")
        .unwrap_or_else(|_| "http://localhost:9100/search".to_string())
}

fn default_search_timeout() -> u64 {
    10
}

/// Knowledge base configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Path to the JSON file of embedded knowledge entries
    #[serde(default = "default_knowledge_path")]
    pub path: PathBuf,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            path: std::env::var("RAGGATE_KNOWLEDGE_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_knowledge_path()),
        }
    }
}

fn default_knowledge_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(crate::CONFIG_DIR_NAME)
        .join("knowledge.json")
}

/// Chat pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Model identifiers advertised on /v1/models; the first is the default
    #[serde(default = "default_models")]
    pub models: Vec<String>,

    /// History cap in turns; stored messages are capped at twice this
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Serialized search results longer than this are summarized
    #[serde(default = "default_summary_threshold")]
    pub summary_threshold: usize,

    /// Knowledge entries retrieved per query when the request does not say
    #[serde(default = "default_rag_top_k")]
    pub rag_top_k: usize,

    /// Sampling temperature used when the request omits one
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Completion length cap used when the request omits one
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Nucleus sampling cap used when the request omits one
    #[serde(default = "default_top_p")]
    pub top_p: f64,

    /// Seconds without a provider chunk before a streaming read is abandoned
    #[serde(default = "default_stream_idle_timeout")]
    pub stream_idle_timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            models: default_models(),
            max_history: default_max_history(),
            summary_threshold: default_summary_threshold(),
            rag_top_k: default_rag_top_k(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            stream_idle_timeout_secs: default_stream_idle_timeout(),
        }
    }
}

fn default_models() -> Vec<String> {
    vec!["raggate-chat".to_string(), "raggate-vision".to_string()]
}

fn default_max_history() -> usize {
    100
}

fn default_summary_threshold() -> usize {
    1500
}

fn default_rag_top_k() -> usize {
    2
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_top_p() -> f64 {
    1.0
}

fn default_stream_idle_timeout() -> u64 {
    600
}

impl Config {
    /// Load config from default path
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load config from an explicit path, falling back to defaults when absent
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }
}
