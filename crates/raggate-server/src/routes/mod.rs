//! Route handlers for the OpenAI-compatible surface

pub mod chat;
pub mod health;
pub mod models;

use axum::Json;
use serde_json::{json, Value};

/// GET / - service banner
pub async fn banner() -> Json<Value> {
    Json(json!({
        "message": "raggate: OpenAI-compatible chat gateway with RAG and web search",
        "version": raggate_core::VERSION,
        "endpoints": ["/v1/models", "/v1/chat/completions", "/v1/health", "/v1/stats"],
        "features": ["RAG", "MultiModal", "WebSearch", "ConversationHistory"],
    }))
}
