//! Health and statistics endpoints

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /v1/health - liveness plus a snapshot of the pipeline's moving parts
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let stats = state.sessions.stats().await;
    let rag_ready = !state.knowledge.is_empty();

    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().timestamp(),
        "rag_available": rag_ready,
        "active_sessions": stats.sessions,
        "system_info": {
            "rag_initialized": rag_ready,
            "knowledge_base_size": state.knowledge.len(),
        }
    }))
}

/// GET /v1/stats - session and knowledge base counters
pub async fn stats(State(state): State<AppState>) -> Json<Value> {
    let stats = state.sessions.stats().await;
    let rag_status = if state.knowledge.is_empty() {
        "unavailable"
    } else {
        "available"
    };

    Json(json!({
        "active_sessions": stats.sessions,
        "total_messages": stats.total_messages,
        "rag_status": rag_status,
        "knowledge_base_entries": state.knowledge.len(),
    }))
}
