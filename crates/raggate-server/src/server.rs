//! HTTP server assembly

use std::net::SocketAddr;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use raggate_core::Config;

use crate::routes;
use crate::state::AppState;

/// The raggate HTTP server.
pub struct Server {
    config: Config,
    state: AppState,
}

impl Server {
    pub fn new(config: Config) -> raggate_core::Result<Self> {
        let state = AppState::new(config.clone())?;
        Ok(Self { config, state })
    }

    fn build_router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/", get(routes::banner))
            .route("/v1/models", get(routes::models::list_models))
            .route("/v1/chat/completions", post(routes::chat::chat_completions))
            .route("/v1/health", get(routes::health::health))
            .route("/v1/stats", get(routes::health::stats))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(cors)
    }

    pub async fn start(self) -> anyhow::Result<()> {
        let addr: SocketAddr =
            format!("{}:{}", self.config.server.host, self.config.server.port).parse()?;
        let router = self.build_router();

        tracing::info!("listening on http://{}", addr);
        tracing::info!(
            models = ?self.config.chat.models,
            knowledge_entries = self.state.knowledge.len(),
            "serving /v1/chat/completions"
        );

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;
        Ok(())
    }
}
