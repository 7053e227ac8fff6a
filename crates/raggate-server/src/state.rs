//! Shared application state

use std::sync::Arc;

use raggate_core::{
    provider::{HttpChatModel, HttpEmbedder, HttpVision, HttpWebSearch},
    Config, KnowledgeStore, Orchestrator, Result, SessionStore,
};

/// State handed to every route handler.
///
/// The orchestrator owns the whole pipeline; the session and knowledge
/// stores are shared with it so the health and stats endpoints can report
/// on them without going through a turn.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub sessions: Arc<SessionStore>,
    pub knowledge: Arc<KnowledgeStore>,
    pub config: Config,
}

impl AppState {
    /// Wire up the provider clients and the pipeline from config.
    ///
    /// A missing or unreadable knowledge file is not fatal: the server
    /// comes up with retrieval disabled and says so in the log, matching
    /// the health endpoint's `rag_available` flag.
    pub fn new(config: Config) -> Result<Self> {
        let knowledge = match KnowledgeStore::load(&config.knowledge.path) {
            Ok(store) => {
                tracing::info!(
                    path = %config.knowledge.path.display(),
                    entries = store.len(),
                    "knowledge base loaded"
                );
                Arc::new(store)
            }
            Err(err) => {
                tracing::warn!(
                    path = %config.knowledge.path.display(),
                    error = %err,
                    "knowledge base unavailable, retrieval disabled"
                );
                Arc::new(KnowledgeStore::empty())
            }
        };

        let chat = Arc::new(HttpChatModel::new(config.gateway.clone())?);
        let embedder = Arc::new(HttpEmbedder::new(config.gateway.clone())?);
        let vision = Arc::new(HttpVision::new(config.gateway.clone())?);
        let search = Arc::new(HttpWebSearch::new(config.search.clone())?);
        let sessions = Arc::new(SessionStore::new(config.chat.max_history));

        let orchestrator = Arc::new(Orchestrator::new(
            chat,
            embedder,
            vision,
            search,
            Arc::clone(&knowledge),
            Arc::clone(&sessions),
            config.chat.clone(),
        ));

        Ok(Self {
            orchestrator,
            sessions,
            knowledge,
            config,
        })
    }
}
