//! Cosine-similarity ranking over the knowledge store

use super::store::{KnowledgeEntry, KnowledgeStore};
use std::cmp::Ordering;
use std::sync::Arc;

/// One ranked retrieval hit; ephemeral, never persisted
#[derive(Debug, Clone)]
pub struct RankedResult {
    pub entry: Arc<KnowledgeEntry>,
    pub score: f32,
}

/// Ranking interface; callers never depend on the scan strategy, so an ANN
/// index can replace the linear scan without touching them
pub trait Retriever: Send + Sync {
    /// Rank stored entries against a query vector, best first.
    ///
    /// A query whose dimension differs from the store's is "no results",
    /// not an error. Scores of zero or below are dropped.
    fn rank(&self, query: &[f32], top_n: usize) -> Vec<RankedResult>;
}

/// Compute cosine similarity between two embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Linear-scan cosine retriever; O(entries x dimension) per query
pub struct CosineRetriever {
    store: Arc<KnowledgeStore>,
}

impl CosineRetriever {
    pub fn new(store: Arc<KnowledgeStore>) -> Self {
        Self { store }
    }
}

impl Retriever for CosineRetriever {
    fn rank(&self, query: &[f32], top_n: usize) -> Vec<RankedResult> {
        let Some(dimension) = self.store.dimension() else {
            return Vec::new();
        };
        if query.len() != dimension {
            tracing::warn!(
                "Query vector has dimension {} but the store uses {}, returning no results",
                query.len(),
                dimension
            );
            return Vec::new();
        }

        let mut ranked: Vec<RankedResult> = self
            .store
            .entries()
            .iter()
            .map(|entry| RankedResult {
                entry: Arc::clone(entry),
                score: cosine_similarity(query, &entry.vector),
            })
            .collect();

        // Stable sort keeps insertion order for tied scores
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        ranked.truncate(top_n.min(self.store.len()));
        ranked.retain(|result| result.score > 0.0);
        ranked
    }
}
