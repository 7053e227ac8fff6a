//! In-memory knowledge base: load-time validated entries plus cosine ranking

pub mod retriever;
pub mod store;

pub use retriever::{cosine_similarity, CosineRetriever, RankedResult, Retriever};
pub use store::{KnowledgeEntry, KnowledgeStore};
