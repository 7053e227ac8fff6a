//! Knowledge store loading and validation
//!
//! Entries come from a JSON file written by an offline embedding job. The
//! store is immutable after load; validation happens here, never at query
//! time. The first valid entry fixes the vector dimension and every later
//! entry must match it.

use crate::error::{RaggateError, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// One embedded knowledge entry
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeEntry {
    pub text: String,
    pub tag: String,
    pub vector: Vec<f32>,
}

/// File shape of one entry; `tag` is optional in older dumps
#[derive(Debug, Deserialize)]
struct RawEntry {
    text: String,
    #[serde(default = "default_tag")]
    tag: String,
    embedding: Vec<f32>,
}

fn default_tag() -> String {
    "unknown".to_string()
}

/// Immutable set of embedded knowledge entries with a uniform dimension
#[derive(Debug, Default)]
pub struct KnowledgeStore {
    entries: Vec<Arc<KnowledgeEntry>>,
    dimension: Option<usize>,
}

impl KnowledgeStore {
    /// Empty store; retrieval over it yields nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load entries from a JSON file, dropping invalid ones with a warning
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let raw: serde_json::Value = serde_json::from_str(&content)?;

        let items = raw.as_array().ok_or_else(|| {
            RaggateError::Knowledge(format!("{} does not contain a JSON list", path.display()))
        })?;

        let store = Self::from_values(items);
        tracing::info!(
            "Loaded {} knowledge entries from {} (dimension: {:?})",
            store.len(),
            path.display(),
            store.dimension()
        );
        Ok(store)
    }

    /// Build a store from already-parsed JSON values, one entry per value.
    ///
    /// Entries that fail to parse, carry an empty vector, or disagree with
    /// the dimension fixed by the first valid entry are skipped.
    pub fn from_values(items: &[serde_json::Value]) -> Self {
        let mut entries = Vec::with_capacity(items.len());
        let mut dimension: Option<usize> = None;

        for (idx, item) in items.iter().enumerate() {
            let raw: RawEntry = match serde_json::from_value(item.clone()) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!("Knowledge entry {} is malformed, skipping: {}", idx, e);
                    continue;
                }
            };

            if raw.embedding.is_empty() {
                tracing::warn!("Knowledge entry {} has an empty vector, skipping", idx);
                continue;
            }

            match dimension {
                None => dimension = Some(raw.embedding.len()),
                Some(expected) if raw.embedding.len() != expected => {
                    tracing::warn!(
                        "Knowledge entry {} has dimension {} but the store uses {}, skipping",
                        idx,
                        raw.embedding.len(),
                        expected
                    );
                    continue;
                }
                Some(_) => {}
            }

            entries.push(Arc::new(KnowledgeEntry {
                text: raw.text,
                tag: raw.tag,
                vector: raw.embedding,
            }));
        }

        Self { entries, dimension }
    }

    pub fn entries(&self) -> &[Arc<KnowledgeEntry>] {
        &self.entries
    }

    /// Vector dimension fixed by the first valid entry; None when empty
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
