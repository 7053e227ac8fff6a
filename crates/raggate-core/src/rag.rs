//! Retrieval-augmented context assembly
//!
//! Retrieval is strictly best-effort: a knowledge base that is empty,
//! mismatched or unreachable must never fail the chat turn, so every
//! problem here degrades to "no context" with a warning.

use crate::knowledge::{RankedResult, Retriever};
use crate::prompts::augment_with_context;
use crate::provider::Embedder;
use std::sync::Arc;

/// Render one retrieval hit as a reference block for the prompt
fn render_block(result: &RankedResult) -> String {
    format!(
        "[{}] knowledge reference (similarity: {:.2}):\n{}",
        result.entry.tag, result.score, result.entry.text
    )
}

/// Builds the context section injected ahead of the user question
pub struct RagContextBuilder {
    embedder: Arc<dyn Embedder>,
    retriever: Arc<dyn Retriever>,
}

impl RagContextBuilder {
    pub fn new(embedder: Arc<dyn Embedder>, retriever: Arc<dyn Retriever>) -> Self {
        Self {
            embedder,
            retriever,
        }
    }

    /// Retrieve up to `top_k` reference blocks for a query.
    ///
    /// Returns `None` when retrieval is disabled (`top_k == 0`), finds
    /// nothing, or fails; the caller then sends the question untouched.
    pub async fn context_for(&self, query: &str, top_k: usize) -> Option<String> {
        if top_k == 0 || query.trim().is_empty() {
            return None;
        }

        let vector = match self.embedder.embed(query).await {
            Ok(vector) => vector,
            Err(e) => {
                tracing::warn!("embedding failed, continuing without retrieval: {}", e);
                return None;
            }
        };

        let results = self.retriever.rank(&vector, top_k);
        if results.is_empty() {
            return None;
        }

        tracing::debug!(
            hits = results.len(),
            best = results[0].score,
            "retrieved knowledge context"
        );

        Some(
            results
                .iter()
                .map(render_block)
                .collect::<Vec<_>>()
                .join("\n\n"),
        )
    }

    /// Produce the question as the model should see it: wrapped with
    /// retrieved context when there is any, untouched otherwise.
    pub async fn augment(&self, question: &str, top_k: usize) -> String {
        match self.context_for(question, top_k).await {
            Some(context) => augment_with_context(&context, question),
            None => question.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RaggateError, Result};
    use crate::knowledge::KnowledgeEntry;
    use async_trait::async_trait;

    struct FixedEmbedder(Option<Vec<f32>>);

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            self.0
                .clone()
                .ok_or_else(|| RaggateError::ExternalError("embedder down".into()))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::new();
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    struct FixedRetriever(Vec<(String, String, f32)>);

    impl Retriever for FixedRetriever {
        fn rank(&self, _query: &[f32], top_n: usize) -> Vec<RankedResult> {
            self.0
                .iter()
                .take(top_n)
                .map(|(text, tag, score)| RankedResult {
                    entry: Arc::new(KnowledgeEntry {
                        text: text.clone(),
                        tag: tag.clone(),
                        vector: vec![1.0],
                    }),
                    score: *score,
                })
                .collect()
        }
    }

    fn builder(
        embedder: FixedEmbedder,
        hits: Vec<(String, String, f32)>,
    ) -> RagContextBuilder {
        RagContextBuilder::new(Arc::new(embedder), Arc::new(FixedRetriever(hits)))
    }

    #[tokio::test]
    async fn blocks_carry_tag_and_two_decimal_score() {
        let builder = builder(
            FixedEmbedder(Some(vec![1.0])),
            vec![("Planets orbit the sun.".into(), "astronomy".into(), 0.91234)],
        );

        let context = builder.context_for("orbits", 2).await.unwrap();
        assert_eq!(
            context,
            "[astronomy] knowledge reference (similarity: 0.91):\nPlanets orbit the sun."
        );
    }

    #[tokio::test]
    async fn multiple_blocks_join_with_blank_line() {
        let builder = builder(
            FixedEmbedder(Some(vec![1.0])),
            vec![
                ("first".into(), "a".into(), 0.9),
                ("second".into(), "b".into(), 0.8),
            ],
        );

        let context = builder.context_for("q", 2).await.unwrap();
        assert_eq!(context.matches("\n\n").count(), 1);
        assert!(context.starts_with("[a]"));
        assert!(context.contains("[b] knowledge reference"));
    }

    #[tokio::test]
    async fn embedder_failure_degrades_to_no_context() {
        let builder = builder(
            FixedEmbedder(None),
            vec![("unreachable".into(), "t".into(), 0.9)],
        );

        assert!(builder.context_for("q", 2).await.is_none());
        assert_eq!(builder.augment("q", 2).await, "q");
    }

    #[tokio::test]
    async fn zero_top_k_skips_retrieval_entirely() {
        let builder = builder(
            FixedEmbedder(Some(vec![1.0])),
            vec![("hit".into(), "t".into(), 0.9)],
        );
        assert!(builder.context_for("q", 0).await.is_none());
    }

    #[tokio::test]
    async fn augment_wraps_question_with_context() {
        let builder = builder(
            FixedEmbedder(Some(vec![1.0])),
            vec![("fact".into(), "t".into(), 0.5)],
        );

        let augmented = builder.augment("what is it?", 1).await;
        assert!(augmented.contains("[t] knowledge reference (similarity: 0.50):\nfact"));
        assert!(augmented.contains("what is it?"));
        assert!(augmented.len() > "what is it?".len());
    }
}
