//! HTTP embedding client
//!
//! The embedding endpoint accepts a batch of sentences and answers either
//! with a bare JSON array of vectors or with the usual `{code, data, msg}`
//! envelope wrapping that array. Both shapes are accepted here.

use crate::config::GatewayConfig;
use crate::error::{RaggateError, Result};
use crate::provider::traits::Embedder;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

pub struct HttpEmbedder {
    http_client: reqwest::Client,
    config: GatewayConfig,
}

impl HttpEmbedder {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.embedding_timeout_secs))
            .build()
            .map_err(RaggateError::Http)?;

        Ok(Self {
            http_client,
            config,
        })
    }
}

fn vectors_from_body(body: &Value) -> Option<Vec<Vec<f32>>> {
    let rows = match body {
        Value::Array(rows) => rows,
        Value::Object(map) => {
            if map.get("code").and_then(Value::as_i64) != Some(0) {
                return None;
            }
            map.get("data")?.as_array()?
        }
        _ => return None,
    };

    rows.iter()
        .map(|row| {
            row.as_array()?
                .iter()
                .map(|v| v.as_f64().map(|f| f as f32))
                .collect()
        })
        .collect()
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| RaggateError::ExternalError("embedding service sent no vector".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        #[derive(Serialize)]
        struct EmbeddingPayload<'a> {
            model_name: &'a str,
            sentences: &'a [String],
        }

        let mut req = self.http_client.post(self.config.embeddings_url()).json(&EmbeddingPayload {
            model_name: &self.config.embedding_model,
            sentences: texts,
        });
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RaggateError::ExternalError(format!(
                "embedding service error (HTTP {}): {}",
                status, body
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            RaggateError::ExternalError(format!("embedding service sent a non-JSON body: {}", e))
        })?;

        let vectors = vectors_from_body(&body).ok_or_else(|| {
            RaggateError::ExternalError(format!(
                "embedding service sent an unexpected body: {}",
                body
            ))
        })?;

        if vectors.len() != texts.len() {
            return Err(RaggateError::ExternalError(format!(
                "embedding service sent {} vectors for {} sentences",
                vectors.len(),
                texts.len()
            )));
        }

        Ok(vectors)
    }

    fn model_name(&self) -> &str {
        &self.config.embedding_model
    }
}
