//! HTTP web search client
//!
//! Search is fail-soft: whatever goes wrong (timeout, bad status, bad JSON)
//! is folded into an `{"error": ...}` value so the tool-call loop always has
//! a function result to hand back to the model.

use crate::config::SearchConfig;
use crate::error::{RaggateError, Result};
use crate::provider::traits::{SearchParams, WebSearch};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

pub struct HttpWebSearch {
    http_client: reqwest::Client,
    config: SearchConfig,
}

impl HttpWebSearch {
    pub fn new(config: SearchConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(RaggateError::Http)?;

        Ok(Self {
            http_client,
            config,
        })
    }

    async fn try_search(&self, params: &SearchParams) -> Result<Value> {
        let mut req = self.http_client.post(&self.config.url).json(params);
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RaggateError::ExternalError(format!(
                "search service error (HTTP {}): {}",
                status, body
            )));
        }

        response.json().await.map_err(RaggateError::Http)
    }
}

#[async_trait]
impl WebSearch for HttpWebSearch {
    async fn search(&self, params: &SearchParams) -> Value {
        match self.try_search(params).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("web search failed: {}", e);
                json!({ "error": e.to_string() })
            }
        }
    }
}
