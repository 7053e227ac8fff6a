//! HTTP vision client
//!
//! Images travel as a two-message pair: first the base64 payload with
//! `contentType: "image"`, then the instruction with `contentType: "text"`.
//! OCR and captioning hit the same endpoint with different sampling knobs.

use crate::config::GatewayConfig;
use crate::error::{RaggateError, Result};
use crate::prompts::{CAPTION_PROMPT, OCR_PROMPT};
use crate::provider::traits::{GenerationParams, Vision};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Serialize)]
struct VisionMessage<'a> {
    role: &'static str,
    content: &'a str,
    #[serde(rename = "contentType")]
    content_type: &'static str,
}

#[derive(Debug, Serialize)]
struct VisionPayload<'a> {
    messages: Vec<VisionMessage<'a>>,
    model: &'a str,
    #[serde(rename = "sessionId")]
    session_id: String,
    extra: GenerationParams,
}

pub struct HttpVision {
    http_client: reqwest::Client,
    config: GatewayConfig,
}

impl HttpVision {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.vision_timeout_secs))
            .build()
            .map_err(RaggateError::Http)?;

        Ok(Self {
            http_client,
            config,
        })
    }

    async fn ask_vision(
        &self,
        image_b64: &str,
        prompt: &str,
        extra: GenerationParams,
    ) -> Result<String> {
        #[derive(Deserialize)]
        struct Envelope {
            code: i64,
            #[serde(default)]
            data: Option<Value>,
            #[serde(default)]
            msg: Option<String>,
        }

        // Validation only; the decoded bytes are not used.
        base64::engine::general_purpose::STANDARD
            .decode(image_b64)
            .map_err(|e| RaggateError::InvalidInput(format!("image is not valid base64: {}", e)))?;

        let payload = VisionPayload {
            messages: vec![
                VisionMessage {
                    role: "user",
                    content: image_b64,
                    content_type: "image",
                },
                VisionMessage {
                    role: "user",
                    content: prompt,
                    content_type: "text",
                },
            ],
            model: &self.config.vision_model,
            session_id: Uuid::new_v4().to_string(),
            extra,
        };

        let mut req = self
            .http_client
            .post(self.config.vision_service_url())
            .query(&[("requestId", Uuid::new_v4().to_string())])
            .json(&payload);
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RaggateError::ExternalError(format!(
                "vision service error (HTTP {}): {}",
                status, body
            )));
        }

        let envelope: Envelope = response.json().await.map_err(|e| {
            RaggateError::ExternalError(format!("vision service sent a non-JSON 200 body: {}", e))
        })?;

        if envelope.code != 0 {
            return Err(RaggateError::Provider(format!(
                "vision service code {}: {}",
                envelope.code,
                envelope.msg.unwrap_or_default()
            )));
        }

        envelope
            .data
            .as_ref()
            .and_then(|data| data.get("content"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                RaggateError::ExternalError(
                    "vision service replied code 0 without data.content".to_string(),
                )
            })
    }
}

fn ocr_extra() -> GenerationParams {
    let mut extra = GenerationParams::new();
    extra.insert("temperature".into(), json!(0.1));
    extra.insert("max_tokens".into(), json!(1024));
    extra
}

fn caption_extra() -> GenerationParams {
    let mut extra = GenerationParams::new();
    extra.insert("temperature".into(), json!(0.9));
    extra.insert("top_p".into(), json!(0.7));
    extra.insert("top_k".into(), json!(50));
    extra.insert("max_tokens".into(), json!(1024));
    extra.insert("repetition_penalty".into(), json!(1.02));
    extra.insert("stop".into(), json!(["</end>"]));
    extra.insert("ignore_eos".into(), json!(false));
    extra.insert("skip_special_tokens".into(), json!(true));
    extra
}

#[async_trait]
impl Vision for HttpVision {
    async fn extract_text(&self, image_b64: &str) -> Result<String> {
        self.ask_vision(image_b64, OCR_PROMPT, ocr_extra()).await
    }

    async fn describe(&self, image_b64: &str) -> Result<String> {
        self.ask_vision(image_b64, CAPTION_PROMPT, caption_extra())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caption_sampling_differs_from_ocr() {
        let ocr = ocr_extra();
        let caption = caption_extra();
        assert_eq!(ocr["temperature"], json!(0.1));
        assert_eq!(caption["temperature"], json!(0.9));
        assert_eq!(caption["stop"], json!(["</end>"]));
        assert!(ocr.get("stop").is_none());
    }

    #[tokio::test]
    async fn invalid_base64_is_rejected_before_any_call() {
        let vision = HttpVision::new(GatewayConfig::default()).unwrap();
        let err = vision.extract_text("not base64!!!").await.unwrap_err();
        assert!(err.is_invalid_input());
    }
}
