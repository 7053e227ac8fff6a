//! Canonical chat messages and inbound content normalization
//!
//! OpenAI clients send `content` either as a plain string or as a list of
//! typed parts (text / image_url with a data-URI payload). Both shapes are
//! converted into [`Segment`]s here, at the request boundary, so the rest of
//! the pipeline only ever sees canonical text messages.

use serde::{Deserialize, Serialize};

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Function,
}

/// Canonical text-only chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            name: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            name: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            name: None,
        }
    }

    pub fn function(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Function,
            content: content.into(),
            name: Some(name.into()),
        }
    }
}

/// Inbound message content: a plain string or a list of typed parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// One typed part of a multimodal message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

/// Image reference; only data-URI base64 payloads are supported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Canonical content segment produced by normalization
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    /// Bare base64 payload with the data-URI prefix stripped
    Image(String),
}

impl Segment {
    pub fn is_image(&self) -> bool {
        matches!(self, Segment::Image(_))
    }
}

const BASE64_MARKER: &str = "base64,";

/// Extract the bare base64 payload from a data URI, if it carries one
fn data_uri_payload(url: &str) -> Option<&str> {
    url.find(BASE64_MARKER)
        .map(|idx| &url[idx + BASE64_MARKER.len()..])
}

/// Convert one inbound message's content into canonical segments.
///
/// User messages may carry images; every other role is coerced to text.
/// Part lists from non-user roles are flattened to their JSON rendering, a
/// shape no well-formed client sends.
pub fn normalize_content(role: Role, content: &MessageContent) -> Vec<Segment> {
    match (role, content) {
        (Role::User, MessageContent::Parts(parts)) => {
            let mut segments = Vec::new();
            for part in parts {
                match part {
                    ContentPart::Text { text } => {
                        if !text.is_empty() {
                            segments.push(Segment::Text(text.clone()));
                        }
                    }
                    ContentPart::ImageUrl { image_url } => {
                        if let Some(payload) = data_uri_payload(&image_url.url) {
                            segments.push(Segment::Image(payload.to_string()));
                        }
                    }
                }
            }
            segments
        }
        (Role::User, MessageContent::Text(text)) => {
            if text.starts_with("data:image") {
                if let Some(payload) = data_uri_payload(text) {
                    return vec![Segment::Image(payload.to_string())];
                }
            }
            vec![Segment::Text(text.clone())]
        }
        (_, MessageContent::Text(text)) => vec![Segment::Text(text.clone())],
        (_, MessageContent::Parts(parts)) => {
            let flattened = serde_json::to_string(parts).unwrap_or_default();
            vec![Segment::Text(flattened)]
        }
    }
}
