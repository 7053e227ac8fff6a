//! Upstream provider clients
//!
//! The pipeline talks to four collaborators: a chat model, an embedding
//! service, a web-search service and a multimodal vision service. Each is a
//! trait here so tests can substitute mocks; the `Http*` implementations
//! speak the gateway's `{code, data, msg}` envelope protocol.

pub mod http_chat;
pub mod http_embedder;
pub mod http_search;
pub mod http_vision;
pub mod traits;

pub use http_chat::HttpChatModel;
pub use http_embedder::HttpEmbedder;
pub use http_search::HttpWebSearch;
pub use http_vision::HttpVision;
pub use traits::{ByteStream, ChatModel, ChatOutcome, Embedder, GenerationParams, SearchParams, Vision, WebSearch};
