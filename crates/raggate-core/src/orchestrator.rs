//! Chat turn orchestration
//!
//! One request runs through a fixed sequence of phases: normalize the
//! inbound message, fold image content into text, augment the question with
//! retrieved knowledge, ask the model whether a web search is needed, run
//! and condense the search, then produce the final answer either as a full
//! response or as a relayed stream. Each phase's output is a plain value
//! handed to the next, and both response branches share the same history
//! bookkeeping through a per-user session guard held for the whole turn.

use crate::api::{ChatCompletionRequest, ChatCompletionResponse, UsageInfo};
use crate::config::ChatConfig;
use crate::error::{RaggateError, Result};
use crate::knowledge::{CosineRetriever, KnowledgeStore};
use crate::message::{normalize_content, Message, Segment};
use crate::prompts::{APOLOGY_TURN, FINAL_ANSWER_SYSTEM_PROMPT, TOOL_DECISION_SYSTEM_PROMPT};
use crate::provider::{ChatModel, Embedder, GenerationParams, SearchParams, Vision, WebSearch};
use crate::rag::RagContextBuilder;
use crate::session::SessionStore;
use crate::stream::{spawn_relay, RelayHandle, StreamJob};
use crate::summarize::ResultSummarizer;
use crate::toolcall::{detect_tool_call, ToolCall, ToolCallOutcome, DEFAULT_TOOL_NAME};
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Session key used when the request names no user
pub const DEFAULT_USER_KEY: &str = "default_user";

/// What handling one request produced
#[derive(Debug)]
pub enum TurnOutput {
    /// Non-streaming: a complete one-choice response
    Full(ChatCompletionResponse),
    /// Streaming: a running relay; the caller forwards its frames
    Stream(RelayHandle),
}

/// Normalized request, ready for the pipeline
struct TurnInput {
    user_key: String,
    model: String,
    params: GenerationParams,
    segments: Vec<Segment>,
    stream: bool,
    rag_top_k: usize,
}

/// Tool loop result: the raw decision reply plus the condensed function
/// content, present only when the decision asked for a tool
struct ToolExchange {
    decision_reply: String,
    function_content: String,
}

pub struct Orchestrator {
    chat: Arc<dyn ChatModel>,
    vision: Arc<dyn Vision>,
    search: Arc<dyn WebSearch>,
    rag: RagContextBuilder,
    summarizer: ResultSummarizer,
    sessions: Arc<SessionStore>,
    knowledge: Arc<KnowledgeStore>,
    config: ChatConfig,
}

impl Orchestrator {
    pub fn new(
        chat: Arc<dyn ChatModel>,
        embedder: Arc<dyn Embedder>,
        vision: Arc<dyn Vision>,
        search: Arc<dyn WebSearch>,
        knowledge: Arc<KnowledgeStore>,
        sessions: Arc<SessionStore>,
        config: ChatConfig,
    ) -> Self {
        let retriever = Arc::new(CosineRetriever::new(Arc::clone(&knowledge)));
        let rag = RagContextBuilder::new(embedder, retriever);
        let summarizer = ResultSummarizer::new(Arc::clone(&chat), config.summary_threshold);

        Self {
            chat,
            vision,
            search,
            rag,
            summarizer,
            sessions,
            knowledge,
            config,
        }
    }

    /// Run one chat turn end to end
    pub async fn handle(&self, request: ChatCompletionRequest) -> Result<TurnOutput> {
        let input = self.normalize(&request)?;
        let question = self.merge_vision(&input.segments).await?;
        let augmented = self.rag.augment(&question, input.rag_top_k).await;

        // Per-user turn lock: held across both model calls and the final
        // history commit, so same-user turns cannot interleave.
        let mut guard = self.sessions.guard(&input.user_key).await;

        let decision_messages = [
            Message::system(TOOL_DECISION_SYSTEM_PROMPT),
            Message::user(augmented.clone()),
        ];
        let decision = self
            .chat
            .ask(&decision_messages, &input.model, &input.params)
            .await?;
        tracing::debug!(elapsed_ms = decision.elapsed.as_millis() as u64, "tool decision done");

        self.sessions
            .append_unless_tail_duplicate(&mut guard, Message::user(question.clone()));
        let prior = {
            let recent = self.sessions.recent(&guard);
            recent[..recent.len().saturating_sub(1)].to_vec()
        };

        let exchange = match detect_tool_call(&decision.content) {
            ToolCallOutcome::Absent => None,
            ToolCallOutcome::Call(call) => {
                let (query, result) = self.run_tool(call, &input.user_key).await;
                Some(self.condense(&query, &input, decision.content.clone(), result).await)
            }
            ToolCallOutcome::Malformed { detail } => {
                tracing::warn!("malformed tool block: {}", detail);
                let result = json!({ "error": "invalid function call JSON format" });
                Some(self.condense("", &input, decision.content.clone(), result).await)
            }
        };

        if input.stream {
            return Ok(self.stream_answer(&input, guard, &prior, &question, exchange).await);
        }

        let reply = match &exchange {
            None => decision.content.clone(),
            Some(exchange) => {
                let messages = final_messages(&prior, &question, Some(exchange));
                match self.chat.ask(&messages, &input.model, &input.params).await {
                    Ok(outcome) => outcome.content,
                    Err(e) => {
                        tracing::error!("final-answer call failed: {}", e);
                        self.sessions.append(&mut guard, Message::assistant(APOLOGY_TURN));
                        return Err(e);
                    }
                }
            }
        };
        self.sessions.append(&mut guard, Message::assistant(reply.clone()));

        let prompt_chars =
            TOOL_DECISION_SYSTEM_PROMPT.chars().count() + augmented.chars().count();
        let usage = UsageInfo::new(prompt_chars / 4, reply.chars().count() / 4);

        Ok(TurnOutput::Full(ChatCompletionResponse::single(
            response_id(),
            input.model,
            reply,
            usage,
        )))
    }

    /// Normalizing phase: fold every inbound message into question segments
    /// (user text and images kept, other roles coerced to text, order
    /// preserved) and fill the generation parameter map
    fn normalize(&self, request: &ChatCompletionRequest) -> Result<TurnInput> {
        if request.messages.is_empty() {
            return Err(RaggateError::InvalidInput(
                "messages must not be empty".to_string(),
            ));
        }
        let mut segments = Vec::new();
        for message in &request.messages {
            segments.extend(normalize_content(message.role, &message.content));
        }
        if segments.is_empty() {
            return Err(RaggateError::InvalidInput(
                "message content is empty".to_string(),
            ));
        }

        let mut params = request.extra.clone().unwrap_or_default();
        if !params.contains_key("temperature") {
            params.insert(
                "temperature".to_string(),
                json!(request.temperature.unwrap_or(self.config.temperature)),
            );
        }
        if !params.contains_key("max_tokens") {
            params.insert(
                "max_tokens".to_string(),
                json!(request.max_tokens.unwrap_or(self.config.max_tokens)),
            );
        }
        if !params.contains_key("top_p") {
            params.insert(
                "top_p".to_string(),
                json!(request.top_p.unwrap_or(self.config.top_p)),
            );
        }

        let rag_top_k = if request.enable_rag && !self.knowledge.is_empty() {
            request
                .rag_top_k
                .filter(|k| *k > 0)
                .unwrap_or(self.config.rag_top_k)
        } else {
            0
        };

        Ok(TurnInput {
            user_key: request
                .user
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_KEY.to_string()),
            model: request.model.clone(),
            params,
            segments,
            stream: request.stream,
            rag_top_k,
        })
    }

    /// VisionMerge phase: OCR then caption for each image, labeled blocks
    /// first, text parts after. Individual vision failures are skipped.
    async fn merge_vision(&self, segments: &[Segment]) -> Result<String> {
        let mut blocks = Vec::new();
        for segment in segments {
            let Segment::Image(payload) = segment else {
                continue;
            };
            match self.vision.extract_text(payload).await {
                Ok(text) if !text.trim().is_empty() => {
                    blocks.push(format!("[image text]: {}", text.trim()));
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("image text extraction failed: {}", e),
            }
            match self.vision.describe(payload).await {
                Ok(caption) if !caption.trim().is_empty() => {
                    blocks.push(format!("[image description]: {}", caption.trim()));
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("image captioning failed: {}", e),
            }
        }
        for segment in segments {
            if let Segment::Text(text) = segment {
                let text = text.trim();
                if !text.is_empty() {
                    blocks.push(text.to_string());
                }
            }
        }

        let merged = blocks.join("\n");
        if merged.trim().is_empty() {
            return Err(RaggateError::InvalidInput(
                "no usable content after image processing".to_string(),
            ));
        }
        Ok(merged)
    }

    /// ToolExecution phase: run the search (or synthesize an error payload)
    /// and unwrap the provider's `search_result` envelope when present.
    /// Returns the executed query with the result; the summarizer quotes it.
    async fn run_tool(&self, call: ToolCall, user_key: &str) -> (String, Value) {
        let params = SearchParams::from_tool_parameters(&call.parameters, user_key);
        if call.name != DEFAULT_TOOL_NAME {
            tracing::warn!("model asked for unknown tool '{}'", call.name);
            let result = json!({ "error": format!("unknown function: {}", call.name) });
            return (params.search_query, result);
        }

        tracing::debug!(query = %params.search_query, "running web search");
        let result = self.search.search(&params).await;
        let result = match result.get("search_result") {
            Some(inner) => inner.clone(),
            None => result,
        };
        (params.search_query, result)
    }

    async fn condense(
        &self,
        query: &str,
        input: &TurnInput,
        decision_reply: String,
        result: Value,
    ) -> ToolExchange {
        let function_content = self
            .summarizer
            .condense(query, &result, &input.model, &input.params)
            .await;
        ToolExchange {
            decision_reply,
            function_content,
        }
    }

    /// Streaming branch: start the provider stream and hand it (with the
    /// session guard) to the relay. A refused start is turned into an
    /// immediately-failing stream so the client still gets one error chunk
    /// and one `[DONE]`.
    async fn stream_answer(
        &self,
        input: &TurnInput,
        guard: tokio::sync::OwnedMutexGuard<Vec<Message>>,
        prior: &[Message],
        question: &str,
        exchange: Option<ToolExchange>,
    ) -> TurnOutput {
        let messages = final_messages(prior, question, exchange.as_ref());
        let upstream = match self.chat.ask_stream(&messages, &input.model, &input.params).await {
            Ok(upstream) => upstream,
            Err(e) => {
                tracing::error!("stream start refused: {}", e);
                let failed: crate::provider::ByteStream =
                    futures::stream::once(async move { Err(e) }).boxed();
                failed
            }
        };

        TurnOutput::Stream(spawn_relay(StreamJob {
            upstream,
            store: Arc::clone(&self.sessions),
            guard,
            response_id: response_id(),
            model: input.model.clone(),
            idle_timeout: Duration::from_secs(self.config.stream_idle_timeout_secs),
        }))
    }
}

fn response_id() -> String {
    format!("chatcmpl-{}", Uuid::new_v4())
}

/// FinalAnswer message assembly, shared by both response branches. The user
/// turn is the plain question; retrieved context reaches only the decision
/// call.
fn final_messages(
    prior: &[Message],
    question: &str,
    exchange: Option<&ToolExchange>,
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(prior.len() + 4);
    messages.push(Message::system(FINAL_ANSWER_SYSTEM_PROMPT));
    messages.extend_from_slice(prior);
    messages.push(Message::user(question));
    if let Some(exchange) = exchange {
        messages.push(Message::assistant(exchange.decision_reply.clone()));
        messages.push(Message::function(
            DEFAULT_TOOL_NAME,
            exchange.function_content.clone(),
        ));
    }
    messages
}
