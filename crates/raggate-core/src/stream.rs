//! Provider stream translation
//!
//! The provider streams SSE-ish lines: `event:` lines carry a side-channel
//! kind (`close`/`error`/`antispam`) and `data:` lines carry either a JSON
//! record or the literal `[DONE]` sentinel. The translator turns those lines
//! into OpenAI `chat.completion.chunk` frames with one hard guarantee: every
//! outbound stream ends with exactly one `[DONE]` marker, whatever the
//! provider does, and partial content is committed to the session rather
//! than dropped.

use crate::api::ChatCompletionStreamResponse;
use crate::message::Message;
use crate::provider::ByteStream;
use crate::session::SessionStore;
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::OwnedMutexGuard;
use tokio::task::JoinHandle;

pub const DONE_SENTINEL: &str = "[DONE]";

/// Translator lifecycle. Parsing and emitting happen within a single
/// `feed_line` step, so only the resting states are represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslatorState {
    /// Live, waiting for the next provider line
    AwaitingLine,
    /// Cleanly closed by the sentinel or an error-coded record
    Closed,
    /// Terminated by a fault (transport error, idle timeout, early EOF)
    Failed,
}

/// What one provider line translates to
#[derive(Debug, Clone, PartialEq)]
pub enum StreamStep {
    /// Line consumed, nothing to emit
    Skip,
    /// A content delta to forward
    Delta(String),
    /// Stream over: forward the optional trailing delta, then the finish
    /// chunk and the one `[DONE]` marker
    Close { trailing: Option<String> },
}

/// Line-driven translator core. Pure and synchronous; the async relay
/// below owns the byte stream and the timeouts.
#[derive(Debug)]
pub struct StreamTranslator {
    state: TranslatorState,
    accumulated: String,
    side_channel: Option<String>,
}

impl Default for StreamTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamTranslator {
    pub fn new() -> Self {
        Self {
            state: TranslatorState::AwaitingLine,
            accumulated: String::new(),
            side_channel: None,
        }
    }

    pub fn state(&self) -> TranslatorState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state != TranslatorState::AwaitingLine
    }

    /// Content gathered so far, error annotations excluded
    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    pub fn take_accumulated(&mut self) -> String {
        std::mem::take(&mut self.accumulated)
    }

    /// Side-channel kind from the latest `event:` line, if any
    pub fn side_channel(&self) -> Option<&str> {
        self.side_channel.as_deref()
    }

    /// Process one provider line
    pub fn feed_line(&mut self, line: &str) -> StreamStep {
        if self.is_terminated() {
            return StreamStep::Skip;
        }

        if let Some(kind) = line.strip_prefix("event:") {
            let kind = kind.trim();
            tracing::debug!("stream side-channel event: {}", kind);
            self.side_channel = Some(kind.to_string());
            return StreamStep::Skip;
        }

        let Some(payload) = line.strip_prefix("data:") else {
            return StreamStep::Skip;
        };
        let payload = payload.trim();

        if payload == DONE_SENTINEL {
            self.state = TranslatorState::Closed;
            return StreamStep::Close { trailing: None };
        }

        let record: Value = match serde_json::from_str(payload) {
            Ok(record) => record,
            // Glitched lines are dropped; the stream goes on.
            Err(_) => return StreamStep::Skip,
        };

        let text = record
            .get("message")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or_else(|| {
                record
                    .get("intervention")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
            })
            .unwrap_or("");

        let code = record.get("code").and_then(Value::as_i64).unwrap_or(0);
        if code != 0 {
            let msg = record.get("msg").and_then(Value::as_str).unwrap_or("");
            let annotation = if msg.is_empty() {
                format!("[stream error: code {}]", code)
            } else {
                format!("[stream error: code {}: {}]", code, msg)
            };
            self.accumulated.push_str(text);
            self.state = TranslatorState::Closed;
            let trailing = if text.is_empty() {
                annotation
            } else {
                format!("{} {}", text, annotation)
            };
            return StreamStep::Close {
                trailing: Some(trailing),
            };
        }

        if text.is_empty() {
            return StreamStep::Skip;
        }
        self.accumulated.push_str(text);
        StreamStep::Delta(text.to_string())
    }

    /// Register a fault. Returns the bracketed annotation to emit, or
    /// `None` when the stream already terminated (nothing more may be
    /// emitted after the marker).
    pub fn fault(&mut self, detail: &str) -> Option<String> {
        if self.is_terminated() {
            return None;
        }
        self.state = TranslatorState::Failed;
        Some(format!("[stream error: {}]", detail))
    }
}

/// Reassembles lines from arbitrarily-split byte chunks
#[derive(Default)]
struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn next_line(&mut self) -> Option<String> {
        let pos = self.buf.iter().position(|b| *b == b'\n')?;
        let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    fn take_remainder(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buf);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

/// One outbound SSE frame
#[derive(Debug, Clone)]
pub enum OutboundFrame {
    Chunk(ChatCompletionStreamResponse),
    /// Rendered as the literal `data: [DONE]` line
    Done,
}

/// Everything a relay task needs for one streamed turn. The session guard
/// is the per-user turn lock; the relay holds it until the final commit.
pub struct StreamJob {
    pub upstream: ByteStream,
    pub store: Arc<SessionStore>,
    pub guard: OwnedMutexGuard<Vec<Message>>,
    pub response_id: String,
    pub model: String,
    pub idle_timeout: Duration,
}

#[derive(Debug)]
pub struct RelayHandle {
    pub frames: mpsc::Receiver<OutboundFrame>,
    pub task: JoinHandle<()>,
}

/// Spawn the relay task for one streamed turn.
///
/// The returned receiver yields OpenAI chunk frames ending in `Done`. A
/// dropped receiver (client gone) stops emission; accumulated partial
/// content is committed to the session either way.
pub fn spawn_relay(job: StreamJob) -> RelayHandle {
    let (tx, rx) = mpsc::channel(32);
    let task = tokio::spawn(run_relay(job, tx));
    RelayHandle { frames: rx, task }
}

struct FrameSink {
    tx: mpsc::Sender<OutboundFrame>,
    response_id: String,
    model: String,
    connected: bool,
}

impl FrameSink {
    async fn send(&mut self, frame: OutboundFrame) {
        if self.connected && self.tx.send(frame).await.is_err() {
            tracing::debug!("client went away mid-stream");
            self.connected = false;
        }
    }

    async fn delta(&mut self, content: String) {
        let frame = ChatCompletionStreamResponse::delta(&self.response_id, &self.model, content);
        self.send(OutboundFrame::Chunk(frame)).await;
    }

    async fn terminate(&mut self) {
        let frame = ChatCompletionStreamResponse::finish(&self.response_id, &self.model);
        self.send(OutboundFrame::Chunk(frame)).await;
        self.send(OutboundFrame::Done).await;
    }
}

async fn apply_line(translator: &mut StreamTranslator, sink: &mut FrameSink, line: &str) {
    match translator.feed_line(line) {
        StreamStep::Skip => {}
        StreamStep::Delta(text) => sink.delta(text).await,
        StreamStep::Close { trailing } => {
            if let Some(text) = trailing {
                sink.delta(text).await;
            }
            sink.terminate().await;
        }
    }
}

async fn apply_fault(translator: &mut StreamTranslator, sink: &mut FrameSink, detail: &str) {
    tracing::warn!("stream fault: {}", detail);
    if let Some(annotation) = translator.fault(detail) {
        sink.delta(annotation).await;
        sink.terminate().await;
    }
}

async fn run_relay(mut job: StreamJob, tx: mpsc::Sender<OutboundFrame>) {
    let mut translator = StreamTranslator::new();
    let mut lines = LineBuffer::default();
    let mut sink = FrameSink {
        tx,
        response_id: job.response_id.clone(),
        model: job.model.clone(),
        connected: true,
    };

    let preamble = ChatCompletionStreamResponse::role_preamble(&sink.response_id, &sink.model);
    sink.send(OutboundFrame::Chunk(preamble)).await;

    while sink.connected && !translator.is_terminated() {
        match tokio::time::timeout(job.idle_timeout, job.upstream.next()).await {
            Err(_) => {
                apply_fault(&mut translator, &mut sink, "idle timeout waiting for the provider")
                    .await;
            }
            Ok(None) => {
                if let Some(line) = lines.take_remainder() {
                    apply_line(&mut translator, &mut sink, &line).await;
                }
                if !translator.is_terminated() {
                    apply_fault(
                        &mut translator,
                        &mut sink,
                        "provider ended the stream without a done marker",
                    )
                    .await;
                }
            }
            Ok(Some(Err(e))) => {
                apply_fault(&mut translator, &mut sink, &format!("transport error: {}", e)).await;
            }
            Ok(Some(Ok(bytes))) => {
                lines.extend(&bytes);
                while let Some(line) = lines.next_line() {
                    apply_line(&mut translator, &mut sink, &line).await;
                    if translator.is_terminated() {
                        break;
                    }
                }
            }
        }
    }

    let content = translator.take_accumulated();
    if !content.is_empty() {
        job.store.append(&mut job.guard, Message::assistant(content));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::stream;

    #[test]
    fn done_sentinel_closes_once() {
        let mut translator = StreamTranslator::new();
        assert_eq!(
            translator.feed_line("data: [DONE]"),
            StreamStep::Close { trailing: None }
        );
        assert_eq!(translator.state(), TranslatorState::Closed);
        assert_eq!(translator.feed_line("data: [DONE]"), StreamStep::Skip);
        assert_eq!(translator.feed_line("data: {\"message\":\"x\"}"), StreamStep::Skip);
    }

    #[test]
    fn message_deltas_accumulate() {
        let mut translator = StreamTranslator::new();
        assert_eq!(
            translator.feed_line(r#"data: {"message":"Hello"}"#),
            StreamStep::Delta("Hello".into())
        );
        assert_eq!(
            translator.feed_line(r#"data: {"message":" world"}"#),
            StreamStep::Delta(" world".into())
        );
        assert_eq!(translator.accumulated(), "Hello world");
    }

    #[test]
    fn intervention_backs_up_an_empty_message() {
        let mut translator = StreamTranslator::new();
        assert_eq!(
            translator.feed_line(r#"data: {"message":"","intervention":"moderated"}"#),
            StreamStep::Delta("moderated".into())
        );
        assert_eq!(
            translator.feed_line(r#"data: {"intervention":"again"}"#),
            StreamStep::Delta("again".into())
        );
    }

    #[test]
    fn parse_glitches_are_skipped_not_fatal() {
        let mut translator = StreamTranslator::new();
        assert_eq!(translator.feed_line("data: {broken"), StreamStep::Skip);
        assert_eq!(translator.state(), TranslatorState::AwaitingLine);
        assert_eq!(
            translator.feed_line(r#"data: {"message":"ok"}"#),
            StreamStep::Delta("ok".into())
        );
    }

    #[test]
    fn event_lines_set_the_side_channel_silently() {
        let mut translator = StreamTranslator::new();
        assert_eq!(translator.feed_line("event: antispam"), StreamStep::Skip);
        assert_eq!(translator.side_channel(), Some("antispam"));
        assert_eq!(translator.feed_line(""), StreamStep::Skip);
        assert_eq!(translator.feed_line(": comment"), StreamStep::Skip);
    }

    #[test]
    fn coded_record_closes_with_annotation() {
        let mut translator = StreamTranslator::new();
        translator.feed_line(r#"data: {"message":"part"}"#);

        let step = translator.feed_line(r#"data: {"message":"ial","code":2001,"msg":"quota"}"#);
        assert_eq!(
            step,
            StreamStep::Close {
                trailing: Some("ial [stream error: code 2001: quota]".into())
            }
        );
        assert_eq!(translator.accumulated(), "partial");
        assert_eq!(translator.state(), TranslatorState::Closed);
    }

    #[test]
    fn coded_record_without_text_emits_annotation_alone() {
        let mut translator = StreamTranslator::new();
        let step = translator.feed_line(r#"data: {"code":1007}"#);
        assert_eq!(
            step,
            StreamStep::Close {
                trailing: Some("[stream error: code 1007]".into())
            }
        );
        assert_eq!(translator.accumulated(), "");
    }

    #[test]
    fn fault_annotates_exactly_once() {
        let mut translator = StreamTranslator::new();
        let first = translator.fault("idle timeout");
        assert_eq!(first.as_deref(), Some("[stream error: idle timeout]"));
        assert_eq!(translator.state(), TranslatorState::Failed);
        assert!(translator.fault("again").is_none());

        let mut closed = StreamTranslator::new();
        closed.feed_line("data: [DONE]");
        assert!(closed.fault("late").is_none());
    }

    #[test]
    fn line_buffer_reassembles_split_chunks() {
        let mut lines = LineBuffer::default();
        lines.extend(b"data: {\"mess");
        assert!(lines.next_line().is_none());
        lines.extend(b"age\":\"hi\"}\r\ndata: [DO");
        assert_eq!(lines.next_line().as_deref(), Some("data: {\"message\":\"hi\"}"));
        assert!(lines.next_line().is_none());
        lines.extend(b"NE]");
        assert_eq!(lines.take_remainder().as_deref(), Some("data: [DONE]"));
        assert!(lines.take_remainder().is_none());
    }

    fn upstream(parts: Vec<&'static str>) -> ByteStream {
        stream::iter(parts.into_iter().map(|p| Ok(Bytes::from(p)))).boxed()
    }

    async fn collect(mut handle: RelayHandle) -> Vec<OutboundFrame> {
        let mut frames = Vec::new();
        while let Some(frame) = handle.frames.recv().await {
            frames.push(frame);
        }
        handle.task.await.unwrap();
        frames
    }

    fn done_count(frames: &[OutboundFrame]) -> usize {
        frames
            .iter()
            .filter(|f| matches!(f, OutboundFrame::Done))
            .count()
    }

    fn delta_text(frames: &[OutboundFrame]) -> String {
        frames
            .iter()
            .filter_map(|f| match f {
                OutboundFrame::Chunk(chunk) => {
                    chunk.choices.first().and_then(|c| c.delta.content.clone())
                }
                OutboundFrame::Done => None,
            })
            .collect()
    }

    fn job(upstream: ByteStream, store: &Arc<SessionStore>, guard: OwnedMutexGuard<Vec<Message>>) -> StreamJob {
        StreamJob {
            upstream,
            store: Arc::clone(store),
            guard,
            response_id: "chatcmpl-test".into(),
            model: "raggate-chat".into(),
            idle_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn clean_stream_relays_and_commits() {
        let store = Arc::new(SessionStore::new(10));
        let guard = store.guard("u").await;
        let upstream = upstream(vec![
            "data: {\"message\":\"Hel",
            "lo\"}\ndata: {\"message\":\" there\"}\n",
            "data: [DONE]\n",
        ]);

        let frames = collect(spawn_relay(job(upstream, &store, guard))).await;

        assert_eq!(done_count(&frames), 1);
        assert!(matches!(frames.last(), Some(OutboundFrame::Done)));
        assert_eq!(delta_text(&frames), "Hello there");

        let guard = store.guard("u").await;
        assert_eq!(guard.len(), 1);
        assert_eq!(guard[0].content, "Hello there");
    }

    #[tokio::test]
    async fn zero_content_stream_still_sends_one_done() {
        let store = Arc::new(SessionStore::new(10));
        let guard = store.guard("u").await;
        let frames = collect(spawn_relay(job(
            upstream(vec!["data: [DONE]\n"]),
            &store,
            guard,
        )))
        .await;

        assert_eq!(done_count(&frames), 1);
        assert!(store.guard("u").await.is_empty());
    }

    #[tokio::test]
    async fn early_eof_annotates_and_commits_partial() {
        let store = Arc::new(SessionStore::new(10));
        let guard = store.guard("u").await;
        let frames = collect(spawn_relay(job(
            upstream(vec!["data: {\"message\":\"half an answ\"}\n"]),
            &store,
            guard,
        )))
        .await;

        assert_eq!(done_count(&frames), 1);
        assert!(delta_text(&frames).contains("[stream error:"));

        let guard = store.guard("u").await;
        assert_eq!(guard[0].content, "half an answ");
        assert!(!guard[0].content.contains("[stream error:"));
    }

    #[tokio::test]
    async fn transport_error_terminates_with_one_done() {
        let store = Arc::new(SessionStore::new(10));
        let guard = store.guard("u").await;
        let upstream = stream::iter(vec![
            Ok(Bytes::from("data: {\"message\":\"a\"}\n")),
            Err(crate::error::RaggateError::ExternalError("reset".into())),
        ])
        .boxed();

        let frames = collect(spawn_relay(job(upstream, &store, guard))).await;
        assert_eq!(done_count(&frames), 1);
        assert_eq!(store.guard("u").await[0].content, "a");
    }

    #[tokio::test(start_paused = true)]
    async fn idle_provider_times_out() {
        let store = Arc::new(SessionStore::new(10));
        let guard = store.guard("u").await;
        let frames = collect(spawn_relay(StreamJob {
            upstream: stream::pending().boxed(),
            store: Arc::clone(&store),
            guard,
            response_id: "chatcmpl-test".into(),
            model: "raggate-chat".into(),
            idle_timeout: Duration::from_secs(1),
        }))
        .await;

        assert_eq!(done_count(&frames), 1);
        assert!(delta_text(&frames).contains("idle timeout"));
    }

    #[tokio::test]
    async fn dropped_client_still_commits_partial() {
        let store = Arc::new(SessionStore::new(10));
        let guard = store.guard("u").await;
        let mut handle = spawn_relay(job(
            upstream(vec!["data: {\"message\":\"kept\"}\ndata: [DONE]\n"]),
            &store,
            guard,
        ));

        // Take the preamble and the content delta, then hang up.
        assert!(handle.frames.recv().await.is_some());
        assert!(handle.frames.recv().await.is_some());
        drop(handle.frames);
        handle.task.await.unwrap();

        let guard = store.guard("u").await;
        assert_eq!(guard.len(), 1);
        assert_eq!(guard[0].content, "kept");
    }
}
