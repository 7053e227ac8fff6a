//! Chat completions endpoint
//!
//! Non-streaming turns come back as one JSON envelope. Streaming turns are
//! relayed as `text/event-stream`: every frame from the pipeline becomes a
//! `data:` event carrying a chunk object, and the final `Done` frame becomes
//! the literal `data: [DONE]` line OpenAI clients stop on.

use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use tokio_stream::{wrappers::ReceiverStream, StreamExt};

use raggate_core::{
    ChatCompletionRequest, OutboundFrame, RelayHandle, TurnOutput, DONE_SENTINEL,
};

use crate::error::ApiError;
use crate::state::AppState;

/// POST /v1/chat/completions
pub async fn chat_completions(
    State(state): State<AppState>,
    Json(request): Json<ChatCompletionRequest>,
) -> Result<Response, ApiError> {
    match state.orchestrator.handle(request).await? {
        TurnOutput::Full(response) => Ok(Json(response).into_response()),
        TurnOutput::Stream(handle) => Ok(sse_response(handle)),
    }
}

fn sse_response(handle: RelayHandle) -> Response {
    // Dropping the join handle detaches the relay task; it finishes on its
    // own and commits partial content even if the client disconnects.
    let RelayHandle { frames, .. } = handle;

    let stream = ReceiverStream::new(frames).map(|frame| match frame {
        OutboundFrame::Chunk(chunk) => Event::default().json_data(&chunk),
        OutboundFrame::Done => Ok(Event::default().data(DONE_SENTINEL)),
    });

    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}
