//! HTTP error boundary
//!
//! Everything the pipeline can fail with is folded into the OpenAI error
//! envelope here: `{"error": {"message", "type", "code"}}`. Client mistakes
//! (empty message list, unusable content) map to 400 with type
//! `invalid_request_error`; everything else is a 500 `server_error`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use raggate_core::RaggateError;

/// Error type for route handlers.
#[derive(Debug)]
pub struct ApiError(pub RaggateError);

impl From<RaggateError> for ApiError {
    fn from(err: RaggateError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = if self.0.is_invalid_input() {
            (StatusCode::BAD_REQUEST, "invalid_request_error")
        } else {
            tracing::error!(error = %self.0, "request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "server_error")
        };

        let body = Json(json!({
            "error": {
                "message": self.0.to_string(),
                "type": error_type,
                "code": status.as_u16(),
            }
        }));

        (status, body).into_response()
    }
}
