use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{auth::HandoffError, social::SocialError};

/// JSON error body: `{ "error": "<code>" }`.
#[derive(Debug)]
pub struct ErrorResponse {
    status: StatusCode,
    code: String,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, code: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.code }))).into_response()
    }
}

impl From<HandoffError> for ErrorResponse {
    fn from(error: HandoffError) -> Self {
        match error {
            HandoffError::NotFound => ErrorResponse::new(StatusCode::NOT_FOUND, "not_found"),
            HandoffError::Expired => ErrorResponse::new(StatusCode::GONE, "expired"),
        }
    }
}

impl From<SocialError> for ErrorResponse {
    fn from(error: SocialError) -> Self {
        match error {
            SocialError::InvalidArgument(reason) => {
                tracing::debug!(%reason, "rejected user lookup");
                ErrorResponse::new(StatusCode::BAD_REQUEST, "invalid_argument")
            }
            SocialError::NotFound => ErrorResponse::new(StatusCode::NOT_FOUND, "not_found"),
            SocialError::Upstream(status) => {
                tracing::warn!(%status, "upstream error during user lookup");
                ErrorResponse::new(StatusCode::BAD_GATEWAY, "upstream_error")
            }
            SocialError::Timeout => {
                tracing::warn!("upstream timeout during user lookup");
                ErrorResponse::new(StatusCode::GATEWAY_TIMEOUT, "upstream_timeout")
            }
            SocialError::Transport(err) => {
                tracing::warn!(?err, "upstream request failed during user lookup");
                ErrorResponse::new(StatusCode::BAD_GATEWAY, "upstream_error")
            }
        }
    }
}
