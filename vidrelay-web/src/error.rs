//! API error type and its JSON rendering.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use vidrelay_core::StreamError;
use vidrelay_search::MediaSearchError;

/// Errors returned to API clients as `{"error": message}`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Request parameters failed validation.
    #[error("{0}")]
    InvalidParameters(String),

    /// A downstream component failed.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Status code this error is served with.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidParameters(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {self}");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<StreamError> for ApiError {
    fn from(err: StreamError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<MediaSearchError> for ApiError {
    fn from(err: MediaSearchError) -> Self {
        match err {
            MediaSearchError::InvalidQuery => ApiError::InvalidParameters(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}
