//! API error type: maps engine error kinds to HTTP status codes.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use taskiq_core::domain::{DependencyError, ErrorKind, StoreError};

#[derive(Debug)]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
}

/// Error response JSON structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// 壊れた依存リクエスト（extractor が decode できなかったもの）
    pub fn invalid_edge(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidEdge, message)
    }

    /// 壊れたタスクリクエスト
    pub fn invalid_task(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidTask, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        status_for(self.kind)
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict | ErrorKind::CycleDetected => StatusCode::CONFLICT,
        ErrorKind::InvalidEdge | ErrorKind::InvalidTask => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<DependencyError> for ApiError {
    fn from(err: DependencyError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.message, "request failed");
        }
        let body = Json(ErrorResponse {
            error: self.kind.as_str().to_string(),
            message: self.message,
        });
        (status, body).into_response()
    }
}
