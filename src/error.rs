use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// AppError
///
/// Request-level failures. Upstream failures (session oracle, content service)
/// are fatal to the current page: no partially processed tree is ever returned.
#[derive(Debug, Error)]
pub enum AppError {
    /// The session oracle could not answer. Never downgraded to "anonymous".
    #[error("session lookup failed: {0}")]
    SessionLookup(String),

    /// The content-delivery API failed or returned something unreadable.
    #[error("content service request failed: {0}")]
    ContentFetch(String),

    #[error("no content for route {0}")]
    NotFound(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("preview token could not be issued: {0}")]
    PreviewToken(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::SessionLookup(_) | AppError::ContentFetch(_) => StatusCode::BAD_GATEWAY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PreviewToken(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
