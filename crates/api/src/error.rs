//! Error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ledgerline_core::LedgerError;
use ledgerline_shared::AppError;
use serde_json::json;
use tracing::error;

/// Error returned by handlers.
///
/// Renders as `{"error": CODE, "message": ...}` with the status code the
/// underlying error maps to.
#[derive(Debug)]
pub enum ApiError {
    /// A ledger operation was refused.
    Ledger(LedgerError),
    /// A request-level failure (auth, validation of query parameters).
    App(AppError),
}

impl ApiError {
    /// Shortcut for a 400 with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::App(AppError::Validation(message.into()))
    }

    /// Shortcut for a 403 with the given message.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::App(AppError::Forbidden(message.into()))
    }

    fn parts(&self) -> (u16, &'static str, String) {
        match self {
            Self::Ledger(err) => (err.http_status_code(), err.error_code(), err.to_string()),
            Self::App(err) => (err.status_code(), err.error_code(), err.to_string()),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self::Ledger(err)
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self::App(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %message, code, "Request failed");
        }
        (status, Json(json!({ "error": code, "message": message }))).into_response()
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
