//! Application error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Application-wide error type
///
/// Adapter internals classify upstream failures into these kinds; raw
/// transport errors never cross the adapter boundary.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// Timeout, 5xx, rate limited. The caller may retry on a later pass.
    #[error("Transient upstream error: {0}")]
    Transient(String),

    /// Auth failure or bad request upstream. Retrying will not help.
    #[error("Permanent upstream error: {0}")]
    Permanent(String),

    /// Upstream returned success but the payload is missing required fields.
    #[error("Unexpected upstream shape: {0}")]
    Schema(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Error response body returned to HTTP clients
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            return AppError::Transient(err.to_string());
        }
        if let Some(status) = err.status() {
            return classify_status(status.as_u16(), err.to_string());
        }
        if err.is_decode() {
            return AppError::Schema(err.to_string());
        }
        AppError::Transient(err.to_string())
    }
}

/// Map an upstream HTTP status to an error kind
pub fn classify_status(status: u16, message: String) -> AppError {
    match status {
        404 => AppError::NotFound(message),
        401 | 403 => AppError::Permanent(message),
        429 => AppError::Transient(message),
        s if s >= 500 => AppError::Transient(message),
        _ => AppError::Permanent(message),
    }
}

impl AppError {
    /// HTTP status this error maps to at the service boundary
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            AppError::Transient(_)
            | AppError::Permanent(_)
            | AppError::Schema(_)
            | AppError::Io(_)
            | AppError::Serialization(_)
            | AppError::Csv(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
