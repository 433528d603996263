//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors are automatically converted
//! to a JSON-body HTTP response with an appropriate status code.
//!
//! Downloader and internal failures are logged with full detail while the
//! caller only sees a generic message.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::downloader::DownloadError;

/// Message returned for every failed ingest, whatever the cause.
pub const DOWNLOAD_FAILED: &str = "Failed to download WAV!";

/// All errors that can occur in the waverunner-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The external downloader could not probe or start a download.
    #[error("downloader error: {0}")]
    Download(#[from] DownloadError),

    /// The caller referenced a resource that does not exist, or used the
    /// wrong method on a known route.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The record exists but its download has not finished.
    #[error("not ready: {0}")]
    NotReady(String),

    /// An unclassified internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match &self {
            // Client-facing errors: expose the message directly.
            ServerError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ServerError::NotReady(m) => (StatusCode::CONFLICT, m.clone()),

            ServerError::Download(e) => {
                error!(error = %e, "downloader error");
                (StatusCode::BAD_REQUEST, DOWNLOAD_FAILED.to_owned())
            }
            ServerError::Internal(m) => {
                error!(message = %m, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}

impl From<std::io::Error> for ServerError {
    fn from(e: std::io::Error) -> Self {
        ServerError::Internal(e.to_string())
    }
}
