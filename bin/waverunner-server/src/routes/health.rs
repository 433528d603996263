//! Liveness endpoint.
//!
//! The service is only useful while finished WAVs can be written and read,
//! so the check includes the media directory.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::warn;
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health))]
pub struct HealthApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

/// `{"status", "version", "media_dir"}`; 503 with `"degraded"` when the
/// media directory is gone or not a directory.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Media directory reachable", body = Value),
        (status = 503, description = "Media directory missing", body = Value),
    )
)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let media_dir = &state.config.media_dir;
    let media_ok = match tokio::fs::metadata(media_dir).await {
        Ok(meta) => meta.is_dir(),
        Err(e) => {
            warn!(media_dir = %media_dir.display(), error = %e, "media directory unreachable");
            false
        }
    };

    let (code, status) = if media_ok {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };
    (
        code,
        Json(json!({
            "status": status,
            "version": env!("CARGO_PKG_VERSION"),
            "media_dir": media_ok,
        })),
    )
}
