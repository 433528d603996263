//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::config::Config;
use crate::downloader::Downloader;
use crate::entities::SqliteStore;

/// State shared across all HTTP handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Download record store.
    pub store: Arc<SqliteStore>,
    /// External tool used for probing and downloading.
    pub downloader: Arc<dyn Downloader>,
}
