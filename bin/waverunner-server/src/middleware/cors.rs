use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::Config;

/// Methods advertised to browsers; the UI has always been sent this list.
const ALLOWED_METHODS: [Method; 5] = [
    Method::POST,
    Method::GET,
    Method::OPTIONS,
    Method::PUT,
    Method::DELETE,
];

pub fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = match config.cors_allowed_origins.as_deref() {
        Some(list) => list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse().ok())
            .collect(),
        None => Vec::new(),
    };

    // Wildcard unless WAVERUNNER_CORS_ORIGINS names at least one valid origin.
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_headers(Any)
        .allow_methods(ALLOWED_METHODS)
}
