//! Server configuration, loaded from environment variables at startup.

use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for waverunner-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// SQLite database URL (default: `"sqlite://waverunner.db"`).
    /// The file is created on first start.
    pub database_url: String,

    /// Directory holding the downloaded `<youtube_id>.wav` files.
    pub media_dir: PathBuf,

    /// Executable used for probing and downloading; any youtube-dl compatible
    /// CLI (e.g. `yt-dlp`) works.
    pub downloader_bin: String,

    /// Upper bound for the metadata probe. `None` waits indefinitely.
    pub probe_timeout: Option<Duration>,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// When set, logs are written to a daily-rolling file in this directory
    /// instead of stdout.
    pub log_dir: Option<PathBuf>,

    /// Comma-separated list of allowed CORS origins. `None` allows any origin.
    pub cors_allowed_origins: Option<String>,

    /// Serve Swagger UI at `/swagger-ui`.
    pub enable_swagger: bool,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let probe_timeout_secs: u64 = parse_env("WAVERUNNER_PROBE_TIMEOUT_SECS", 60);
        Self {
            bind_address: env_or("WAVERUNNER_BIND", "0.0.0.0:3000"),
            database_url: env_or("WAVERUNNER_DATABASE_URL", "sqlite://waverunner.db"),
            media_dir: PathBuf::from(env_or("WAVERUNNER_MEDIA_DIR", "./wavs")),
            downloader_bin: env_or("WAVERUNNER_DOWNLOADER", "youtube-dl"),
            probe_timeout: (probe_timeout_secs > 0).then(|| Duration::from_secs(probe_timeout_secs)),
            log_level: env_or("WAVERUNNER_LOG", "info"),
            log_json: parse_bool_env("WAVERUNNER_LOG_JSON", false),
            log_dir: std::env::var("WAVERUNNER_LOG_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            cors_allowed_origins: std::env::var("WAVERUNNER_CORS_ORIGINS")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            enable_swagger: parse_bool_env("WAVERUNNER_ENABLE_SWAGGER", true),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_bool_env(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|v| parse_bool(&v))
        .unwrap_or(default)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
