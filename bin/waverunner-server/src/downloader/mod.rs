//! External media downloader.
//!
//! The downloader is used in two modes: a metadata probe that resolves a URL to
//! its stable identifier and title, and a long-running download that writes
//! `<media_dir>/<youtube_id>.wav`. [`Downloader`] is object safe so that
//! [`crate::state::AppState`] can hold a real process-backed implementation or
//! a scripted one in tests.

pub mod youtube_dl;

pub use youtube_dl::YoutubeDl;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use thiserror::Error;

/// Extension of every file in the media directory.
pub const AUDIO_EXTENSION: &str = "wav";

/// Delimiter between identifier and title in probe output.
pub const PROBE_DELIMITER: char = '|';

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("metadata probe timed out after {0:?}")]
    ProbeTimedOut(Duration),

    #[error("metadata probe exited with {status}: {stderr}")]
    ProbeFailed { status: String, stderr: String },

    /// The probe ran but its stdout was not `<id>|<title>`.
    #[error("malformed probe output: {0}")]
    MalformedProbeOutput(String),

    #[error("download exited with {status}: {stderr}")]
    DownloadFailed { status: String, stderr: String },

    #[error("downloader finished but {0} is missing")]
    MissingOutput(PathBuf),

    #[error("downloader I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Metadata resolved by the probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeInfo {
    pub youtube_id: String,
    pub title: String,
}

/// One background download.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub url: String,
    pub youtube_id: String,
    pub media_dir: PathBuf,
}

impl DownloadJob {
    /// Where the finished file is expected.
    pub fn output_path(&self) -> PathBuf {
        wave_path(&self.media_dir, &self.youtube_id)
    }
}

/// Resolves once a started download has exited.
pub type PendingDownload = BoxFuture<'static, Result<(), DownloadError>>;

#[async_trait]
pub trait Downloader: std::fmt::Debug + Send + Sync + 'static {
    /// Resolve `url` to its identifier and title without fetching media.
    async fn probe(&self, url: &str) -> Result<ProbeInfo, DownloadError>;

    /// Spawn the download. Errors here mean the process never started; the
    /// returned future reports how it exited.
    fn start(&self, job: &DownloadJob) -> Result<PendingDownload, DownloadError>;
}

/// Path of the WAV file for `youtube_id` inside `media_dir`.
pub fn wave_path(media_dir: &Path, youtube_id: &str) -> PathBuf {
    media_dir.join(format!("{youtube_id}.{AUDIO_EXTENSION}"))
}

/// Parse `<id>|<title>` from probe stdout.
///
/// Only the first non-blank line is used. The title keeps any further
/// delimiters.
pub fn parse_probe_output(raw: &str) -> Result<ProbeInfo, DownloadError> {
    let line = raw
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| DownloadError::MalformedProbeOutput("empty output".into()))?;

    let (id, title) = line.split_once(PROBE_DELIMITER).ok_or_else(|| {
        DownloadError::MalformedProbeOutput(format!("no '{PROBE_DELIMITER}' in {line:?}"))
    })?;

    let id = id.trim();
    if id.is_empty() {
        return Err(DownloadError::MalformedProbeOutput("empty identifier".into()));
    }
    if !is_safe_file_stem(id) {
        return Err(DownloadError::MalformedProbeOutput(format!(
            "identifier {id:?} is not usable as a file name"
        )));
    }

    Ok(ProbeInfo {
        youtube_id: id.to_owned(),
        title: title.trim().to_owned(),
    })
}

/// The identifier becomes a file name and part of an output template, so
/// path separators, `%` and leading dots are rejected.
fn is_safe_file_stem(id: &str) -> bool {
    !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
