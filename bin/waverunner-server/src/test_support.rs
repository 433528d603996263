//! Helpers shared by the unit tests: a throwaway SQLite store, a scripted
//! [`Downloader`] and a fully wired router.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, header};
use axum::response::Response;
use tempfile::TempDir;
use tokio::sync::Notify;
use tower::ServiceExt;

use crate::config::Config;
use crate::downloader::{
    DownloadError, DownloadJob, Downloader, PendingDownload, ProbeInfo, parse_probe_output,
};
use crate::entities::{SqliteStore, WaveRecord, WaveStatus, WaveStore};
use crate::routes;
use crate::state::AppState;

/// Fresh migrated database in its own temp directory. Keep the directory
/// alive for as long as the store is used.
pub async fn temp_store() -> (TempDir, SqliteStore) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("waverunner.db").display());
    let store = SqliteStore::connect(&url).await.unwrap();
    (dir, store)
}

/// What the fake probe prints.
#[derive(Debug, Clone, Default)]
pub enum ProbeScript {
    /// `<last url segment>|Title of <last url segment>`.
    #[default]
    Echo,
    /// Fed verbatim to the probe parser.
    Raw(String),
    /// The tool exits non-zero.
    Fail,
}

/// What the fake download does once started.
#[derive(Debug, Clone)]
pub enum StartScript {
    /// Write these bytes to the expected output path and exit cleanly.
    WriteFile(Vec<u8>),
    /// Exit cleanly without producing a file.
    NoFile,
    /// Exit non-zero.
    ExitWithError,
    /// The process never starts.
    FailToStart,
}

impl Default for StartScript {
    fn default() -> Self {
        StartScript::WriteFile(b"RIFF\0\0\0\0WAVE".to_vec())
    }
}

#[derive(Debug, Default)]
pub struct FakeDownloader {
    probe: ProbeScript,
    start: StartScript,
    gate: Option<Arc<Notify>>,
    pub probes: AtomicUsize,
    pub starts: AtomicUsize,
}

impl FakeDownloader {
    pub fn probing(probe: ProbeScript) -> Self {
        Self {
            probe,
            ..Self::default()
        }
    }

    pub fn starting(start: StartScript) -> Self {
        Self {
            start,
            ..Self::default()
        }
    }

    /// Started downloads block until `gate` is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn probe(&self, url: &str) -> Result<ProbeInfo, DownloadError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        match &self.probe {
            ProbeScript::Echo => {
                let id = url.rsplit(['/', '=']).next().unwrap_or_default();
                parse_probe_output(&format!("{id}|Title of {id}\n"))
            }
            ProbeScript::Raw(raw) => parse_probe_output(raw),
            ProbeScript::Fail => Err(DownloadError::ProbeFailed {
                status: "exit status: 1".into(),
                stderr: "ERROR: Unsupported URL".into(),
            }),
        }
    }

    fn start(&self, job: &DownloadJob) -> Result<PendingDownload, DownloadError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        let script = self.start.clone();
        if let StartScript::FailToStart = script {
            return Err(DownloadError::Spawn {
                program: "fake-downloader".into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            });
        }
        let gate = self.gate.clone();
        let output = job.output_path();
        Ok(Box::pin(async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            match script {
                StartScript::WriteFile(bytes) => {
                    tokio::fs::write(&output, bytes).await?;
                    Ok(())
                }
                StartScript::ExitWithError => Err(DownloadError::DownloadFailed {
                    status: "exit status: 1".into(),
                    stderr: "ERROR: requested format not available".into(),
                }),
                StartScript::NoFile | StartScript::FailToStart => Ok(()),
            }
        }))
    }
}

/// Router plus handles to everything behind it.
pub struct TestApp {
    pub state: Arc<AppState>,
    pub downloader: Arc<FakeDownloader>,
    pub router: Router,
    _dir: TempDir,
}

impl TestApp {
    pub async fn call(&self, req: Request<Body>) -> Response {
        self.router.clone().oneshot(req).await.unwrap()
    }
}

/// Defaults for tests: no CORS list, no Swagger, no probe timeout.
pub fn test_config(media_dir: PathBuf) -> Config {
    Config {
        bind_address: "127.0.0.1:0".into(),
        database_url: "unused".into(),
        media_dir,
        downloader_bin: "fake-downloader".into(),
        probe_timeout: None,
        log_level: "debug".into(),
        log_json: false,
        log_dir: None,
        cors_allowed_origins: None,
        enable_swagger: false,
    }
}

pub async fn test_app(downloader: FakeDownloader) -> TestApp {
    let (dir, store) = temp_store().await;
    let media_dir = dir.path().join("wavs");
    tokio::fs::create_dir_all(&media_dir).await.unwrap();

    let config = test_config(media_dir);
    let downloader = Arc::new(downloader);
    let state = Arc::new(AppState {
        config: Arc::new(config),
        store: Arc::new(store),
        downloader: downloader.clone(),
    });
    TestApp {
        router: routes::build(Arc::clone(&state)),
        state,
        downloader,
        _dir: dir,
    }
}

pub fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_bytes(res: Response) -> Vec<u8> {
    axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(res: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(res).await).unwrap()
}

/// Poll until the background download of `id` has succeeded or failed.
pub async fn wait_until_finished(store: &SqliteStore, id: i64) -> WaveRecord {
    for _ in 0..500 {
        let wave = store.get_wave(id).await.unwrap().unwrap();
        if matches!(wave.status, WaveStatus::Succeeded | WaveStatus::Failed) {
            return wave;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("wave {id} did not finish in time");
}
