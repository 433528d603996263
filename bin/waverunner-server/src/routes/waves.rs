//! Wave endpoints: ingest a URL, download the finished WAV, list records.
//!
//! Each route accepts exactly one method. Anything else, `HEAD` included, is
//! answered with a 404 before any extractor runs, so a wrong-method request never probes,
//! writes a row or touches the media directory.
//!
//! Ingest does not wait for the download. The spawned process is awaited by
//! a tokio task that records `succeeded` or `failed` on the row. Retrieval
//! answers 409 until one of those is recorded.

use std::io::ErrorKind;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::{FormRejection, QueryRejection};
use axum::extract::{Form, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info, warn};
use utoipa::OpenApi;

use crate::downloader::{AUDIO_EXTENSION, DownloadError, DownloadJob, PendingDownload, wave_path};
use crate::entities::{NewWave, SqliteStore, WaveRecord, WaveStatus, WaveStore};
use crate::error::{DOWNLOAD_FAILED, ServerError};
use crate::schemas::wave::{DownloadWavQuery, ProcessWavForm, ProcessWavResponse, WavListItem};
use crate::state::AppState;

const INVALID_REQUEST: &str = "Invalid request!";
const WAV_NOT_FOUND: &str = "Failed to find WAV!";
const FILE_NOT_FOUND: &str = "Failed to open file!";
const LIST_FAILED: &str = "Failed to retrieve wav list!";

#[derive(OpenApi)]
#[openapi(
    paths(process_wav, download_wav, get_wav_list),
    components(schemas(ProcessWavForm, ProcessWavResponse, WavListItem, WaveStatus))
)]
pub struct WavesApi;

/// Register wave routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/processwav", post(process_wav).fallback(invalid_method))
        .route(
            "/downloadwav",
            get(download_wav).head(invalid_method).fallback(invalid_method),
        )
        .route(
            "/getwavlist",
            get(get_wav_list).head(invalid_method).fallback(invalid_method),
        )
}

async fn invalid_method() -> ServerError {
    ServerError::NotFound(INVALID_REQUEST.into())
}

/// Start downloading the audio of a video URL (`POST /processwav`).
///
/// Probes the URL for its identifier and title, stores a record and spawns
/// the download. Returns as soon as the download process has started.
#[utoipa::path(
    post,
    path = "/processwav",
    tag = "waves",
    request_body(content = ProcessWavForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Download started", body = ProcessWavResponse),
        (status = 400, description = "Bad form, probe failure, or the download could not start"),
        (status = 404, description = "Wrong method"),
    )
)]
pub async fn process_wav(
    State(state): State<Arc<AppState>>,
    form: Result<Form<ProcessWavForm>, FormRejection>,
) -> Result<Json<ProcessWavResponse>, ServerError> {
    let Form(form) =
        form.map_err(|e| ServerError::BadRequest(format!("invalid form body: {e}")))?;
    let url = form.url.trim();
    if url.is_empty() {
        return Err(ServerError::BadRequest("url must not be empty".into()));
    }
    info!(url, "processing wav request");

    let probe = state.downloader.probe(url).await?;
    debug!(url, youtube_id = %probe.youtube_id, title = %probe.title, "probe succeeded");

    let wave_id = state
        .store
        .insert_wave(NewWave {
            youtube_url: url.to_owned(),
            youtube_id: probe.youtube_id.clone(),
            wave_name: probe.title.clone(),
        })
        .await
        .map_err(|e| {
            error!(url, error = %e, "failed to insert wave record");
            ServerError::BadRequest(DOWNLOAD_FAILED.into())
        })?;

    let job = DownloadJob {
        url: url.to_owned(),
        youtube_id: probe.youtube_id.clone(),
        media_dir: state.config.media_dir.clone(),
    };
    let pending = match state.downloader.start(&job) {
        Ok(pending) => pending,
        Err(e) => {
            state
                .store
                .update_wave_status(wave_id, WaveStatus::Failed, Some(&e.to_string()))
                .await
                .unwrap_or_else(|err| warn!(wave_id, error = %err, "failed to record start failure"));
            return Err(e.into());
        }
    };

    // Marked before the tracker is spawned so a fast exit cannot be
    // overwritten with `running`.
    state
        .store
        .update_wave_status(wave_id, WaveStatus::Running, None)
        .await
        .unwrap_or_else(|e| warn!(wave_id, error = %e, "failed to mark wave running"));
    tokio::spawn(track_download(Arc::clone(&state.store), wave_id, job, pending));

    info!(wave_id, youtube_id = %probe.youtube_id, "wav download started");
    Ok(Json(ProcessWavResponse {
        id: wave_id,
        youtube_id: probe.youtube_id,
        wav_name: probe.title,
        status: WaveStatus::Running,
    }))
}

/// Await a started download and persist its outcome.
async fn track_download(
    store: Arc<SqliteStore>,
    wave_id: i64,
    job: DownloadJob,
    pending: PendingDownload,
) {
    let output_path = job.output_path();
    let outcome = match pending.await {
        Ok(()) => match tokio::fs::try_exists(&output_path).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(DownloadError::MissingOutput(output_path.clone())),
            Err(e) => Err(DownloadError::Io(e)),
        },
        Err(e) => Err(e),
    };

    let recorded = match &outcome {
        Ok(()) => {
            info!(wave_id, path = %output_path.display(), "wav download finished");
            store
                .update_wave_status(wave_id, WaveStatus::Succeeded, None)
                .await
        }
        Err(e) => {
            warn!(wave_id, url = %job.url, error = %e, "wav download failed");
            store
                .update_wave_status(wave_id, WaveStatus::Failed, Some(&e.to_string()))
                .await
        }
    };
    if let Err(e) = recorded {
        error!(wave_id, error = %e, "failed to record download outcome");
    }
}

/// Download a finished WAV file (`GET /downloadwav?id=<id>`).
#[utoipa::path(
    get,
    path = "/downloadwav",
    tag = "waves",
    params(DownloadWavQuery),
    responses(
        (status = 200, description = "WAV file", body = Vec<u8>, content_type = "application/octet-stream"),
        (status = 400, description = "Missing id"),
        (status = 404, description = "Unknown record, failed download, missing file, or wrong method"),
        (status = 409, description = "Download still in progress"),
    )
)]
pub async fn download_wav(
    State(state): State<Arc<AppState>>,
    query: Result<Query<DownloadWavQuery>, QueryRejection>,
) -> Result<Response, ServerError> {
    let Query(query) =
        query.map_err(|e| ServerError::BadRequest(format!("invalid query: {e}")))?;
    let raw_id = query
        .id
        .ok_or_else(|| ServerError::BadRequest("missing id query parameter".into()))?;
    let wave_id: i64 = raw_id
        .trim()
        .parse()
        .map_err(|_| ServerError::NotFound(WAV_NOT_FOUND.into()))?;

    let wave = state
        .store
        .get_wave(wave_id)
        .await
        .map_err(|e| {
            error!(wave_id, error = %e, "failed to look up wave");
            ServerError::NotFound(WAV_NOT_FOUND.into())
        })?
        .ok_or_else(|| ServerError::NotFound(WAV_NOT_FOUND.into()))?;

    match wave.status {
        WaveStatus::Pending | WaveStatus::Running => {
            return Err(ServerError::NotReady("WAV is not ready yet".into()));
        }
        WaveStatus::Failed => {
            debug!(wave_id, error = ?wave.error_msg, "requested wave failed to download");
            return Err(ServerError::NotFound("WAV download failed".into()));
        }
        WaveStatus::Succeeded => {}
    }

    let path = wave_path(&state.config.media_dir, &wave.youtube_id);
    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(wave_id, path = %path.display(), "wav file missing on disk");
            return Err(ServerError::NotFound(FILE_NOT_FOUND.into()));
        }
        Err(e) => return Err(e.into()),
    };
    let len = file.metadata().await?.len();

    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream".to_owned()),
        (
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"{}.{AUDIO_EXTENSION}\"",
                wave.youtube_id
            ),
        ),
        (header::CONTENT_LENGTH, len.to_string()),
    ];
    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}

/// List every known wave (`GET /getwavlist`).
///
/// Answers `201 Created` rather than `200`, which existing UI clients expect.
#[utoipa::path(
    get,
    path = "/getwavlist",
    tag = "waves",
    responses(
        (status = 201, description = "All waves in insertion order", body = [WavListItem]),
        (status = 404, description = "Query failure or wrong method"),
    )
)]
pub async fn get_wav_list(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<Vec<WavListItem>>), ServerError> {
    let waves = state.store.list_waves().await.map_err(|e| {
        error!(error = %e, "failed to retrieve list of waves");
        ServerError::NotFound(LIST_FAILED.into())
    })?;
    debug!(count = waves.len(), "listing waves");
    Ok((
        StatusCode::CREATED,
        Json(waves.iter().map(WaveRecord::to_list_item).collect()),
    ))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
