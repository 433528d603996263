use crate::entities::{WaveRecord, WaveStatus};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Form body of `POST /processwav`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ProcessWavForm {
    /// Video URL handed to the downloader as-is.
    pub url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProcessWavResponse {
    pub id: i64,
    pub youtube_id: String,
    pub wav_name: String,
    pub status: WaveStatus,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DownloadWavQuery {
    /// Record id as returned by `/getwavlist`.
    pub id: Option<String>,
}

/// One entry of `GET /getwavlist`.
#[derive(Debug, Serialize, ToSchema)]
pub struct WavListItem {
    pub id: i64,
    pub wav_name: String,
    pub youtube_url: String,
    /// RFC 3339 creation time.
    pub insert_dt: String,
    pub status: WaveStatus,
    /// RFC 3339 time of the last status change.
    pub updated_at: String,
    /// Why the download failed, when it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WaveRecord {
    pub fn to_list_item(&self) -> WavListItem {
        WavListItem {
            id: self.id,
            wav_name: self.wave_name.clone(),
            youtube_url: self.youtube_url.clone(),
            insert_dt: self.insert_dt.to_rfc3339(),
            status: self.status,
            updated_at: self.updated_at.to_rfc3339(),
            error: self.error_msg.clone(),
        }
    }
}
