use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Lifecycle of the background download attached to a wave.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WaveStatus {
    /// Row written, download process not started yet.
    Pending,
    /// Download process spawned and not yet exited.
    Running,
    /// Process exited cleanly and the WAV file is on disk.
    Succeeded,
    Failed,
}

/// Source fields of a wave, known once the probe has succeeded.
#[derive(Debug, Clone)]
pub struct NewWave {
    pub youtube_url: String,
    pub youtube_id: String,
    pub wave_name: String,
}

/// A row in the `waves` table.
#[derive(Debug, Clone)]
pub struct WaveRecord {
    pub id: i64,
    pub youtube_url: String,
    pub youtube_id: String,
    pub wave_name: String,
    pub status: WaveStatus,
    pub error_msg: Option<String>,
    pub insert_dt: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
