//! [`Downloader`] backed by a youtube-dl compatible command line tool.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::{
    AUDIO_EXTENSION, DownloadError, DownloadJob, Downloader, PROBE_DELIMITER, PendingDownload,
    ProbeInfo, parse_probe_output,
};

/// Keep at most this much of a failing process's stderr.
const STDERR_TAIL_CHARS: usize = 2048;

#[derive(Debug, Clone)]
pub struct YoutubeDl {
    program: String,
    base_args: Vec<String>,
    probe_timeout: Option<Duration>,
}

impl YoutubeDl {
    /// Build from a whitespace separated command line such as
    /// `"python3 -m yt_dlp"`. Falls back to `youtube-dl` when empty.
    pub fn from_command_line(command_line: &str, probe_timeout: Option<Duration>) -> Self {
        let mut parts = command_line.split_whitespace().map(str::to_owned);
        let program = parts.next().unwrap_or_else(|| "youtube-dl".to_owned());
        Self {
            program,
            base_args: parts.collect(),
            probe_timeout,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.base_args).stdin(Stdio::null());
        cmd
    }

    fn probe_args(url: &str) -> Vec<String> {
        vec![
            "--no-playlist".into(),
            "--get-filename".into(),
            "-o".into(),
            format!("%(id)s{PROBE_DELIMITER}%(title)s"),
            "--".into(),
            url.into(),
        ]
    }

    fn download_args(job: &DownloadJob) -> Vec<String> {
        // `%` is the template escape character, so literal ones in the
        // directory are doubled.
        let dir = job.media_dir.to_string_lossy().replace('%', "%%");
        let template = std::path::Path::new(&dir)
            .join(format!("{}.%(ext)s", job.youtube_id))
            .to_string_lossy()
            .into_owned();
        vec![
            "--no-playlist".into(),
            "-f".into(),
            "bestaudio".into(),
            "--extract-audio".into(),
            "--audio-format".into(),
            AUDIO_EXTENSION.into(),
            "--audio-quality".into(),
            "0".into(),
            "--output".into(),
            template,
            "--".into(),
            job.url.clone(),
        ]
    }

    fn spawn_error(&self, source: std::io::Error) -> DownloadError {
        DownloadError::Spawn {
            program: self.program.clone(),
            source,
        }
    }
}

#[async_trait]
impl Downloader for YoutubeDl {
    async fn probe(&self, url: &str) -> Result<ProbeInfo, DownloadError> {
        let mut cmd = self.command();
        cmd.args(Self::probe_args(url)).kill_on_drop(true);
        debug!(program = %self.program, url, "probing metadata");

        let run = cmd.output();
        let output = match self.probe_timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .map_err(|_| DownloadError::ProbeTimedOut(limit))?,
            None => run.await,
        }
        .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(DownloadError::ProbeFailed {
                status: output.status.to_string(),
                stderr: stderr_tail(&output.stderr),
            });
        }
        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }

    fn start(&self, job: &DownloadJob) -> Result<PendingDownload, DownloadError> {
        let child = self
            .command()
            .args(Self::download_args(job))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;
        info!(
            pid = ?child.id(),
            youtube_id = %job.youtube_id,
            output = %job.output_path().display(),
            "download process started"
        );

        Ok(Box::pin(async move {
            let output = child.wait_with_output().await?;
            if output.status.success() {
                Ok(())
            } else {
                Err(DownloadError::DownloadFailed {
                    status: output.status.to_string(),
                    stderr: stderr_tail(&output.stderr),
                })
            }
        }))
    }
}

fn stderr_tail(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim();
    let count = text.chars().count();
    if count <= STDERR_TAIL_CHARS {
        return text.to_owned();
    }
    text.chars().skip(count - STDERR_TAIL_CHARS).collect()
}
