//! Optional subtitle generation via the whisper CLI.
//!
//! Transcription is a capability, not a requirement: when the binary is
//! missing or the tool fails, the transcriber reports "unavailable" and the
//! job continues without subtitles.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::collab::Transcriber;
use crate::error::{MediaError, MediaResult};

/// Transcriber wrapping the `whisper` CLI, if installed.
pub struct WhisperTranscriber {
    binary: Option<PathBuf>,
    model: String,
}

impl WhisperTranscriber {
    /// Detect whisper on the PATH. A missing binary is not an error.
    pub fn detect() -> Self {
        let binary = which::which("whisper").ok();
        if binary.is_none() {
            info!("whisper not found, subtitles will be omitted");
        }
        Self {
            binary,
            model: "small".to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn is_available(&self) -> bool {
        self.binary.is_some()
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(
        &self,
        source: &Path,
        dest_dir: &Path,
        cancel: &CancellationToken,
    ) -> MediaResult<Option<PathBuf>> {
        let Some(binary) = &self.binary else {
            return Ok(None);
        };

        tokio::fs::create_dir_all(dest_dir).await?;

        let spawned = Command::new(binary)
            .arg(source)
            .args(["--model", &self.model])
            .args(["--output_format", "srt"])
            .arg("--output_dir")
            .arg(dest_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            // Spawn failure degrades to "unavailable".
            Err(e) => {
                warn!("failed to spawn whisper, subtitles omitted: {e}");
                return Ok(None);
            }
        };

        let status = tokio::select! {
            _ = cancel.cancelled() => {
                child.start_kill().ok();
                let _ = child.wait().await;
                return Err(MediaError::Cancelled);
            }
            status = child.wait() => status?,
        };

        if !status.success() {
            warn!("whisper exited with {status}, subtitles omitted");
            return Ok(None);
        }

        let stem = source.file_stem().unwrap_or_default().to_string_lossy();
        let srt = dest_dir.join(format!("{stem}.srt"));
        if srt.exists() {
            info!(subtitles = %srt.display(), "Transcription complete");
            Ok(Some(srt))
        } else {
            warn!("whisper produced no srt file, subtitles omitted");
            Ok(None)
        }
    }
}
