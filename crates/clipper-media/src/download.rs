//! Source video download using yt-dlp.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::collab::Downloader;
use crate::error::{MediaError, MediaResult};

/// Downloader wrapping the `yt-dlp` CLI.
pub struct YtDlpDownloader {
    binary: PathBuf,
}

impl YtDlpDownloader {
    /// Locate `yt-dlp` on the PATH.
    pub fn locate() -> MediaResult<Self> {
        let binary =
            which::which("yt-dlp").map_err(|_| MediaError::BinaryNotFound("yt-dlp".into()))?;
        Ok(Self { binary })
    }

    /// Use an explicit binary path (configuration override).
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl Downloader for YtDlpDownloader {
    async fn download(
        &self,
        url: &str,
        dest_dir: &Path,
        cancel: &CancellationToken,
    ) -> MediaResult<PathBuf> {
        tokio::fs::create_dir_all(dest_dir).await?;

        let output_template = dest_dir.join("%(title)s.%(ext)s");
        debug!(url, dest = %dest_dir.display(), "Starting yt-dlp download");

        let mut child = Command::new(&self.binary)
            .arg(url)
            .arg("-o")
            .arg(&output_template)
            .arg("--restrict-filenames")
            .arg("--no-playlist")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MediaError::download(format!("failed to spawn yt-dlp: {e}")))?;

        let mut stderr = child.stderr.take().expect("stderr was piped");
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            stderr.read_to_end(&mut buf).await.ok();
            String::from_utf8_lossy(&buf).into_owned()
        });

        let status = tokio::select! {
            _ = cancel.cancelled() => {
                child.start_kill().ok();
                let _ = child.wait().await;
                stderr_task.abort();
                return Err(MediaError::Cancelled);
            }
            status = child.wait() => status?,
        };

        if !status.success() {
            let stderr = stderr_task.await.unwrap_or_default();
            let tail: String = stderr.lines().rev().take(5).collect::<Vec<_>>().join(" | ");
            return Err(MediaError::download(format!(
                "yt-dlp exited with {status}: {tail}"
            )));
        }

        let file = newest_file(dest_dir)
            .await?
            .ok_or_else(|| MediaError::download("no file produced by yt-dlp"))?;
        info!(url, file = %file.display(), "Download complete");
        Ok(file)
    }
}

/// Most recently modified regular file in `dir`.
///
/// yt-dlp picks the final filename from the video title, so the freshest
/// file in the job's private source directory is the download result.
async fn newest_file(dir: &Path) -> MediaResult<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    while let Some(entry) = entries.next_entry().await? {
        let meta = entry.metadata().await?;
        if !meta.is_file() {
            continue;
        }
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        if newest.as_ref().map(|(t, _)| modified > *t).unwrap_or(true) {
            newest = Some((modified, entry.path()));
        }
    }
    Ok(newest.map(|(_, path)| path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_newest_file_picks_latest() {
        let tmp = tempfile::tempdir().unwrap();
        let old = tmp.path().join("old.mp4");
        let new = tmp.path().join("new.mp4");
        tokio::fs::write(&old, b"old").await.unwrap();
        // Filesystem timestamps can be coarse; force a visible gap.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        tokio::fs::write(&new, b"new").await.unwrap();

        let picked = newest_file(tmp.path()).await.unwrap().unwrap();
        assert_eq!(picked, new);
    }

    #[tokio::test]
    async fn test_newest_file_empty_dir() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(newest_file(tmp.path()).await.unwrap().is_none());
    }
}
