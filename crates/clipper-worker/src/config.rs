//! Daemon configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Daemon configuration, read from `CLIPPER_*` environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Root of the per-job scratch workspace
    pub work_dir: PathBuf,
    /// Path of the persisted scheduler state file
    pub state_path: PathBuf,
    /// Directory where the dry-run publisher drops its receipts
    pub receipts_dir: PathBuf,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// Explicit yt-dlp binary path (otherwise resolved from PATH)
    pub ytdlp_binary: Option<PathBuf>,
    /// Explicit ffprobe binary path
    pub ffprobe_binary: Option<PathBuf>,
    /// Explicit ffmpeg binary path
    pub ffmpeg_binary: Option<PathBuf>,
    /// Whisper model name used for transcription
    pub whisper_model: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        let work_dir = PathBuf::from("/tmp/clipper");
        Self {
            state_path: work_dir.join("state.json"),
            receipts_dir: work_dir.join("receipts"),
            work_dir,
            shutdown_timeout: Duration::from_secs(30),
            ytdlp_binary: None,
            ffprobe_binary: None,
            ffmpeg_binary: None,
            whisper_model: "small".to_string(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let work_dir = std::env::var("CLIPPER_WORK_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp/clipper"));
        Self {
            state_path: std::env::var("CLIPPER_STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| work_dir.join("state.json")),
            receipts_dir: std::env::var("CLIPPER_RECEIPTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| work_dir.join("receipts")),
            work_dir,
            shutdown_timeout: Duration::from_secs(
                std::env::var("CLIPPER_SHUTDOWN_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            ytdlp_binary: std::env::var("CLIPPER_YTDLP_BIN").map(PathBuf::from).ok(),
            ffprobe_binary: std::env::var("CLIPPER_FFPROBE_BIN").map(PathBuf::from).ok(),
            ffmpeg_binary: std::env::var("CLIPPER_FFMPEG_BIN").map(PathBuf::from).ok(),
            whisper_model: std::env::var("CLIPPER_WHISPER_MODEL")
                .unwrap_or_else(|_| "small".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.work_dir, PathBuf::from("/tmp/clipper"));
        assert_eq!(config.state_path, PathBuf::from("/tmp/clipper/state.json"));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(30));
        assert!(config.ytdlp_binary.is_none());
    }
}
