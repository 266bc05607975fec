//! External tool collaborators and workspace lifecycle.
//!
//! This crate provides:
//! - The collaborator contracts the scheduler core relies on (download,
//!   probe, render, transcribe, publish), as async trait seams
//! - CLI-backed implementations wrapping `yt-dlp`, `ffprobe`, `ffmpeg` and
//!   `whisper`, with cooperative cancellation
//! - The workspace manager owning per-job scratch directories and the
//!   source/clip disk lifecycle

pub mod collab;
pub mod download;
pub mod error;
pub mod probe;
pub mod publish;
pub mod render;
pub mod transcribe;
pub mod workspace;

pub use collab::{
    ClipRenderer, Collaborators, Downloader, DurationProbe, PublishMetadata, Publisher, Transcriber,
};
pub use download::YtDlpDownloader;
pub use error::{MediaError, MediaResult};
pub use probe::FfprobeDurationProbe;
pub use publish::DryRunPublisher;
pub use render::{FfmpegRenderer, RenderStyle};
pub use transcribe::WhisperTranscriber;
pub use workspace::Workspace;
