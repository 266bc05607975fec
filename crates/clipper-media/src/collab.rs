//! Collaborator contracts consumed by the scheduler core.
//!
//! The queue worker only ever talks to external tools through these traits,
//! so tests can drive the full pipeline with scripted fakes. Long-running
//! collaborators take a [`CancellationToken`] and are expected to return
//! promptly with [`MediaError::Cancelled`](crate::MediaError::Cancelled)
//! when it trips.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use clipper_models::ClipPlan;

use crate::error::MediaResult;
use crate::render::RenderStyle;

/// Fetches source media into the workspace.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download `url` into `dest_dir` and return the local file path.
    async fn download(
        &self,
        url: &str,
        dest_dir: &Path,
        cancel: &CancellationToken,
    ) -> MediaResult<PathBuf>;
}

/// Probes the duration of a local media file.
#[async_trait]
pub trait DurationProbe: Send + Sync {
    /// Duration of the file in seconds.
    async fn probe_duration(&self, path: &Path) -> MediaResult<f64>;
}

/// Renders one planned segment into a publishable vertical clip.
#[async_trait]
pub trait ClipRenderer: Send + Sync {
    /// Render `plan` out of `source` into `dest`, returning the artifact path.
    async fn render(
        &self,
        source: &Path,
        plan: &ClipPlan,
        style: &RenderStyle,
        subtitles: Option<&Path>,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> MediaResult<PathBuf>;
}

/// Generates subtitles for a source file.
///
/// `Ok(None)` means the capability is unavailable; absence degrades
/// gracefully (clips simply carry no subtitles) and must never fail a job.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(
        &self,
        source: &Path,
        dest_dir: &Path,
        cancel: &CancellationToken,
    ) -> MediaResult<Option<PathBuf>>;
}

/// Per-clip metadata handed to the publish collaborator.
#[derive(Debug, Clone)]
pub struct PublishMetadata {
    /// Account-level title template.
    pub title: String,
    /// Human label of the clip ("Parte 3").
    pub label: String,
    /// 1-based clip number.
    pub number: u32,
    /// Total clips in the job.
    pub total: u32,
}

/// Publishes a rendered clip to the target platform.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish `artifact` and return the platform-side post id.
    async fn publish(
        &self,
        artifact: &Path,
        access_token: &str,
        metadata: &PublishMetadata,
        cancel: &CancellationToken,
    ) -> MediaResult<String>;
}

/// The full collaborator set wired into the scheduler.
#[derive(Clone)]
pub struct Collaborators {
    pub downloader: Arc<dyn Downloader>,
    pub prober: Arc<dyn DurationProbe>,
    pub renderer: Arc<dyn ClipRenderer>,
    pub transcriber: Arc<dyn Transcriber>,
    pub publisher: Arc<dyn Publisher>,
}
