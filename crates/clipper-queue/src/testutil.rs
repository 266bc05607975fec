//! Scripted collaborator fakes driving the pipeline in tests.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use clipper_media::{
    ClipRenderer, Collaborators, Downloader, DurationProbe, MediaError, MediaResult,
    PublishMetadata, Publisher, RenderStyle, Transcriber,
};
use clipper_models::ClipPlan;

/// Writes a small source file and returns its path.
pub(crate) struct FakeDownloader;

#[async_trait]
impl Downloader for FakeDownloader {
    async fn download(
        &self,
        _url: &str,
        dest_dir: &Path,
        _cancel: &CancellationToken,
    ) -> MediaResult<PathBuf> {
        let path = dest_dir.join("source.mp4");
        tokio::fs::write(&path, b"fake source media").await?;
        Ok(path)
    }
}

/// Parks in the download until the job's token trips. `entered` is
/// notified on entry so tests know the job is in flight.
pub(crate) struct HangingDownloader {
    pub(crate) entered: Arc<Notify>,
}

#[async_trait]
impl Downloader for HangingDownloader {
    async fn download(
        &self,
        _url: &str,
        _dest_dir: &Path,
        cancel: &CancellationToken,
    ) -> MediaResult<PathBuf> {
        self.entered.notify_one();
        cancel.cancelled().await;
        Err(MediaError::Cancelled)
    }
}

/// Reports a fixed duration for every file.
pub(crate) struct FakeProber {
    pub(crate) duration_secs: f64,
}

#[async_trait]
impl DurationProbe for FakeProber {
    async fn probe_duration(&self, _path: &Path) -> MediaResult<f64> {
        Ok(self.duration_secs)
    }
}

/// Writes the destination file, unless the clip number is scripted to fail.
pub(crate) struct FakeRenderer {
    pub(crate) fail_clips: HashSet<u32>,
    pub(crate) delay: Duration,
}

impl FakeRenderer {
    pub(crate) fn ok() -> Self {
        Self {
            fail_clips: HashSet::new(),
            delay: Duration::ZERO,
        }
    }
}

#[async_trait]
impl ClipRenderer for FakeRenderer {
    async fn render(
        &self,
        _source: &Path,
        plan: &ClipPlan,
        _style: &RenderStyle,
        _subtitles: Option<&Path>,
        dest: &Path,
        _cancel: &CancellationToken,
    ) -> MediaResult<PathBuf> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail_clips.contains(&plan.number()) {
            return Err(MediaError::render("scripted render failure"));
        }
        tokio::fs::write(dest, b"fake rendered clip").await?;
        Ok(dest.to_path_buf())
    }
}

/// Transcription is never available.
pub(crate) struct NoTranscriber;

#[async_trait]
impl Transcriber for NoTranscriber {
    async fn transcribe(
        &self,
        _source: &Path,
        _dest_dir: &Path,
        _cancel: &CancellationToken,
    ) -> MediaResult<Option<PathBuf>> {
        Ok(None)
    }
}

/// Records every publish; clip numbers in `fail_clips` are rejected.
pub(crate) struct FakePublisher {
    pub(crate) fail_clips: HashSet<u32>,
    pub(crate) published: Mutex<Vec<u32>>,
    pub(crate) tokens: Mutex<Vec<String>>,
}

impl FakePublisher {
    pub(crate) fn ok() -> Self {
        Self {
            fail_clips: HashSet::new(),
            published: Mutex::new(Vec::new()),
            tokens: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(clips: impl IntoIterator<Item = u32>) -> Self {
        Self {
            fail_clips: clips.into_iter().collect(),
            ..Self::ok()
        }
    }

    pub(crate) fn published_numbers(&self) -> Vec<u32> {
        self.published.lock().unwrap().clone()
    }

    /// Access tokens seen, one per publish attempt.
    pub(crate) fn seen_tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for FakePublisher {
    async fn publish(
        &self,
        _artifact: &Path,
        access_token: &str,
        metadata: &PublishMetadata,
        _cancel: &CancellationToken,
    ) -> MediaResult<String> {
        self.tokens.lock().unwrap().push(access_token.to_string());
        if self.fail_clips.contains(&metadata.number) {
            return Err(MediaError::publish("scripted publish failure"));
        }
        self.published.lock().unwrap().push(metadata.number);
        Ok(format!("post-{}", metadata.number))
    }
}

/// A happy-path collaborator set over a source of `duration_secs`.
pub(crate) fn collaborators(duration_secs: f64) -> (Collaborators, Arc<FakePublisher>) {
    let publisher = Arc::new(FakePublisher::ok());
    let collab = Collaborators {
        downloader: Arc::new(FakeDownloader),
        prober: Arc::new(FakeProber { duration_secs }),
        renderer: Arc::new(FakeRenderer::ok()),
        transcriber: Arc::new(NoTranscriber),
        publisher: Arc::clone(&publisher) as Arc<dyn Publisher>,
    };
    (collab, publisher)
}

/// Counts collaborator calls in flight per account.
///
/// The account is derived from the workspace-relative path every
/// collaborator receives. A count above one means two of one account's
/// jobs ran at the same time; violations are recorded instead of
/// panicking so they surface in the test task, not a worker task.
pub(crate) struct InFlightTracker {
    root: PathBuf,
    counts: Mutex<HashMap<String, usize>>,
    violations: Mutex<Vec<String>>,
}

impl InFlightTracker {
    pub(crate) fn new(root: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            root: root.into(),
            counts: Mutex::new(HashMap::new()),
            violations: Mutex::new(Vec::new()),
        })
    }

    fn account_of(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .ok()
            .and_then(|rel| rel.components().next())
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .unwrap_or_else(|| "<outside-workspace>".to_string())
    }

    pub(crate) fn enter(self: &Arc<Self>, path: &Path) -> InFlightGuard {
        let account = self.account_of(path);
        let mut counts = self.counts.lock().unwrap();
        let count = counts.entry(account.clone()).or_insert(0);
        *count += 1;
        if *count > 1 {
            self.violations
                .lock()
                .unwrap()
                .push(format!("{account}: {count} jobs in flight"));
        }
        InFlightGuard {
            tracker: Arc::clone(self),
            account,
        }
    }

    pub(crate) fn violations(&self) -> Vec<String> {
        self.violations.lock().unwrap().clone()
    }
}

pub(crate) struct InFlightGuard {
    tracker: Arc<InFlightTracker>,
    account: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut counts = self.tracker.counts.lock().unwrap();
        if let Some(count) = counts.get_mut(&self.account) {
            *count -= 1;
        }
    }
}

/// Downloader holding the in-flight count while it writes the source.
pub(crate) struct TrackedDownloader {
    tracker: Arc<InFlightTracker>,
}

#[async_trait]
impl Downloader for TrackedDownloader {
    async fn download(
        &self,
        _url: &str,
        dest_dir: &Path,
        _cancel: &CancellationToken,
    ) -> MediaResult<PathBuf> {
        let _guard = self.tracker.enter(dest_dir);
        tokio::time::sleep(Duration::from_millis(2)).await;
        let path = dest_dir.join("source.mp4");
        tokio::fs::write(&path, b"fake source media").await?;
        Ok(path)
    }
}

/// Renderer holding the in-flight count for the whole render.
pub(crate) struct TrackedRenderer {
    tracker: Arc<InFlightTracker>,
}

#[async_trait]
impl ClipRenderer for TrackedRenderer {
    async fn render(
        &self,
        _source: &Path,
        _plan: &ClipPlan,
        _style: &RenderStyle,
        _subtitles: Option<&Path>,
        dest: &Path,
        _cancel: &CancellationToken,
    ) -> MediaResult<PathBuf> {
        let _guard = self.tracker.enter(dest);
        tokio::time::sleep(Duration::from_millis(2)).await;
        tokio::fs::write(dest, b"fake rendered clip").await?;
        Ok(dest.to_path_buf())
    }
}

/// Publisher holding the in-flight count for the whole publish.
pub(crate) struct TrackedPublisher {
    tracker: Arc<InFlightTracker>,
}

#[async_trait]
impl Publisher for TrackedPublisher {
    async fn publish(
        &self,
        artifact: &Path,
        _access_token: &str,
        metadata: &PublishMetadata,
        _cancel: &CancellationToken,
    ) -> MediaResult<String> {
        let _guard = self.tracker.enter(artifact);
        tokio::time::sleep(Duration::from_millis(2)).await;
        Ok(format!("post-{}", metadata.number))
    }
}

/// A collaborator set whose download/render/publish calls maintain the
/// per-account in-flight count under `tracker`.
pub(crate) fn tracked_collaborators(
    duration_secs: f64,
    workspace_root: impl Into<PathBuf>,
) -> (Collaborators, Arc<InFlightTracker>) {
    let tracker = InFlightTracker::new(workspace_root);
    let collab = Collaborators {
        downloader: Arc::new(TrackedDownloader {
            tracker: Arc::clone(&tracker),
        }),
        prober: Arc::new(FakeProber { duration_secs }),
        renderer: Arc::new(TrackedRenderer {
            tracker: Arc::clone(&tracker),
        }),
        transcriber: Arc::new(NoTranscriber),
        publisher: Arc::new(TrackedPublisher {
            tracker: Arc::clone(&tracker),
        }),
    };
    (collab, tracker)
}
