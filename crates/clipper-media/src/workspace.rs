//! Per-job scratch storage and disk lifecycle.
//!
//! Every job owns a directory tree under the workspace root:
//!
//! ```text
//! <root>/<account>/<job>/source   downloaded media, deleted after the
//!                                 last successful render
//! <root>/<account>/<job>/clips    rendered artifacts, deleted per clip
//!                                 once published
//! ```
//!
//! Different jobs' paths never collide, so cross-account contention is not
//! expected; a path-keyed mutex map serializes the rare collision (e.g. a
//! reused workspace directory).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::fs;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use clipper_models::{AccountId, JobId};

use crate::error::MediaResult;

/// Workspace manager owning per-job scratch directories.
pub struct Workspace {
    root: PathBuf,
    locks: Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scratch directory for one job.
    pub fn job_dir(&self, account: &AccountId, job: &JobId) -> PathBuf {
        self.root.join(account.as_str()).join(job.as_str())
    }

    /// Directory holding the downloaded source media.
    pub fn source_dir(&self, account: &AccountId, job: &JobId) -> PathBuf {
        self.job_dir(account, job).join("source")
    }

    /// Directory holding rendered clip artifacts.
    pub fn clips_dir(&self, account: &AccountId, job: &JobId) -> PathBuf {
        self.job_dir(account, job).join("clips")
    }

    /// Create the job's directory tree, returning (source_dir, clips_dir).
    pub async fn create_job_dirs(
        &self,
        account: &AccountId,
        job: &JobId,
    ) -> MediaResult<(PathBuf, PathBuf)> {
        let source = self.source_dir(account, job);
        let clips = self.clips_dir(account, job);
        fs::create_dir_all(&source).await?;
        fs::create_dir_all(&clips).await?;
        Ok((source, clips))
    }

    /// Acquire the mutual-exclusion guard for a path.
    ///
    /// The returned guard evicts the path's map entry on drop once no
    /// other task holds or awaits it, so the map stays bounded by the
    /// number of in-flight operations.
    async fn guard(&self, path: &Path) -> PathGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().expect("workspace lock map poisoned");
            Arc::clone(
                locks
                    .entry(path.to_path_buf())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };
        PathGuard {
            workspace: self,
            path: path.to_path_buf(),
            inner: Some(lock.lock_owned().await),
        }
    }

    /// Delete the job's source media.
    ///
    /// Invoked immediately after the last successful render; sources never
    /// survive a fully-rendered job regardless of the publish outcome.
    pub async fn purge_source(&self, account: &AccountId, job: &JobId) -> MediaResult<()> {
        let dir = self.source_dir(account, job);
        let _guard = self.guard(&dir).await;
        if dir.exists() {
            fs::remove_dir_all(&dir).await?;
            debug!(job_id = %job, "Purged source directory");
        }
        Ok(())
    }

    /// Delete a single rendered artifact (after it was published).
    pub async fn remove_artifact(&self, path: &Path) -> MediaResult<()> {
        let _guard = self.guard(path).await;
        if path.exists() {
            fs::remove_file(path).await?;
            debug!(path = %path.display(), "Removed published artifact");
        }
        Ok(())
    }

    /// Delete everything the job ever wrote.
    ///
    /// Used to release partial files on failure before publishing, and on
    /// cancellation.
    pub async fn purge_job(&self, account: &AccountId, job: &JobId) -> MediaResult<()> {
        let dir = self.job_dir(account, job);
        let _guard = self.guard(&dir).await;
        if dir.exists() {
            fs::remove_dir_all(&dir).await?;
            debug!(job_id = %job, "Purged job directory");
        }
        Ok(())
    }
}

/// Held for the duration of one guarded filesystem operation.
struct PathGuard<'a> {
    workspace: &'a Workspace,
    path: PathBuf,
    inner: Option<OwnedMutexGuard<()>>,
}

impl Drop for PathGuard<'_> {
    fn drop(&mut self) {
        // Release the path lock before inspecting its reference count.
        self.inner.take();
        let mut locks = self
            .workspace
            .locks
            .lock()
            .expect("workspace lock map poisoned");
        if let Some(lock) = locks.get(&self.path) {
            if Arc::strong_count(lock) == 1 {
                locks.remove(&self.path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (AccountId, JobId) {
        (AccountId::new("acct-a"), JobId::new())
    }

    #[tokio::test]
    async fn test_create_and_purge_job_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::new(tmp.path());
        let (account, job) = ids();

        let (source, clips) = ws.create_job_dirs(&account, &job).await.unwrap();
        assert!(source.is_dir());
        assert!(clips.is_dir());

        tokio::fs::write(source.join("video.mp4"), b"source")
            .await
            .unwrap();
        tokio::fs::write(clips.join("clip_001.mp4"), b"clip")
            .await
            .unwrap();

        ws.purge_source(&account, &job).await.unwrap();
        assert!(!source.exists());
        assert!(clips.join("clip_001.mp4").exists());

        ws.purge_job(&account, &job).await.unwrap();
        assert!(!ws.job_dir(&account, &job).exists());
    }

    #[tokio::test]
    async fn test_remove_artifact_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::new(tmp.path());
        let (account, job) = ids();
        let (_, clips) = ws.create_job_dirs(&account, &job).await.unwrap();

        let artifact = clips.join("clip_001.mp4");
        tokio::fs::write(&artifact, b"clip").await.unwrap();

        ws.remove_artifact(&artifact).await.unwrap();
        assert!(!artifact.exists());
        // A second delete of the same path is a no-op, not an error.
        ws.remove_artifact(&artifact).await.unwrap();
    }

    #[tokio::test]
    async fn test_lock_map_is_evicted_after_operations() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::new(tmp.path());
        let (account, job) = ids();
        let (_, clips) = ws.create_job_dirs(&account, &job).await.unwrap();

        let artifact = clips.join("clip_001.mp4");
        tokio::fs::write(&artifact, b"clip").await.unwrap();
        ws.remove_artifact(&artifact).await.unwrap();
        ws.purge_source(&account, &job).await.unwrap();
        ws.purge_job(&account, &job).await.unwrap();

        // No operation in flight, so no lock entries linger.
        assert!(ws.locks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_guard_serializes_same_path() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Arc::new(Workspace::new(tmp.path()));
        let (account, job) = ids();
        ws.create_job_dirs(&account, &job).await.unwrap();

        // Concurrent purges of the same job must not race each other.
        let mut handles = Vec::new();
        for _ in 0..8 {
            let ws = Arc::clone(&ws);
            let account = account.clone();
            let job = job.clone();
            handles.push(tokio::spawn(async move {
                ws.purge_job(&account, &job).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert!(!ws.job_dir(&account, &job).exists());
    }
}
