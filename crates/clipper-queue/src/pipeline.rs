//! The per-job processing pipeline.
//!
//! Drives a single job through
//! `Downloading -> Planning -> Rendering -> Publishing -> CleaningUp`
//! against the collaborator set, emitting a status event at every
//! transition. Cancellation is cooperative: it is honored before each
//! render, before each publish delay and before each publish, never in the
//! middle of a clip.

use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use clipper_media::{Collaborators, MediaError, PublishMetadata, RenderStyle, Workspace};
use clipper_models::{
    plan_clips, AccountConfig, ClipArtifact, FailedStage, Job, JobEvent, JobStage, JobSummary,
    DEFAULT_FINAL_MAX_SECS, DEFAULT_FINAL_MIN_SECS, DEFAULT_TARGET_SECS,
};

use crate::delay::PublishPacing;

/// Everything a queue worker needs to process jobs.
pub struct PipelineContext {
    pub collab: Collaborators,
    pub workspace: Arc<Workspace>,
    pub events: broadcast::Sender<JobEvent>,
}

impl PipelineContext {
    pub fn new(
        collab: Collaborators,
        workspace: Arc<Workspace>,
        events: broadcast::Sender<JobEvent>,
    ) -> Self {
        Self {
            collab,
            workspace,
            events,
        }
    }
}

/// Advance the job, mirror the change into the shared summary and push an
/// event. Receivers lagging or absent never block the worker.
fn transition(
    ctx: &PipelineContext,
    job: &mut Job,
    shared: &Arc<Mutex<JobSummary>>,
    stage: JobStage,
    message: Option<String>,
) {
    job.set_stage(stage);
    *shared.lock().expect("summary lock poisoned") = job.summary();

    let mut event = JobEvent::new(job.account_id.clone(), job.id.clone(), job.stage.clone());
    if let Some(message) = message {
        event = event.with_message(message);
    }
    let _ = ctx.events.send(event);
}

/// Push an informational event without a stage change.
fn emit_message(ctx: &PipelineContext, job: &Job, message: impl Into<String>) {
    let event = JobEvent::new(job.account_id.clone(), job.id.clone(), job.stage.clone())
        .with_message(message);
    let _ = ctx.events.send(event);
}

/// Terminal failure; `failed_clips` holds 1-based clip numbers for
/// publishing failures.
fn fail(
    ctx: &PipelineContext,
    job: &mut Job,
    shared: &Arc<Mutex<JobSummary>>,
    stage: FailedStage,
    reason: String,
    failed_clips: Vec<u32>,
) {
    job.fail(stage, reason, failed_clips);
    *shared.lock().expect("summary lock poisoned") = job.summary();
    let _ = ctx
        .events
        .send(JobEvent::new(job.account_id.clone(), job.id.clone(), job.stage.clone()));
}

/// Terminal failure that also releases the job's partial files.
async fn fail_and_purge(
    ctx: &PipelineContext,
    job: &mut Job,
    shared: &Arc<Mutex<JobSummary>>,
    stage: FailedStage,
    reason: String,
) {
    if let Err(e) = ctx.workspace.purge_job(&job.account_id, &job.id).await {
        warn!(job_id = %job.id, "failed to purge job workspace: {e}");
    }
    fail(ctx, job, shared, stage, reason, Vec::new());
}

/// Cancellation honored at a safe suspension point: no clip is ever left
/// half-rendered or half-published, so partial files can be released.
///
/// Clips that already failed to publish keep their files on disk for
/// manual retry, same as on a publishing failure; everything else the job
/// wrote is removed.
async fn cancelled(ctx: &PipelineContext, job: &mut Job, shared: &Arc<Mutex<JobSummary>>) {
    let retain_failed = job.artifacts.iter().any(ClipArtifact::is_publish_failed);
    if retain_failed {
        if let Err(e) = ctx.workspace.purge_source(&job.account_id, &job.id).await {
            warn!(job_id = %job.id, "failed to purge cancelled job source: {e}");
        }
        for artifact in &job.artifacts {
            if artifact.is_publish_failed() {
                continue;
            }
            if let Err(e) = ctx.workspace.remove_artifact(&artifact.path).await {
                warn!(job_id = %job.id, path = %artifact.path.display(), "failed to remove artifact: {e}");
            }
        }
    } else if let Err(e) = ctx.workspace.purge_job(&job.account_id, &job.id).await {
        warn!(job_id = %job.id, "failed to purge cancelled job workspace: {e}");
    }
    transition(ctx, job, shared, JobStage::Cancelled, None);
}

/// Drive one job to a terminal stage.
///
/// `config` is the per-job snapshot of the account settings; mid-job
/// config edits apply to the next job only.
pub(crate) async fn run_job(
    ctx: &PipelineContext,
    job: &mut Job,
    config: &AccountConfig,
    shared: &Arc<Mutex<JobSummary>>,
    cancel: &CancellationToken,
) {
    let account = job.account_id.clone();
    let id = job.id.clone();

    // Downloading
    transition(ctx, job, shared, JobStage::Downloading, None);
    let (source_dir, clips_dir) = match ctx.workspace.create_job_dirs(&account, &id).await {
        Ok(dirs) => dirs,
        Err(e) => {
            return fail_and_purge(ctx, job, shared, FailedStage::Downloading, e.to_string()).await;
        }
    };
    let source = match ctx
        .collab
        .downloader
        .download(&job.url, &source_dir, cancel)
        .await
    {
        Ok(path) => path,
        Err(MediaError::Cancelled) => return cancelled(ctx, job, shared).await,
        Err(e) => {
            return fail_and_purge(ctx, job, shared, FailedStage::Downloading, e.to_string()).await;
        }
    };

    // Planning
    transition(ctx, job, shared, JobStage::Planning, None);
    let duration = match ctx.collab.prober.probe_duration(&source).await {
        Ok(d) => d,
        Err(e) => {
            return fail_and_purge(ctx, job, shared, FailedStage::Planning, e.to_string()).await;
        }
    };
    let plan = match plan_clips(
        duration,
        DEFAULT_TARGET_SECS,
        DEFAULT_FINAL_MIN_SECS,
        DEFAULT_FINAL_MAX_SECS,
        &config.part_label_prefix,
    ) {
        Ok(plan) => plan,
        Err(e) => {
            return fail_and_purge(ctx, job, shared, FailedStage::Planning, e.to_string()).await;
        }
    };
    job.plan = plan.clone();
    let total = plan.len() as u32;
    emit_message(
        ctx,
        job,
        format!("planned {total} clip(s) from {duration:.0}s of source"),
    );

    // Optional subtitles; absence degrades, it never fails the job.
    let subtitles = if config.subtitles_enabled {
        match ctx
            .collab
            .transcriber
            .transcribe(&source, &clips_dir, cancel)
            .await
        {
            Ok(path) => {
                if path.is_none() {
                    emit_message(ctx, job, "transcription unavailable, subtitles omitted");
                }
                path
            }
            Err(MediaError::Cancelled) => return cancelled(ctx, job, shared).await,
            Err(e) => {
                warn!(job_id = %id, "transcription failed, subtitles omitted: {e}");
                None
            }
        }
    } else {
        None
    };

    // Rendering, strictly in plan order; one failure fails the whole job.
    let style = RenderStyle::from(config);
    for clip in &plan {
        if cancel.is_cancelled() {
            return cancelled(ctx, job, shared).await;
        }
        transition(
            ctx,
            job,
            shared,
            JobStage::Rendering {
                done: clip.index,
                total,
            },
            None,
        );
        let dest = clips_dir.join(format!("clip_{:03}.mp4", clip.number()));
        match ctx
            .collab
            .renderer
            .render(&source, clip, &style, subtitles.as_deref(), &dest, cancel)
            .await
        {
            Ok(path) => job.artifacts.push(ClipArtifact::new(clip.clone(), path)),
            Err(MediaError::Cancelled) => return cancelled(ctx, job, shared).await,
            Err(e) => {
                let reason = format!("{}: {e}", clip.label);
                return fail_and_purge(ctx, job, shared, FailedStage::Rendering, reason).await;
            }
        }
    }

    // All renders succeeded: the source never survives past this point,
    // regardless of the publish outcome.
    if let Err(e) = ctx.workspace.purge_source(&account, &id).await {
        warn!(job_id = %id, "failed to purge source after render: {e}");
    }

    // Publishing, strictly in plan order. A clip's failure marks it and
    // moves on; the job fails afterwards listing every failed clip.
    let pacing = PublishPacing::from_config(config);
    let mut rng = StdRng::from_os_rng();
    let mut failed_clips: Vec<u32> = Vec::new();
    for i in 0..job.artifacts.len() {
        if cancel.is_cancelled() {
            return cancelled(ctx, job, shared).await;
        }
        let number = job.artifacts[i].plan.number();
        let label = job.artifacts[i].plan.label.clone();
        transition(
            ctx,
            job,
            shared,
            JobStage::Publishing {
                done: i as u32,
                total,
            },
            None,
        );
        // No delay before the very first clip of the job.
        if i > 0 {
            let delay = pacing.next_delay(&mut rng);
            emit_message(
                ctx,
                job,
                format!("waiting {}s before publishing clip {number}/{total}", delay.as_secs()),
            );
            tokio::select! {
                _ = cancel.cancelled() => return cancelled(ctx, job, shared).await,
                _ = tokio::time::sleep(delay) => {}
            }
        }
        let metadata = PublishMetadata {
            title: config.title.clone(),
            label,
            number,
            total,
        };
        let path = job.artifacts[i].path.clone();
        match ctx
            .collab
            .publisher
            .publish(&path, &config.access_token, &metadata, cancel)
            .await
        {
            Ok(post_id) => job.artifacts[i].mark_published(post_id),
            Err(MediaError::Cancelled) => return cancelled(ctx, job, shared).await,
            Err(e) => {
                job.artifacts[i].mark_publish_failed(e.to_string());
                failed_clips.push(number);
                emit_message(ctx, job, format!("clip {number}/{total} failed to publish: {e}"));
            }
        }
    }

    // Cleaning up: only published artifacts are deleted; publish-failed
    // files stay on disk for manual retry.
    transition(ctx, job, shared, JobStage::CleaningUp, None);
    for artifact in &job.artifacts {
        if artifact.is_published() {
            if let Err(e) = ctx.workspace.remove_artifact(&artifact.path).await {
                warn!(job_id = %id, path = %artifact.path.display(), "cleanup failed: {e}");
            }
        }
    }

    if failed_clips.is_empty() {
        transition(ctx, job, shared, JobStage::Done, None);
    } else {
        let listed: Vec<String> = failed_clips.iter().map(|n| n.to_string()).collect();
        let reason = format!("clip(s) {} failed to publish", listed.join(", "));
        fail(ctx, job, shared, FailedStage::Publishing, reason, failed_clips);
    }
}
