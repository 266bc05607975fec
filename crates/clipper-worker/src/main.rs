//! Clipping scheduler daemon binary.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use clipper_media::{
    Collaborators, DryRunPublisher, FfmpegRenderer, FfprobeDurationProbe, WhisperTranscriber,
    Workspace, YtDlpDownloader,
};
use clipper_models::AccountId;
use clipper_queue::{JsonFileStore, QueueSupervisor};
use clipper_worker::WorkerConfig;

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("clipper=info".parse().expect("static directive"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting clipper-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let collab = match build_collaborators(&config) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to set up media collaborators: {}", e);
            std::process::exit(1);
        }
    };

    let workspace = Arc::new(Workspace::new(&config.work_dir));
    let store = Arc::new(JsonFileStore::new(&config.state_path));
    let supervisor = Arc::new(QueueSupervisor::new(collab, workspace, store));

    if let Err(e) = supervisor.restore().await {
        error!("Failed to restore scheduler state: {}", e);
        std::process::exit(1);
    }

    // Mirror job status transitions into the log.
    let mut events = supervisor.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    info!(
                        account_id = %event.account_id,
                        job_id = %event.job_id,
                        stage = %event.stage,
                        message = event.message.as_deref().unwrap_or(""),
                        "Job status"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Job event log lagged, skipped {} event(s)", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Optional startup enqueue, mainly for smoke runs:
    // CLIPPER_ACCOUNT=acct-a CLIPPER_URLS=url1,url2
    if let (Ok(account), Ok(urls)) = (
        std::env::var("CLIPPER_ACCOUNT"),
        std::env::var("CLIPPER_URLS"),
    ) {
        let urls: Vec<String> = urls
            .split(',')
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .collect();
        if !urls.is_empty() {
            match supervisor
                .enqueue(&AccountId::new(account), &urls, None)
                .await
            {
                Ok(ids) => info!("Enqueued {} startup job(s)", ids.len()),
                Err(e) => error!("Startup enqueue failed: {}", e),
            }
        }
    }

    tokio::signal::ctrl_c().await.ok();
    info!("Received shutdown signal");

    if tokio::time::timeout(config.shutdown_timeout, supervisor.shutdown())
        .await
        .is_err()
    {
        warn!("Graceful shutdown timed out, exiting anyway");
    }

    info!("Worker shutdown complete");
}

/// Wire the CLI-backed collaborator set from the daemon config.
///
/// yt-dlp, ffprobe and ffmpeg are required; whisper is optional and its
/// absence only disables subtitles.
fn build_collaborators(config: &WorkerConfig) -> anyhow::Result<Collaborators> {
    let downloader = match &config.ytdlp_binary {
        Some(bin) => YtDlpDownloader::with_binary(bin),
        None => YtDlpDownloader::locate()?,
    };
    let prober = match &config.ffprobe_binary {
        Some(bin) => FfprobeDurationProbe::with_binary(bin),
        None => FfprobeDurationProbe::locate()?,
    };
    let renderer = match &config.ffmpeg_binary {
        Some(bin) => FfmpegRenderer::with_binary(bin),
        None => FfmpegRenderer::locate()?,
    };
    let transcriber = WhisperTranscriber::detect().with_model(&config.whisper_model);

    Ok(Collaborators {
        downloader: Arc::new(downloader),
        prober: Arc::new(prober),
        renderer: Arc::new(renderer),
        transcriber: Arc::new(transcriber),
        publisher: Arc::new(DryRunPublisher::new(&config.receipts_dir)),
    })
}
