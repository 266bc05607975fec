//! Vertical clip rendering via ffmpeg.
//!
//! Each clip is cut from the source and reformatted for a 1080x1920
//! canvas: a blurred, stretched copy of the frame as background, the
//! original 16:9 frame overlaid in the middle, plus optional title and
//! part-label overlays and optional subtitle burn-in.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use clipper_models::{AccountConfig, ClipPlan};

use crate::collab::ClipRenderer;
use crate::error::{MediaError, MediaResult};

const CANVAS_WIDTH: u32 = 1080;
const CANVAS_HEIGHT: u32 = 1920;
/// Height of the 16:9 foreground at canvas width (1080 * 9 / 16).
const FOREGROUND_HEIGHT: u32 = 608;

/// Style settings for rendered clips, snapshotted from the account config.
#[derive(Debug, Clone)]
pub struct RenderStyle {
    /// Title overlay (empty disables it).
    pub title: String,
    /// Prefix for the per-clip part label.
    pub part_label_prefix: String,
    /// Whether the part label overlay is drawn.
    pub part_label_enabled: bool,
    /// Optional font file for the overlays.
    pub font_path: Option<String>,
    /// x264 constant rate factor.
    pub crf: u8,
    /// x264 preset.
    pub x264_preset: String,
}

impl From<&AccountConfig> for RenderStyle {
    fn from(config: &AccountConfig) -> Self {
        Self {
            title: config.title.clone(),
            part_label_prefix: config.part_label_prefix.clone(),
            part_label_enabled: config.part_label_enabled,
            font_path: None,
            crf: config.crf,
            x264_preset: config.x264_preset.clone(),
        }
    }
}

/// Renderer wrapping the `ffmpeg` CLI.
pub struct FfmpegRenderer {
    binary: PathBuf,
}

impl FfmpegRenderer {
    /// Locate `ffmpeg` on the PATH.
    pub fn locate() -> MediaResult<Self> {
        let binary =
            which::which("ffmpeg").map_err(|_| MediaError::BinaryNotFound("ffmpeg".into()))?;
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
impl ClipRenderer for FfmpegRenderer {
    async fn render(
        &self,
        source: &Path,
        plan: &ClipPlan,
        style: &RenderStyle,
        subtitles: Option<&Path>,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> MediaResult<PathBuf> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let (filter_graph, out_label) = build_filter_graph(style, plan, subtitles);
        debug!(clip = plan.number(), filter = %filter_graph, "Rendering clip");

        let mut child = Command::new(&self.binary)
            .arg("-y")
            .args(["-ss", &plan.start_secs.to_string()])
            .args(["-to", &plan.end_secs.to_string()])
            .arg("-i")
            .arg(source)
            .args(["-filter_complex", &filter_graph])
            .args(["-map", &format!("[{out_label}]")])
            .args(["-map", "0:a?"])
            .args(["-c:v", "libx264"])
            .args(["-preset", &style.x264_preset])
            .args(["-crf", &style.crf.to_string()])
            .args(["-c:a", "aac"])
            .args(["-b:a", "128k"])
            .arg(dest)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MediaError::render(format!("failed to spawn ffmpeg: {e}")))?;

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
            return Err(MediaError::render(format!(
                "ffmpeg exited with {status}: {tail}"
            )));
        }

        info!(clip = plan.number(), out = %dest.display(), "Clip rendered");
        Ok(dest.to_path_buf())
    }
}

/// Escape a value for use inside an ffmpeg drawtext expression.
fn escape_drawtext(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace(':', "\\:")
}

/// Build the filter graph for one clip; returns (graph, output pad label).
fn build_filter_graph(
    style: &RenderStyle,
    plan: &ClipPlan,
    subtitles: Option<&Path>,
) -> (String, String) {
    let overlay_y = (CANVAS_HEIGHT - FOREGROUND_HEIGHT) / 2;
    let mut statements = vec![
        format!("[0:v]scale={CANVAS_WIDTH}:{CANVAS_HEIGHT},gblur=sigma=30[bg]"),
        format!("[0:v]scale={CANVAS_WIDTH}:{FOREGROUND_HEIGHT}[fg]"),
        format!("[bg][fg]overlay=0:{overlay_y}[base]"),
    ];
    let mut current = "base".to_string();

    let fontfile = style
        .font_path
        .as_deref()
        .map(|f| format!(":fontfile='{}'", escape_drawtext(f)))
        .unwrap_or_default();

    if !style.title.is_empty() {
        let title = escape_drawtext(&style.title);
        let next = "v_title";
        statements.push(format!(
            "[{current}]drawtext=text='{title}':fontcolor=white:fontsize=56:\
             x=(w-text_w)/2:y=140:line_spacing=6{fontfile}[{next}]"
        ));
        current = next.to_string();
    }

    if style.part_label_enabled {
        let label = escape_drawtext(&format!("{} {}", style.part_label_prefix, plan.number()));
        let next = "v_part";
        statements.push(format!(
            "[{current}]drawtext=text='{label}':fontcolor=white:fontsize=44:\
             x=(w-text_w)/2:y=h-120:box=1:boxcolor=#00000066:boxborderw=18{fontfile}[{next}]"
        ));
        current = next.to_string();
    }

    if let Some(subtitles) = subtitles {
        let path = escape_drawtext(&subtitles.display().to_string());
        let next = "v_subs";
        statements.push(format!("[{current}]subtitles='{path}'[{next}]"));
        current = next.to_string();
    }

    (statements.join(";"), current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipper_models::plan_default;

    fn style() -> RenderStyle {
        RenderStyle {
            title: "La mia serie".into(),
            part_label_prefix: "Parte".into(),
            part_label_enabled: true,
            font_path: None,
            crf: 18,
            x264_preset: "medium".into(),
        }
    }

    #[test]
    fn test_filter_graph_layers() {
        let plan = plan_default(605.0).unwrap().remove(2);
        let (graph, out) = build_filter_graph(&style(), &plan, None);
        assert!(graph.contains("scale=1080:1920,gblur"));
        assert!(graph.contains("overlay=0:656"));
        assert!(graph.contains("text='La mia serie'"));
        assert!(graph.contains("text='Parte 3'"));
        assert_eq!(out, "v_part");
    }

    #[test]
    fn test_filter_graph_without_overlays() {
        let plan = plan_default(100.0).unwrap().remove(0);
        let mut style = style();
        style.title.clear();
        style.part_label_enabled = false;
        let (graph, out) = build_filter_graph(&style, &plan, None);
        assert!(!graph.contains("drawtext"));
        assert_eq!(out, "base");
    }

    #[test]
    fn test_filter_graph_subtitles_last() {
        let plan = plan_default(100.0).unwrap().remove(0);
        let subs = PathBuf::from("/tmp/video.srt");
        let (graph, out) = build_filter_graph(&style(), &plan, Some(&subs));
        assert!(graph.ends_with("[v_subs]"));
        assert_eq!(out, "v_subs");
    }

    #[test]
    fn test_drawtext_escaping() {
        assert_eq!(escape_drawtext("it's 1:1"), "it\\'s 1\\:1");
    }
}
