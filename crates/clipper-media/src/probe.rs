//! Duration probing via ffprobe.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use crate::collab::DurationProbe;
use crate::error::{MediaError, MediaResult};

/// ffprobe JSON output, reduced to what the planner needs.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Duration probe wrapping the `ffprobe` CLI.
pub struct FfprobeDurationProbe {
    binary: PathBuf,
}

impl FfprobeDurationProbe {
    /// Locate `ffprobe` on the PATH.
    pub fn locate() -> MediaResult<Self> {
        let binary =
            which::which("ffprobe").map_err(|_| MediaError::BinaryNotFound("ffprobe".into()))?;
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
impl DurationProbe for FfprobeDurationProbe {
    async fn probe_duration(&self, path: &Path) -> MediaResult<f64> {
        if !path.exists() {
            return Err(MediaError::probe(format!(
                "file not found: {}",
                path.display()
            )));
        }

        let output = Command::new(&self.binary)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "format=duration",
                "-print_format",
                "json",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            return Err(MediaError::probe(format!(
                "ffprobe exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_duration(&output.stdout)
    }
}

/// Extract `format.duration` from ffprobe JSON output.
fn parse_duration(stdout: &[u8]) -> MediaResult<f64> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)
        .map_err(|e| MediaError::probe(format!("unparseable ffprobe output: {e}")))?;

    probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| *d > 0.0)
        .ok_or_else(|| MediaError::probe("duration unavailable in ffprobe output"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        let json = br#"{"format":{"duration":"605.040000"}}"#;
        let duration = parse_duration(json).unwrap();
        assert!((duration - 605.04).abs() < 1e-9);
    }

    #[test]
    fn test_parse_duration_missing() {
        assert!(matches!(
            parse_duration(br#"{"format":{}}"#),
            Err(MediaError::Probe(_))
        ));
    }

    #[test]
    fn test_parse_duration_garbage() {
        assert!(matches!(
            parse_duration(b"not json"),
            Err(MediaError::Probe(_))
        ));
    }
}
