//! Media collaborator error types.

use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

/// Errors produced by external collaborators.
///
/// Each variant carries the failing operation and a human-readable reason;
/// the pipeline maps them onto the job's failed stage.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("download failed: {0}")]
    Download(String),

    #[error("probe failed: {0}")]
    Probe(String),

    #[error("render failed: {0}")]
    Render(String),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("required binary '{0}' not found")]
    BinaryNotFound(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    pub fn download(reason: impl Into<String>) -> Self {
        Self::Download(reason.into())
    }

    pub fn probe(reason: impl Into<String>) -> Self {
        Self::Probe(reason.into())
    }

    pub fn render(reason: impl Into<String>) -> Self {
        Self::Render(reason.into())
    }

    pub fn publish(reason: impl Into<String>) -> Self {
        Self::Publish(reason.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, MediaError::Cancelled)
    }
}
