//! Publish collaborator.
//!
//! The real platform upload is an external concern; the default
//! implementation records a receipt per clip so operators can audit what
//! would have been posted, mirroring the dry-run behavior of the original
//! tool.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::collab::{PublishMetadata, Publisher};
use crate::error::{MediaError, MediaResult};

/// Publisher that writes a receipt file instead of uploading.
pub struct DryRunPublisher {
    receipts_dir: PathBuf,
}

impl DryRunPublisher {
    pub fn new(receipts_dir: impl Into<PathBuf>) -> Self {
        Self {
            receipts_dir: receipts_dir.into(),
        }
    }
}

#[async_trait]
impl Publisher for DryRunPublisher {
    async fn publish(
        &self,
        artifact: &Path,
        access_token: &str,
        metadata: &PublishMetadata,
        cancel: &CancellationToken,
    ) -> MediaResult<String> {
        if cancel.is_cancelled() {
            return Err(MediaError::Cancelled);
        }
        if !artifact.exists() {
            return Err(MediaError::publish(format!(
                "artifact missing: {}",
                artifact.display()
            )));
        }

        let post_id = Uuid::new_v4().to_string();
        tokio::fs::create_dir_all(&self.receipts_dir).await?;
        let receipt = self.receipts_dir.join(format!("{post_id}.txt"));
        let token_set = if access_token.is_empty() { "no" } else { "yes" };
        tokio::fs::write(
            &receipt,
            format!(
                "clip: {}\ntitle: {}\nlabel: {}\nposition: {}/{}\ntoken_configured: {}\n",
                artifact.display(),
                metadata.title,
                metadata.label,
                metadata.number,
                metadata.total,
                token_set,
            ),
        )
        .await?;

        info!(
            clip = metadata.number,
            total = metadata.total,
            post_id,
            "Published clip (dry run)"
        );
        Ok(post_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dry_run_publish_writes_receipt() {
        let tmp = tempfile::tempdir().unwrap();
        let artifact = tmp.path().join("clip_001.mp4");
        tokio::fs::write(&artifact, b"clip").await.unwrap();

        let publisher = DryRunPublisher::new(tmp.path().join("receipts"));
        let metadata = PublishMetadata {
            title: "Serie".into(),
            label: "Parte 1".into(),
            number: 1,
            total: 3,
        };
        let post_id = publisher
            .publish(&artifact, "tok", &metadata, &CancellationToken::new())
            .await
            .unwrap();

        let receipt = tmp.path().join("receipts").join(format!("{post_id}.txt"));
        let contents = tokio::fs::read_to_string(receipt).await.unwrap();
        assert!(contents.contains("Parte 1"));
        assert!(contents.contains("position: 1/3"));
    }

    #[tokio::test]
    async fn test_missing_artifact_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let publisher = DryRunPublisher::new(tmp.path());
        let metadata = PublishMetadata {
            title: String::new(),
            label: "Parte 1".into(),
            number: 1,
            total: 1,
        };
        let result = publisher
            .publish(
                &tmp.path().join("gone.mp4"),
                "",
                &metadata,
                &CancellationToken::new(),
            )
            .await;
        assert!(matches!(result, Err(MediaError::Publish(_))));
    }
}
