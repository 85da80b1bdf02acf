//! Decision store. One pretty-printed JSON file per session.
//!
//! Writes to `<approval_dir>/<session_id>.json`. A later write for the same
//! session replaces the earlier one (last write wins). Each write lands in a
//! temp file next to the target and is renamed into place, so a polling hook
//! only ever sees complete records.

use crate::approval::types::DecisionRecord;
use crate::approval::DecisionSink;
use crate::store::{decision_path, StoreError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Filesystem-backed store keyed by session id.
#[derive(Debug, Clone)]
pub struct DecisionStore {
    base_dir: PathBuf,
}

impl DecisionStore {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    /// The directory decisions are written to.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Where the record for `session_id` lives.
    pub fn path_for(&self, session_id: &str) -> Result<PathBuf, StoreError> {
        decision_path(&self.base_dir, session_id)
    }

    /// Create the approval directory (and parents) if absent.
    pub async fn ensure_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|source| StoreError::CreateDir {
                path: self.base_dir.clone(),
                source,
            })
    }

    /// Persist `record` for `session_id`, replacing any earlier record.
    /// Returns the path written. No retry on failure.
    pub async fn write(&self, session_id: &str, record: &DecisionRecord) -> Result<PathBuf, StoreError> {
        let target = self.path_for(session_id)?;
        self.ensure_dir().await?;

        let json = serde_json::to_string_pretty(record)?;

        let staging = self
            .base_dir
            .join(format!(".{}.{}.tmp", session_id, uuid::Uuid::new_v4()));
        if let Err(e) = publish(&staging, &target, json.as_bytes()).await {
            // Either step can leave a (partial) staging file behind
            let _ = fs::remove_file(&staging).await;
            return Err(e);
        }

        tracing::debug!(session_id, path = %target.display(), "Decision written");
        Ok(target)
    }
}

/// Write `bytes` to `staging`, then rename it over `target`.
async fn publish(staging: &Path, target: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    fs::write(staging, bytes)
        .await
        .map_err(|source| StoreError::Write {
            path: staging.to_path_buf(),
            source,
        })?;
    fs::rename(staging, target)
        .await
        .map_err(|source| StoreError::Write {
            path: target.to_path_buf(),
            source,
        })
}

#[async_trait]
impl DecisionSink for DecisionStore {
    async fn put(&self, session_id: &str, record: &DecisionRecord) -> Result<(), StoreError> {
        self.write(session_id, record).await.map(|_| ())
    }
}
