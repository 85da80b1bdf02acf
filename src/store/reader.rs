//! The consumer side of the approval directory.
//!
//! The relay only ever writes. The hook polls here for its session's record
//! and deletes it once read; `hookrelay decisions` lists what is waiting.

use crate::approval::types::DecisionRecord;
use crate::store::{decision_path, StoreError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::time::Instant;

/// Reads and consumes decision files.
#[derive(Debug, Clone)]
pub struct DecisionReader {
    base_dir: PathBuf,
}

/// Everything found in the approval directory.
#[derive(Debug, Default)]
pub struct DecisionListing {
    /// (session id, record), newest first
    pub records: Vec<(String, DecisionRecord)>,
    /// Files that could not be read or parsed, with the reason
    pub unreadable: Vec<(PathBuf, String)>,
}

impl DecisionReader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Read the record for a session, if one exists.
    pub async fn read(&self, session_id: &str) -> Result<Option<DecisionRecord>, StoreError> {
        let path = decision_path(&self.base_dir, session_id)?;
        read_record(&path).await
    }

    /// Read the record for a session and delete it.
    pub async fn take(&self, session_id: &str) -> Result<Option<DecisionRecord>, StoreError> {
        let record = self.read(session_id).await?;
        if record.is_some() {
            self.clear(session_id).await?;
        }
        Ok(record)
    }

    /// Delete a session's record. Returns true if one was removed.
    pub async fn clear(&self, session_id: &str) -> Result<bool, StoreError> {
        let path = decision_path(&self.base_dir, session_id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Write { path, source }),
        }
    }

    /// Poll until a record for `session_id` appears, then take it.
    /// Returns None if `timeout` passes first.
    pub async fn wait_for(
        &self,
        session_id: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Option<DecisionRecord>, StoreError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(record) = self.take(session_id).await? {
                return Ok(Some(record));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// List every record waiting in the directory.
    pub async fn list(&self) -> Result<DecisionListing, StoreError> {
        let mut listing = DecisionListing::default();

        let mut dir = match fs::read_dir(&self.base_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(listing),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.base_dir.clone(),
                    source,
                })
            }
        };

        loop {
            let entry = dir.next_entry().await.map_err(|source| StoreError::Read {
                path: self.base_dir.clone(),
                source,
            })?;
            let Some(entry) = entry else { break };

            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            let Some(session_id) = path.file_stem().map(|s| s.to_string_lossy().to_string())
            else {
                continue;
            };

            match read_record(&path).await {
                Ok(Some(record)) => listing.records.push((session_id, record)),
                // Consumed between read_dir and read
                Ok(None) => {}
                Err(e) => listing.unreadable.push((path, e.to_string())),
            }
        }

        listing
            .records
            .sort_by(|a, b| b.1.timestamp.cmp(&a.1.timestamp));
        Ok(listing)
    }
}

async fn read_record(path: &Path) -> Result<Option<DecisionRecord>, StoreError> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::types::{CorrelationToken, DecisionKind};
    use crate::store::DecisionStore;
    use chrono::{Duration as ChronoDuration, Utc};
    use tempfile::TempDir;

    fn record(kind: DecisionKind, user: &str, session_id: &str) -> DecisionRecord {
        let token = CorrelationToken {
            session_id: session_id.to_string(),
            tool_name: "Write".to_string(),
            file_path: "src/main.rs".to_string(),
        };
        DecisionRecord::new(kind, user, &token, Utc::now())
    }

    #[tokio::test]
    async fn test_read_missing_is_none() {
        let tmp = TempDir::new().unwrap();
        let reader = DecisionReader::new(tmp.path());
        assert!(reader.read("nope").await.unwrap().is_none());
        assert!(!reader.clear("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_take_consumes_record() {
        let tmp = TempDir::new().unwrap();
        let store = DecisionStore::new(tmp.path());
        let reader = DecisionReader::new(tmp.path());

        store
            .write("s1", &record(DecisionKind::Approve, "alice", "s1"))
            .await
            .unwrap();

        let taken = reader.take("s1").await.unwrap().unwrap();
        assert_eq!(taken.user, "alice");
        assert!(!tmp.path().join("s1.json").exists());
        assert!(reader.take("s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_wait_for_sees_late_write() {
        let tmp = TempDir::new().unwrap();
        let store = DecisionStore::new(tmp.path());
        let reader = DecisionReader::new(tmp.path());

        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            store
                .write("late", &record(DecisionKind::Deny, "bob", "late"))
                .await
                .unwrap();
        });

        let got = reader
            .wait_for("late", Duration::from_secs(5), Duration::from_millis(10))
            .await
            .unwrap()
            .expect("record should arrive before timeout");
        assert_eq!(got.decision, DecisionKind::Deny);
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_times_out() {
        let tmp = TempDir::new().unwrap();
        let reader = DecisionReader::new(tmp.path());
        let got = reader
            .wait_for("never", Duration::from_millis(30), Duration::from_millis(10))
            .await
            .unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_list_sorts_newest_first_and_reports_garbage() {
        let tmp = TempDir::new().unwrap();
        let store = DecisionStore::new(tmp.path());

        let mut older = record(DecisionKind::Approve, "alice", "old");
        older.timestamp = Utc::now() - ChronoDuration::minutes(5);
        store.write("old", &older).await.unwrap();
        store
            .write("new", &record(DecisionKind::Deny, "bob", "new"))
            .await
            .unwrap();
        std::fs::write(tmp.path().join("broken.json"), "{ nope").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let listing = DecisionReader::new(tmp.path()).list().await.unwrap();
        let ids: Vec<&str> = listing.records.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
        assert_eq!(listing.unreadable.len(), 1);
        assert!(listing.unreadable[0].0.ends_with("broken.json"));
    }

    #[tokio::test]
    async fn test_list_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        let listing = DecisionReader::new(tmp.path().join("absent"))
            .list()
            .await
            .unwrap();
        assert!(listing.records.is_empty());
        assert!(listing.unreadable.is_empty());
    }
}
