pub mod reader;
pub mod writer;

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use reader::{DecisionListing, DecisionReader};
pub use writer::DecisionStore;

/// Where the relay and the hook meet unless configured otherwise.
pub const DEFAULT_APPROVAL_DIR: &str = "/tmp/claude-approvals";

/// Errors from reading or writing decision files.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid session id {0:?}")]
    InvalidKey(String),

    #[error("failed to create approval directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize decision record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write decision file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is not a valid decision record: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// `<base_dir>/<session_id>.json`, after checking the id is a plain file name.
pub fn decision_path(base_dir: &Path, session_id: &str) -> Result<PathBuf, StoreError> {
    if !crate::approval::types::is_plain_file_name(session_id) {
        return Err(StoreError::InvalidKey(session_id.to_string()));
    }
    Ok(base_dir.join(format!("{}.json", session_id)))
}
