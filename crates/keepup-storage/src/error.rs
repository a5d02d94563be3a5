use std::path::PathBuf;

use keepup_core::TaskId;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("network task {0} does not exist")]
    TaskNotFound(TaskId),

    #[error("store is unavailable: {0}")]
    Unavailable(String),

    #[error("failed to access store file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt store file: {0}")]
    Corrupt(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
