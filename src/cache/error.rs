use thiserror::Error;

use crate::source::SourceError;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Fjall error: {0}")]
    Fjall(#[from] fjall::Error),

    #[error("Storage read failed: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to download/cache logs: {0}")]
    Source(#[from] SourceError),

    #[error("no cached log for job {0}")]
    SnapshotNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;
