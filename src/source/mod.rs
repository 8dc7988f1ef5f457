//! Raw job log sources
//!
//! A [`LogSource`] downloads the complete raw log of one job. The cache store
//! calls it on a miss and parses the bytes into rows with [`parse_log`].
//!
//! - [`BuildkiteSource`] - REST API client (`reqwest`)
//! - [`ObjectStoreSource`] - any `object_store` backend, keyed `{org}/{pipeline}/{build}/{job}.log`

mod http;
mod object;
pub mod parse;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::cache::JobKey;

pub use http::{BuildkiteSource, HttpConfig};
pub use object::ObjectStoreSource;
pub use parse::{LogParser, parse_log};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("log not found for job {0}")]
    NotFound(String),

    #[error("log for job {job} is {size} bytes, exceeding the {limit} byte limit")]
    TooLarge { job: String, size: u64, limit: u64 },

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("invalid job identity: {0}")]
    InvalidKey(String),

    #[error("Invalid source configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, SourceError>;

/// Downloads raw job logs
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn fetch(&self, key: &JobKey) -> Result<Bytes>;
}

pub(crate) fn check_size(key: &JobKey, size: u64, limit: u64) -> Result<()> {
    if limit > 0 && size > limit {
        return Err(SourceError::TooLarge {
            job: key.job.clone(),
            size,
            limit,
        });
    }
    Ok(())
}
