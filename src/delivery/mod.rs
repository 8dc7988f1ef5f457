//! Adaptive delivery of whole job logs
//!
//! A log small enough for the caller's token budget is returned inline. Above
//! the configured threshold it is written to `job.log` in a fresh temporary
//! directory and only the path is returned. The decision is a pure function
//! of the text and the threshold; files are never cleaned up here.

mod tokens;

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub use tokens::{CHARS_PER_TOKEN, estimate_tokens};

pub const LOG_FILE_NAME: &str = "job.log";
pub const DEFAULT_TEMP_PREFIX: &str = "job-logs-";

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to create temporary directory: {0}")]
    TempDir(#[source] io::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to stat {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    Inline,
    File,
}

/// Where and when to spill logs to disk
#[derive(Debug, Clone)]
pub struct DeliveryPolicy {
    /// Token threshold; zero or negative keeps every log inline
    pub threshold: i64,
    pub temp_prefix: String,
    /// Parent of the temporary directories, system temp dir when unset
    pub temp_root: Option<PathBuf>,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            threshold: 0,
            temp_prefix: DEFAULT_TEMP_PREFIX.to_string(),
            temp_root: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub mode: DeliveryMode,
    pub estimated_tokens: u64,
}

/// Pick a delivery mode for `text`
pub fn decide(text: &str, threshold: i64) -> Decision {
    let estimated_tokens = estimate_tokens(text);
    let mode = match u64::try_from(threshold) {
        Ok(limit) if limit > 0 && estimated_tokens > limit => DeliveryMode::File,
        _ => DeliveryMode::Inline,
    };
    Decision {
        mode,
        estimated_tokens,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryResult {
    pub mode: DeliveryMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_bytes: Option<u64>,
    pub estimated_tokens: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Deliver `text` according to `policy`, writing a file when it is too large.
///
/// Any filesystem failure aborts the delivery; there is no inline fallback.
pub fn deliver(text: String, policy: &DeliveryPolicy) -> Result<DeliveryResult, DeliveryError> {
    let decision = decide(&text, policy.threshold);
    if decision.mode == DeliveryMode::Inline {
        return Ok(DeliveryResult {
            mode: DeliveryMode::Inline,
            content: Some(text),
            file_path: None,
            file_size_bytes: None,
            estimated_tokens: decision.estimated_tokens,
            reason: None,
        });
    }

    let (path, size) = write_log_file(&text, policy)?;
    info!(
        path = %path.display(),
        size,
        estimated_tokens = decision.estimated_tokens,
        threshold = policy.threshold,
        "Job log exceeded token threshold, saved to file"
    );

    Ok(DeliveryResult {
        mode: DeliveryMode::File,
        content: None,
        file_path: Some(path),
        file_size_bytes: Some(size),
        estimated_tokens: decision.estimated_tokens,
        reason: Some(format!(
            "Log exceeded {} token threshold, saved to file",
            policy.threshold
        )),
    })
}

/// Write `text` to `job.log` inside a new exclusive directory, returning its
/// absolute path and size
fn write_log_file(text: &str, policy: &DeliveryPolicy) -> Result<(PathBuf, u64), DeliveryError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(&policy.temp_prefix);
    let dir = match &policy.temp_root {
        Some(root) => builder.tempdir_in(root),
        None => builder.tempdir(),
    }
    .map_err(DeliveryError::TempDir)?;
    let dir = dir.keep();

    let path = dir.join(LOG_FILE_NAME);
    std::fs::write(&path, text.as_bytes()).map_err(|source| DeliveryError::Write {
        path: path.clone(),
        source,
    })?;

    let stat = |source| DeliveryError::Stat {
        path: path.clone(),
        source,
    };
    let size = std::fs::metadata(&path).map_err(stat)?.len();
    let path = absolute(&path).map_err(stat)?;
    Ok((path, size))
}

fn absolute(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        std::path::absolute(path)
    }
}
