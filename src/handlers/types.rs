//! Tool arguments and responses
//!
//! Arguments arrive as JSON objects. Every tool takes the job identity
//! ([`JobParams`]); query tools add formatting and cache controls through
//! flattened groups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::traits::HandlerError;
use crate::cache::{JobKey, SnapshotInfo};
use crate::delivery::DeliveryMode;
use crate::format::{FormattedEntry, Formatter, OutputFormat};

/// Identity of the job whose log is queried
#[derive(Debug, Clone, Deserialize)]
pub struct JobParams {
    pub org: String,
    pub pipeline: String,
    pub build: String,
    pub job: String,
}

impl JobParams {
    pub fn key(&self) -> Result<JobKey, HandlerError> {
        for (field, value) in [
            ("org", &self.org),
            ("pipeline", &self.pipeline),
            ("build", &self.build),
            ("job", &self.job),
        ] {
            if value.trim().is_empty() {
                return Err(HandlerError::Validation(format!("{} must not be empty", field)));
            }
            if matches!(value.as_str(), "." | "..") {
                return Err(HandlerError::Validation(format!(
                    "{} must not be a relative path segment",
                    field
                )));
            }
        }
        Ok(JobKey::new(&self.org, &self.pipeline, &self.build, &self.job))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheParams {
    /// Duration string such as `"30s"` or `"5m"`
    #[serde(default)]
    pub cache_ttl: Option<String>,
    #[serde(default)]
    pub force_refresh: bool,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct FormatParams {
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub raw: bool,
    #[serde(default)]
    pub preserve_ansi: bool,
}

impl FormatParams {
    pub fn formatter(&self) -> Formatter {
        Formatter::new(self.format, self.raw, self.preserve_ansi)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InfoParams {
    #[serde(flatten)]
    pub job: JobParams,
    #[serde(flatten)]
    pub output: FormatParams,
    #[serde(flatten)]
    pub cache: CacheParams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TailParams {
    #[serde(flatten)]
    pub job: JobParams,
    pub tail: Option<i64>,
    #[serde(flatten)]
    pub output: FormatParams,
    #[serde(flatten)]
    pub cache: CacheParams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadParams {
    #[serde(flatten)]
    pub job: JobParams,
    pub seek: Option<u64>,
    pub limit: Option<u64>,
    #[serde(flatten)]
    pub output: FormatParams,
    #[serde(flatten)]
    pub cache: CacheParams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchParams {
    #[serde(flatten)]
    pub job: JobParams,
    pub pattern: String,
    #[serde(default)]
    pub context: u64,
    pub before_context: Option<u64>,
    pub after_context: Option<u64>,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub invert_match: bool,
    #[serde(default)]
    pub reverse: bool,
    pub seek_start: Option<u64>,
    pub limit: Option<u64>,
    #[serde(flatten)]
    pub output: FormatParams,
    #[serde(flatten)]
    pub cache: CacheParams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobLogsParams {
    #[serde(flatten)]
    pub job: JobParams,
    #[serde(flatten)]
    pub cache: CacheParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub row_count: u64,
    pub byte_size: u64,
    pub cache_file: String,
    pub fetched_at: DateTime<Utc>,
    pub group_count: u64,
    pub command_count: u64,
}

impl From<SnapshotInfo> for FileInfo {
    fn from(info: SnapshotInfo) -> Self {
        Self {
            row_count: info.row_count,
            byte_size: info.byte_size,
            cache_file: info.location,
            fetched_at: info.fetched_at,
            group_count: info.group_count,
            command_count: info.command_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub file_info: FileInfo,
    pub query_time_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct TailResponse {
    pub entries: Vec<FormattedEntry>,
    pub total_rows: u64,
    pub query_time_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct ReadResponse {
    pub entries: Vec<FormattedEntry>,
    pub query_time_ms: u64,
}

/// One search match, each entry rendered in the requested format
#[derive(Debug, Serialize)]
pub struct SearchHit {
    pub row_number: u64,
    pub before: Vec<FormattedEntry>,
    #[serde(rename = "match")]
    pub matched: FormattedEntry,
    pub after: Vec<FormattedEntry>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    pub match_count: usize,
    pub query_time_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct JobLogsResponse {
    pub delivery_mode: DeliveryMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_bytes: Option<u64>,
    pub estimated_tokens: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub job: String,
    pub build: String,
}
