use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Identity of one job's log stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobKey {
    pub org: String,
    pub pipeline: String,
    pub build: String,
    pub job: String,
}

impl JobKey {
    pub fn new(
        org: impl Into<String>,
        pipeline: impl Into<String>,
        build: impl Into<String>,
        job: impl Into<String>,
    ) -> Self {
        Self {
            org: org.into(),
            pipeline: pipeline.into(),
            build: build.into(),
            job: job.into(),
        }
    }

    pub fn segments(&self) -> [&str; 4] {
        [
            self.org.as_str(),
            self.pipeline.as_str(),
            self.build.as_str(),
            self.job.as_str(),
        ]
    }

    /// Storage form: each segment percent-encoded, then slash-joined.
    ///
    /// Encoded segments never contain `/` or `:`, so distinct keys never
    /// share a path and a path is never a prefix of another key's rows.
    pub fn path(&self) -> String {
        self.segments()
            .iter()
            .map(|segment| urlencoding::encode(segment))
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.org, self.pipeline, self.build, self.job)
    }
}

/// One row of a job log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub row_number: u64,
    /// Unix milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub content: String,
    #[serde(default)]
    pub is_command: bool,
}

/// Static metadata recorded when a snapshot is written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    pub row_count: u64,
    pub byte_size: u64,
    pub location: String,
    pub fetched_at: DateTime<Utc>,
    pub group_count: u64,
    pub command_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Clamp a requested row range to `[0, total)`
pub(crate) fn clamp_rows(rows: Range<u64>, total: u64) -> Range<u64> {
    let end = rows.end.min(total);
    let start = rows.start.min(end);
    start..end
}
