use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use super::error::{CacheError, Result};
use super::types::{Direction, JobKey, LogEntry, SnapshotInfo, clamp_rows};
use super::{LogCache, LogSnapshot, ResolveOptions, RowIter};
use crate::source::parse_log;

/// Snapshot over rows held in memory
#[derive(Debug)]
pub struct MemorySnapshot {
    entries: Vec<LogEntry>,
    info: SnapshotInfo,
}

impl MemorySnapshot {
    /// Rows are renumbered from zero so the row numbers stay gapless
    pub fn new(key: &JobKey, entries: Vec<LogEntry>) -> Self {
        let entries: Vec<LogEntry> = entries
            .into_iter()
            .enumerate()
            .map(|(row, entry)| LogEntry {
                row_number: row as u64,
                ..entry
            })
            .collect();

        let byte_size = entries.iter().map(|e| e.content.len() as u64 + 1).sum();
        let info = SnapshotInfo {
            row_count: entries.len() as u64,
            byte_size,
            location: format!("memory://{}", key.path()),
            fetched_at: Utc::now(),
            group_count: count_groups(&entries),
            command_count: entries.iter().filter(|e| e.is_command).count() as u64,
        };

        Self { entries, info }
    }

    /// Parses a raw log body; `byte_size` reports the raw length
    pub fn from_raw(key: &JobKey, raw: &[u8]) -> Self {
        let mut snapshot = Self::new(key, parse_log(raw));
        snapshot.info.byte_size = raw.len() as u64;
        snapshot
    }

    pub fn from_lines<S: AsRef<str>>(key: &JobKey, lines: &[S]) -> Self {
        let entries = lines
            .iter()
            .map(|line| LogEntry {
                row_number: 0,
                timestamp: None,
                group: None,
                content: line.as_ref().to_string(),
                is_command: false,
            })
            .collect();
        Self::new(key, entries)
    }
}

/// Number of distinct group sections, counting a section each time the label changes
pub(crate) fn count_groups(entries: &[LogEntry]) -> u64 {
    let mut count = 0;
    let mut current: Option<&str> = None;
    for entry in entries {
        let group = entry.group.as_deref();
        if group.is_some() && group != current {
            count += 1;
        }
        current = group;
    }
    count
}

impl LogSnapshot for MemorySnapshot {
    fn info(&self) -> &SnapshotInfo {
        &self.info
    }

    fn scan(&self, rows: Range<u64>, direction: Direction) -> RowIter<'_> {
        let rows = clamp_rows(rows, self.info.row_count);
        let slice = &self.entries[rows.start as usize..rows.end as usize];
        match direction {
            Direction::Forward => Box::new(slice.iter().cloned().map(Ok)),
            Direction::Backward => Box::new(slice.iter().rev().cloned().map(Ok)),
        }
    }
}

/// In-memory cache of preloaded snapshots.
///
/// TTL and force-refresh have no effect since nothing backs the entries.
#[derive(Default)]
pub struct MemoryCache {
    snapshots: RwLock<HashMap<JobKey, Arc<MemorySnapshot>>>,
    resolutions: AtomicUsize,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: JobKey, snapshot: MemorySnapshot) {
        let mut snapshots = self
            .snapshots
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        snapshots.insert(key, Arc::new(snapshot));
    }

    pub fn insert_raw(&self, key: JobKey, raw: &[u8]) {
        let snapshot = MemorySnapshot::from_raw(&key, raw);
        self.insert(key, snapshot);
    }

    /// Number of `resolve` calls served so far
    pub fn resolutions(&self) -> usize {
        self.resolutions.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl LogCache for MemoryCache {
    async fn resolve(&self, key: &JobKey, _options: ResolveOptions) -> Result<Arc<dyn LogSnapshot>> {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        let snapshots = self
            .snapshots
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        snapshots
            .get(key)
            .cloned()
            .map(|snapshot| snapshot as Arc<dyn LogSnapshot>)
            .ok_or_else(|| CacheError::SnapshotNotFound(key.to_string()))
    }
}
