use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::error::{CacheError, Result};
use super::memory::count_groups;
use super::partitions::{encode_row_key, encode_snapshot_key};
use super::pruning::{PruneStats, prune_expired};
use super::types::{Direction, JobKey, LogEntry, SnapshotInfo, clamp_rows};
use super::{LogCache, LogSnapshot, ResolveOptions, RowIter};
use crate::observability::Metrics;
use crate::source::{LogSource, parse_log};

/// Value stored in the `snapshots` partition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SnapshotMeta {
    pub key: JobKey,
    pub info: SnapshotInfo,
}

/// Partition handles shared with blocking ingest tasks
#[derive(Clone)]
pub(crate) struct Tables {
    pub keyspace: Keyspace,
    pub rows: PartitionHandle,
    pub snapshots: PartitionHandle,
}

type DownloadLocks = StdMutex<HashMap<String, Arc<Mutex<()>>>>;

/// Holds one job's download lock; the map entry is dropped with the last holder
struct DownloadSlot<'a> {
    locks: &'a DownloadLocks,
    path: String,
    lock: Arc<Mutex<()>>,
}

impl Drop for DownloadSlot<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map plus ours
        if locks
            .get(&self.path)
            .is_some_and(|lock| Arc::strong_count(lock) == 2)
        {
            locks.remove(&self.path);
        }
    }
}

/// Fjall-backed cache of parsed job logs
pub struct FjallCache {
    tables: Tables,
    path: PathBuf,
    source: Arc<dyn LogSource>,
    downloads: DownloadLocks,
    metrics: Option<Arc<Metrics>>,
}

impl FjallCache {
    /// Open or create a cache store at the given path
    pub fn open<P: AsRef<Path>>(path: P, source: Arc<dyn LogSource>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening Fjall cache at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;
        let rows = keyspace.open_partition("rows", PartitionCreateOptions::default())?;
        let snapshots = keyspace.open_partition("snapshots", PartitionCreateOptions::default())?;

        info!("Fjall cache opened successfully");
        Ok(Self {
            tables: Tables {
                keyspace,
                rows,
                snapshots,
            },
            path: path.to_path_buf(),
            source,
            downloads: StdMutex::new(HashMap::new()),
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn location(&self, key: &JobKey) -> String {
        format!("{}#{}", self.path.display(), key.path())
    }

    /// Lock serializing downloads of one job
    fn download_slot(&self, key: &JobKey) -> DownloadSlot<'_> {
        let path = key.path();
        let mut locks = self.downloads.lock().unwrap_or_else(PoisonError::into_inner);
        let lock = locks
            .entry(path.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        DownloadSlot {
            locks: &self.downloads,
            path,
            lock,
        }
    }

    /// Open the current snapshot of a job, if one is cached
    fn current(&self, key: &JobKey) -> Result<Option<FjallSnapshot>> {
        let instant = self.tables.keyspace.instant();
        let meta = self
            .tables
            .snapshots
            .snapshot_at(instant)
            .get(encode_snapshot_key(key))
            .map_err(store_error)?;

        match meta {
            Some(value) => {
                let meta: SnapshotMeta = serde_json::from_slice(&value)?;
                Ok(Some(FjallSnapshot {
                    key: meta.key,
                    info: meta.info,
                    rows: self.tables.rows.snapshot_at(instant),
                }))
            }
            None => Ok(None),
        }
    }

    async fn refresh(&self, key: &JobKey) -> Result<FjallSnapshot> {
        info!(job = %key, "Downloading job log");
        let raw = self.source.fetch(key).await?;
        if let Some(metrics) = &self.metrics {
            metrics.cache_download();
        }

        let tables = self.tables.clone();
        let location = self.location(key);
        let key = key.clone();
        tokio::task::spawn_blocking(move || ingest(&tables, key, location, raw))
            .await
            .map_err(|e| CacheError::Task(e.to_string()))?
    }

    /// Remove snapshots fetched longer than `retention` ago
    pub fn prune_expired(&self, retention: Duration) -> Result<PruneStats> {
        info!("Starting pruning process");
        let stats = prune_expired(&self.tables, retention)?;
        info!("Pruning completed: {:?}", stats);
        Ok(stats)
    }

    /// Persist all pending writes to disk
    pub fn persist(&self) -> Result<()> {
        self.tables.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }

    /// Get internal statistics (for debugging/monitoring)
    pub fn stats(&self) -> Result<StoreStats> {
        let mut snapshot_count = 0;
        let mut row_count = 0;

        for item in self.tables.snapshots.iter() {
            item?;
            snapshot_count += 1;
        }

        for item in self.tables.rows.iter() {
            item?;
            row_count += 1;
        }

        Ok(StoreStats {
            snapshot_count,
            row_count,
        })
    }
}

#[async_trait]
impl LogCache for FjallCache {
    async fn resolve(&self, key: &JobKey, options: ResolveOptions) -> Result<Arc<dyn LogSnapshot>> {
        let slot = self.download_slot(key);
        let _guard = slot.lock.lock().await;

        if !options.force_refresh {
            if let Some(snapshot) = self.current(key)? {
                if is_fresh(&snapshot.info, options.ttl) {
                    debug!(job = %key, rows = snapshot.info.row_count, "Cache hit");
                    if let Some(metrics) = &self.metrics {
                        metrics.cache_hit();
                    }
                    return Ok(Arc::new(snapshot));
                }
                debug!(job = %key, "Cached log expired");
            }
        }

        let snapshot = self.refresh(key).await?;
        Ok(Arc::new(snapshot))
    }
}

fn is_fresh(info: &SnapshotInfo, ttl: Duration) -> bool {
    match Utc::now().signed_duration_since(info.fetched_at).to_std() {
        Ok(age) => age < ttl,
        // fetched_at in the future
        Err(_) => true,
    }
}

/// Parse a raw log and replace the job's rows and metadata in one batch
fn ingest(tables: &Tables, key: JobKey, location: String, raw: Bytes) -> Result<FjallSnapshot> {
    let entries = parse_log(&raw);
    let row_count = entries.len() as u64;

    let previous_rows = match tables.snapshots.get(encode_snapshot_key(&key))? {
        Some(value) => serde_json::from_slice::<SnapshotMeta>(&value)?.info.row_count,
        None => 0,
    };

    let info = SnapshotInfo {
        row_count,
        byte_size: raw.len() as u64,
        location,
        fetched_at: Utc::now(),
        group_count: count_groups(&entries),
        command_count: entries.iter().filter(|e| e.is_command).count() as u64,
    };

    let mut batch = tables.keyspace.batch();
    for entry in &entries {
        batch.insert(
            &tables.rows,
            encode_row_key(&key, entry.row_number),
            serde_json::to_vec(entry)?,
        );
    }
    for row in row_count..previous_rows {
        batch.remove(&tables.rows, encode_row_key(&key, row));
    }
    let meta = SnapshotMeta {
        key: key.clone(),
        info: info.clone(),
    };
    batch.insert(
        &tables.snapshots,
        encode_snapshot_key(&key),
        serde_json::to_vec(&meta)?,
    );
    batch.commit()?;

    info!(job = %key, rows = row_count, bytes = info.byte_size, "Cached job log");

    let instant = tables.keyspace.instant();
    Ok(FjallSnapshot {
        key,
        info,
        rows: tables.rows.snapshot_at(instant),
    })
}

pub(crate) fn store_error<E: fmt::Display>(error: E) -> CacheError {
    CacheError::Store(error.to_string())
}

fn decode_row<K, V: AsRef<[u8]>, E: fmt::Display>(
    item: std::result::Result<(K, V), E>,
) -> Result<LogEntry> {
    let (_, value) = item.map_err(store_error)?;
    Ok(serde_json::from_slice(value.as_ref())?)
}

/// Point-in-time view of one job's rows
pub struct FjallSnapshot {
    key: JobKey,
    info: SnapshotInfo,
    rows: fjall::Snapshot,
}

impl LogSnapshot for FjallSnapshot {
    fn info(&self) -> &SnapshotInfo {
        &self.info
    }

    fn scan(&self, rows: Range<u64>, direction: Direction) -> RowIter<'_> {
        let rows = clamp_rows(rows, self.info.row_count);
        if rows.is_empty() {
            return Box::new(std::iter::empty());
        }

        let range = encode_row_key(&self.key, rows.start)..encode_row_key(&self.key, rows.end);
        let iter = self.rows.range(range);
        match direction {
            Direction::Forward => Box::new(iter.map(decode_row)),
            Direction::Backward => Box::new(iter.rev().map(decode_row)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreStats {
    pub snapshot_count: usize,
    pub row_count: usize,
}
