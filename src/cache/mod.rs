/// Cached job log snapshots
///
/// The query tools never talk to a log source directly. They ask a
/// [`LogCache`] to resolve a [`JobKey`] into an immutable [`LogSnapshot`],
/// which is then read row by row. Two strategies share the contract:
///
/// - [`FjallCache`] - persistent store on Fjall, downloads through a
///   [`LogSource`](crate::source::LogSource) on a miss or expired entry
/// - [`MemoryCache`] - preloaded in-memory snapshots
///
/// ## Freshness
///
/// A cached copy is reused while it is younger than the requested TTL.
/// `force_refresh` always downloads. Logs of running jobs keep growing, so
/// the default TTL is short (30 seconds).
///
/// ## Usage
///
/// ```rust,ignore
/// use logbox::cache::{FjallCache, JobKey, LogCache, ResolveOptions};
///
/// let cache = FjallCache::open("data/cache", source)?;
/// let snapshot = cache.resolve(&key, ResolveOptions::default()).await?;
/// println!("{} rows", snapshot.info().row_count);
/// ```
pub mod error;
mod memory;
pub mod partitions;
pub mod pruning;
pub mod store;
mod types;

use async_trait::async_trait;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

pub use error::{CacheError, Result};
pub use memory::{MemoryCache, MemorySnapshot};
pub use pruning::PruneStats;
pub use store::{FjallCache, FjallSnapshot, StoreStats};
pub use types::{Direction, JobKey, LogEntry, SnapshotInfo};
pub(crate) use types::clamp_rows;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);

/// Lazy sequence of rows produced by [`LogSnapshot::scan`]
pub type RowIter<'a> = Box<dyn Iterator<Item = Result<LogEntry>> + 'a>;

/// Immutable view of one job's log
pub trait LogSnapshot: Send + Sync {
    /// Metadata recorded when the snapshot was written
    fn info(&self) -> &SnapshotInfo;

    /// Rows within `rows` (clamped to the snapshot), produced on demand in
    /// ascending order for [`Direction::Forward`] and descending otherwise.
    fn scan(&self, rows: Range<u64>, direction: Direction) -> RowIter<'_>;

    fn row_count(&self) -> u64 {
        self.info().row_count
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
    pub ttl: Duration,
    pub force_refresh: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CACHE_TTL,
            force_refresh: false,
        }
    }
}

/// Resolves a job identity into a snapshot handle
#[async_trait]
pub trait LogCache: Send + Sync {
    async fn resolve(&self, key: &JobKey, options: ResolveOptions) -> Result<Arc<dyn LogSnapshot>>;
}
