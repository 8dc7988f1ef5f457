//! Log query engine
//!
//! Read-only operations over a [`LogSnapshot`]. Every operation returns a lazy
//! iterator so callers stop pulling rows as soon as they have enough, and
//! every row pulled first checks the request's [`CancellationToken`].

mod search;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::cache::{CacheError, Direction, LogEntry, LogSnapshot, SnapshotInfo};

pub use search::{SearchOptions, SearchQuery, SearchResult, search};

/// Rows returned by `tail` when the caller asks for zero or fewer
pub const DEFAULT_TAIL: u64 = 10;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Failed to create log reader: {0}")]
    Cache(#[from] CacheError),

    #[error("query cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, QueryError>;

/// Static metadata of a snapshot
pub fn info(snapshot: &dyn LogSnapshot) -> SnapshotInfo {
    snapshot.info().clone()
}

/// Last `n` rows in ascending order; `n <= 0` means [`DEFAULT_TAIL`]
pub fn tail<'a>(
    snapshot: &'a dyn LogSnapshot,
    n: i64,
    cancel: &'a CancellationToken,
) -> impl Iterator<Item = Result<LogEntry>> + 'a {
    let n = if n <= 0 { DEFAULT_TAIL } else { n as u64 };
    let total = snapshot.row_count();
    let start = total.saturating_sub(n);
    Checked::new(snapshot.scan(start..total, Direction::Forward), cancel)
}

/// Forward read from row `seek`, at most `limit` rows (0 = no limit)
pub fn read<'a>(
    snapshot: &'a dyn LogSnapshot,
    seek: u64,
    limit: u64,
    cancel: &'a CancellationToken,
) -> impl Iterator<Item = Result<LogEntry>> + 'a {
    let rows = Checked::new(snapshot.scan(seek..u64::MAX, Direction::Forward), cancel);
    rows.take(limit_to_count(limit))
}

pub(crate) fn limit_to_count(limit: u64) -> usize {
    if limit == 0 {
        usize::MAX
    } else {
        usize::try_from(limit).unwrap_or(usize::MAX)
    }
}

/// Stops a row stream at cancellation or at the first storage error
pub(crate) struct Checked<'a, I> {
    inner: I,
    cancel: &'a CancellationToken,
    done: bool,
}

impl<'a, I> Checked<'a, I> {
    pub(crate) fn new(inner: I, cancel: &'a CancellationToken) -> Self {
        Self {
            inner,
            cancel,
            done: false,
        }
    }
}

impl<I, T> Iterator for Checked<'_, I>
where
    I: Iterator<Item = std::result::Result<T, CacheError>>,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.cancel.is_cancelled() {
            self.done = true;
            return Some(Err(QueryError::Cancelled));
        }
        match self.inner.next()? {
            Ok(item) => Some(Ok(item)),
            Err(e) => {
                self.done = true;
                Some(Err(e.into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{JobKey, MemorySnapshot};

    fn snapshot(rows: usize) -> MemorySnapshot {
        let lines: Vec<String> = (0..rows).map(|i| format!("line {}", i)).collect();
        MemorySnapshot::from_lines(&JobKey::new("acme", "web", "1", "job"), &lines)
    }

    fn rows(iter: impl Iterator<Item = Result<LogEntry>>) -> Vec<u64> {
        iter.map(|e| e.unwrap().row_number).collect()
    }

    #[test]
    fn test_tail_returns_last_rows_in_order() {
        let snapshot = snapshot(1000);
        let cancel = CancellationToken::new();
        assert_eq!(rows(tail(&snapshot, 5, &cancel)), vec![995, 996, 997, 998, 999]);
    }

    #[test]
    fn test_tail_bounds() {
        let snapshot = snapshot(25);
        let cancel = CancellationToken::new();
        for n in [-3i64, 0, 1, 10, 24, 25, 26, 1000] {
            let got = rows(tail(&snapshot, n, &cancel));
            let expected = if n <= 0 { 10 } else { (n as usize).min(25) };
            assert_eq!(got.len(), expected, "tail({})", n);
            assert_eq!(got.last(), Some(&24));
            assert!(got.windows(2).all(|w| w[1] == w[0] + 1));
        }
    }

    #[test]
    fn test_tail_empty_log() {
        let snapshot = snapshot(0);
        let cancel = CancellationToken::new();
        assert!(rows(tail(&snapshot, 5, &cancel)).is_empty());
    }

    #[test]
    fn test_read_bounds() {
        let snapshot = snapshot(50);
        let cancel = CancellationToken::new();
        for (seek, limit) in [(0u64, 10u64), (45, 10), (10, 0), (49, 1), (50, 5), (70, 0)] {
            let got = rows(read(&snapshot, seek, limit, &cancel));
            let available = 50u64.saturating_sub(seek);
            let expected = if limit == 0 { available } else { available.min(limit) };
            assert_eq!(got.len() as u64, expected, "read({}, {})", seek, limit);
            if let Some(first) = got.first() {
                assert_eq!(*first, seek);
            }
        }
    }

    #[test]
    fn test_read_is_lazy() {
        let snapshot = snapshot(100_000);
        let cancel = CancellationToken::new();
        let mut iter = read(&snapshot, 0, 0, &cancel);
        assert_eq!(iter.next().unwrap().unwrap().row_number, 0);
        assert_eq!(iter.next().unwrap().unwrap().row_number, 1);
    }

    #[test]
    fn test_cancellation_stops_scan() {
        let snapshot = snapshot(100);
        let cancel = CancellationToken::new();
        let mut iter = read(&snapshot, 0, 0, &cancel);
        assert!(iter.next().unwrap().is_ok());

        cancel.cancel();
        assert!(matches!(iter.next(), Some(Err(QueryError::Cancelled))));
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_info_is_static() {
        let snapshot = snapshot(3);
        let first = info(&snapshot);
        let cancel = CancellationToken::new();
        let _ = rows(read(&snapshot, 0, 0, &cancel));
        assert_eq!(info(&snapshot), first);
        assert_eq!(first.row_count, 3);
    }
}
