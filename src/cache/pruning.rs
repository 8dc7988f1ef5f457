/// Retention for cached snapshots
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};

use super::error::Result;
use super::partitions::encode_row_prefix;
use super::store::{SnapshotMeta, Tables};

/// Pruning statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PruneStats {
    pub snapshots_pruned: usize,
    pub rows_pruned: usize,
}

/// Remove every snapshot fetched more than `retention` ago, with its rows
pub(crate) fn prune_expired(tables: &Tables, retention: Duration) -> Result<PruneStats> {
    let mut stats = PruneStats::default();
    let now = Utc::now();

    let mut expired = Vec::new();
    for item in tables.snapshots.iter() {
        let (key, value) = item?;
        let meta: SnapshotMeta = serde_json::from_slice(&value)?;
        let age = now.signed_duration_since(meta.info.fetched_at).to_std();
        if matches!(age, Ok(age) if age > retention) {
            expired.push((key, meta));
        }
    }

    for (snapshot_key, meta) in expired {
        let mut batch = tables.keyspace.batch();
        let mut rows = 0;
        for item in tables.rows.prefix(encode_row_prefix(&meta.key)) {
            let (row_key, _) = item?;
            batch.remove(&tables.rows, row_key);
            rows += 1;
        }
        batch.remove(&tables.snapshots, snapshot_key);
        batch.commit()?;

        debug!(job = %meta.key, rows, "Pruned cached log");
        stats.snapshots_pruned += 1;
        stats.rows_pruned += rows;
    }

    tables.keyspace.persist(fjall::PersistMode::SyncAll)?;
    info!("Pruning complete: {:?}", stats);

    Ok(stats)
}
