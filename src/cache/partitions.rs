/// Key layout and encoding utilities for Fjall partitions
///
/// Partition structure (job path segments are percent-encoded, see [`JobKey::path`]):
/// - `rows`: row:{org}/{pipeline}/{build}/{job}:{row:016} -> LogEntry (JSON)
/// - `snapshots`: snap:{org}/{pipeline}/{build}/{job} -> SnapshotMeta (JSON)
use super::types::JobKey;

/// Encode a row key: row:{job_path}:{row:016}
pub fn encode_row_key(key: &JobKey, row: u64) -> Vec<u8> {
    format!("row:{}:{:016}", key.path(), row).into_bytes()
}

/// Encode a row prefix for range scans: row:{job_path}:
pub fn encode_row_prefix(key: &JobKey) -> Vec<u8> {
    format!("row:{}:", key.path()).into_bytes()
}

/// Decode the row number from a row key
pub fn decode_row_number(key: &[u8]) -> Option<u64> {
    let key_str = std::str::from_utf8(key).ok()?;
    let (_, row) = key_str.rsplit_once(':')?;
    row.parse().ok()
}

/// Encode a snapshot metadata key: snap:{job_path}
pub fn encode_snapshot_key(key: &JobKey) -> Vec<u8> {
    format!("snap:{}", key.path()).into_bytes()
}
