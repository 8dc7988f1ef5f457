//! Process-wide counters exposed on `/operators/metrics`

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics handle for recording counters
#[derive(Debug, Default)]
pub struct Metrics {
    tool_calls: AtomicU64,
    soft_errors: AtomicU64,
    file_deliveries: AtomicU64,
    cache_hits: AtomicU64,
    cache_downloads: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tool_called(&self) {
        self.tool_calls.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "tool_calls", "Metric incremented");
    }

    pub fn soft_error(&self) {
        self.soft_errors.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "soft_errors", "Metric incremented");
    }

    pub fn file_delivered(&self) {
        self.file_deliveries.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "file_deliveries", "Metric incremented");
    }

    pub fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "cache_hits", "Metric incremented");
    }

    pub fn cache_download(&self) {
        self.cache_downloads.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "cache_downloads", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tool_calls: self.tool_calls.load(Ordering::Relaxed),
            soft_errors: self.soft_errors.load(Ordering::Relaxed),
            file_deliveries: self.file_deliveries.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_downloads: self.cache_downloads.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub tool_calls: u64,
    pub soft_errors: u64,
    pub file_deliveries: u64,
    pub cache_hits: u64,
    pub cache_downloads: u64,
}
