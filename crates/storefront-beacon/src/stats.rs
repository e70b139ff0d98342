//! Atomic delivery counters.
//!
//! All atomics use `Relaxed` ordering: these are monotonic display counters
//! with no synchronization requirements.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

#[derive(Default)]
struct StatsInner {
    hits_sent: AtomicU64,
    delivered: AtomicU64,
    rejected: AtomicU64,
    unreachable: AtomicU64,
}

/// Thread-safe hit counters. Cheap to clone (Arc).
#[derive(Clone, Default)]
pub struct BeaconStats {
    inner: Arc<StatsInner>,
}

/// Snapshot of current counter values, serializable to JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub hits_sent: u64,
    pub delivered: u64,
    pub rejected: u64,
    pub unreachable: u64,
}

impl BeaconStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_sent(&self) {
        self.inner.hits_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_delivered(&self) {
        self.inner.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rejected(&self) {
        self.inner.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_unreachable(&self) {
        self.inner.unreachable.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits_sent: self.inner.hits_sent.load(Ordering::Relaxed),
            delivered: self.inner.delivered.load(Ordering::Relaxed),
            rejected: self.inner.rejected.load(Ordering::Relaxed),
            unreachable: self.inner.unreachable.load(Ordering::Relaxed),
        }
    }
}
