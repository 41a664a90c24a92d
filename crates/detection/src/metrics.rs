//! Counters for the detection loop, shared with the HTTP health endpoint.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ManagerState {
    Running,
    Stopped,
}

#[derive(Debug, Default)]
pub struct DetectionMetrics {
    running: AtomicBool,
    processed: AtomicU64,
    flagged: AtomicU64,
    dropped: AtomicU64,
    persist_failures: AtomicU64,
}

/// Point-in-time copy of [`DetectionMetrics`].
///
/// `flagged` counts only verdicts that reached the store. A suspicious verdict
/// whose write failed is counted in `persist_failures` alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub state: ManagerState,
    pub processed: u64,
    pub flagged: u64,
    pub dropped: u64,
    pub persist_failures: u64,
}

impl DetectionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ManagerState {
        if self.running.load(Ordering::Acquire) {
            ManagerState::Running
        } else {
            ManagerState::Stopped
        }
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    pub(crate) fn record_clean(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_flagged(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        self.flagged.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_persist_failure(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        self.persist_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            state: self.state(),
            processed: self.processed.load(Ordering::Relaxed),
            flagged: self.flagged.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
        }
    }
}
