use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Engine usage counters, owned by the service that records them
#[derive(Debug, Default)]
pub struct EngineMetrics {
    pub orders_created: AtomicU64,
    pub conflicts_detected: AtomicU64,
    pub transitions_applied: AtomicU64,
    pub transitions_rejected: AtomicU64,
    pub stale_writes: AtomicU64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_created(&self, conflicted: bool) {
        self.orders_created.fetch_add(1, Ordering::Relaxed);
        if conflicted {
            self.conflicts_detected.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_transition(&self) {
        self.transitions_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_transition(&self) {
        self.transitions_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_write(&self) {
        self.stale_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> EngineStats {
        EngineStats {
            orders_created: self.orders_created.load(Ordering::Relaxed),
            conflicts_detected: self.conflicts_detected.load(Ordering::Relaxed),
            transitions_applied: self.transitions_applied.load(Ordering::Relaxed),
            transitions_rejected: self.transitions_rejected.load(Ordering::Relaxed),
            stale_writes: self.stale_writes.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Work order metrics: created={}, conflicts={}, transitions={}, rejected={}, stale={}",
            stats.orders_created,
            stats.conflicts_detected,
            stats.transitions_applied,
            stats.transitions_rejected,
            stats.stale_writes
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineStats {
    pub orders_created: u64,
    pub conflicts_detected: u64,
    pub transitions_applied: u64,
    pub transitions_rejected: u64,
    pub stale_writes: u64,
}

/// Time an operation and log its duration when finished
pub struct OperationTimer {
    operation: &'static str,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis() as u64,
            "Operation completed"
        );
    }
}
