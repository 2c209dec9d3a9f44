//! Runtime counters for the recall memory system.
//!
//! Lock-free `AtomicU64` counters incremented on the hot path and read via
//! [`RecallCounters::snapshot`] for dashboards or tests.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters for high-frequency events.
#[derive(Debug)]
pub struct RecallCounters {
    /// Memories stored since startup.
    pub memories_stored: AtomicU64,
    /// Associations created explicitly.
    pub associations_created: AtomicU64,
    /// Retrieval queries answered.
    pub retrievals: AtomicU64,
    /// Consolidation passes completed.
    pub consolidation_passes: AtomicU64,
    /// Pairs scored across all consolidation passes.
    pub pairs_compared: AtomicU64,
    /// Associations inferred by consolidation.
    pub associations_inferred: AtomicU64,
    /// Firings skipped because a pass was still running.
    pub consolidation_skipped: AtomicU64,
    /// Store or retrieval calls over their latency budget.
    pub slow_operations: AtomicU64,
}

impl RecallCounters {
    /// Create a new set of zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            memories_stored: AtomicU64::new(0),
            associations_created: AtomicU64::new(0),
            retrievals: AtomicU64::new(0),
            consolidation_passes: AtomicU64::new(0),
            pairs_compared: AtomicU64::new(0),
            associations_inferred: AtomicU64::new(0),
            consolidation_skipped: AtomicU64::new(0),
            slow_operations: AtomicU64::new(0),
        }
    }

    /// Add `n` to a counter.
    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Increment a counter.
    pub fn incr(counter: &AtomicU64) {
        Self::add(counter, 1);
    }

    /// Snapshot all counters for export.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            memories_stored: self.memories_stored.load(Ordering::Relaxed),
            associations_created: self.associations_created.load(Ordering::Relaxed),
            retrievals: self.retrievals.load(Ordering::Relaxed),
            consolidation_passes: self.consolidation_passes.load(Ordering::Relaxed),
            pairs_compared: self.pairs_compared.load(Ordering::Relaxed),
            associations_inferred: self.associations_inferred.load(Ordering::Relaxed),
            consolidation_skipped: self.consolidation_skipped.load(Ordering::Relaxed),
            slow_operations: self.slow_operations.load(Ordering::Relaxed),
        }
    }
}

impl Default for RecallCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshot of counter values at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Memories stored.
    pub memories_stored: u64,
    /// Associations created explicitly.
    pub associations_created: u64,
    /// Retrieval queries answered.
    pub retrievals: u64,
    /// Consolidation passes completed.
    pub consolidation_passes: u64,
    /// Pairs scored by consolidation.
    pub pairs_compared: u64,
    /// Associations inferred by consolidation.
    pub associations_inferred: u64,
    /// Overlapping firings skipped.
    pub consolidation_skipped: u64,
    /// Operations over budget.
    pub slow_operations: u64,
}
