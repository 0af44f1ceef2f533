//! Metrics registry for join execution
//!
//! - Counters only, monotonic increase
//! - Reset only when the registry is dropped
//! - Thread-safe via relaxed atomics (exact totals, eventual visibility)

use std::sync::atomic::{AtomicU64, Ordering};

/// Operational counters for the join engine.
///
/// One registry is shared by every executor and shard task of an engine
/// instance through the execution context.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Joins run to completion
    queries_executed: AtomicU64,
    /// Joins terminated by cancellation
    queries_killed: AtomicU64,
    /// Join rows handed to downstream operators
    rows_emitted: AtomicU64,
    /// Duplicate-key groups matched across all participants
    groups_matched: AtomicU64,
    /// Full documents fetched (immediate and late materialization)
    documents_fetched: AtomicU64,
    /// Rows dropped because a deferred document vanished
    rows_dropped_missing: AtomicU64,
    /// Per-shard executor tasks spawned
    shard_tasks: AtomicU64,
}

impl MetricsRegistry {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment completed joins
    pub fn increment_queries_executed(&self) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment cancelled joins
    pub fn increment_queries_killed(&self) {
        self.queries_killed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment emitted rows
    pub fn increment_rows_emitted(&self) {
        self.rows_emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment matched duplicate-key groups
    pub fn increment_groups_matched(&self) {
        self.groups_matched.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment full-document fetches
    pub fn increment_documents_fetched(&self) {
        self.documents_fetched.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment rows dropped on a late-materialization miss
    pub fn increment_rows_dropped_missing(&self) {
        self.rows_dropped_missing.fetch_add(1, Ordering::Relaxed);
    }

    /// Add spawned shard tasks
    pub fn add_shard_tasks(&self, count: u64) {
        self.shard_tasks.fetch_add(count, Ordering::Relaxed);
    }

    /// Current number of full-document fetches
    pub fn documents_fetched(&self) -> u64 {
        self.documents_fetched.load(Ordering::Relaxed)
    }

    /// Current number of emitted rows
    pub fn rows_emitted(&self) -> u64 {
        self.rows_emitted.load(Ordering::Relaxed)
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries_executed: self.queries_executed.load(Ordering::Relaxed),
            queries_killed: self.queries_killed.load(Ordering::Relaxed),
            rows_emitted: self.rows_emitted.load(Ordering::Relaxed),
            groups_matched: self.groups_matched.load(Ordering::Relaxed),
            documents_fetched: self.documents_fetched.load(Ordering::Relaxed),
            rows_dropped_missing: self.rows_dropped_missing.load(Ordering::Relaxed),
            shard_tasks: self.shard_tasks.load(Ordering::Relaxed),
        }
    }

    /// Get current metrics as JSON
    pub fn to_json(&self) -> String {
        let s = self.snapshot();
        format!(
            r#"{{"queries_executed":{},"queries_killed":{},"rows_emitted":{},"groups_matched":{},"documents_fetched":{},"rows_dropped_missing":{},"shard_tasks":{}}}"#,
            s.queries_executed,
            s.queries_killed,
            s.rows_emitted,
            s.groups_matched,
            s.documents_fetched,
            s.rows_dropped_missing,
            s.shard_tasks,
        )
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queries_executed: u64,
    pub queries_killed: u64,
    pub rows_emitted: u64,
    pub groups_matched: u64,
    pub documents_fetched: u64,
    pub rows_dropped_missing: u64,
    pub shard_tasks: u64,
}
