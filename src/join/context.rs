//! Execution context: query identity, cancellation, early stop
//!
//! The context is cheap to clone and shared between the coordinator, every
//! shard executor, and the downstream operators. Cancellation and the
//! LIMIT early-stop signal are plain shared flags: the executor polls them
//! at its transition points, nothing is interrupted mid-step.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use crate::observability::MetricsRegistry;

/// Cooperative cancellation flag for one query.
///
/// Tripping the token is irreversible; every executor sharing it stops at
/// its next advance transition.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates an untripped token
    pub fn new() -> Self {
        Self::default()
    }

    /// Trips the token
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether the token has been tripped
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Early-stop signal raised by a downstream LIMIT once satisfied.
///
/// Unlike cancellation this is a normal termination: the executor finishes
/// cleanly with no error.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    /// Creates an unraised signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the signal
    pub fn raise(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether the signal has been raised
    pub fn is_raised(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Per-query execution context shared across shard tasks.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Query identity, carried into every log line
    pub query_id: Uuid,
    /// Cancellation token
    pub cancel: CancelToken,
    /// LIMIT early-stop signal
    pub stop: StopSignal,
    /// Shared metrics registry
    pub metrics: Arc<MetricsRegistry>,
}

impl ExecutionContext {
    /// Creates a context with a fresh query id and registry
    pub fn new() -> Self {
        Self::with_metrics(Arc::new(MetricsRegistry::new()))
    }

    /// Creates a context sharing an existing registry
    pub fn with_metrics(metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            query_id: Uuid::new_v4(),
            cancel: CancelToken::new(),
            stop: StopSignal::new(),
            metrics,
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}
