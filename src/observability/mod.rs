//! Observability for join execution
//!
//! # Principles
//!
//! 1. Observability is read-only: no side effects on execution
//! 2. Deterministic output: sorted log fields, exact counters
//! 3. No async, no background threads
//!
//! The logger emits one JSON object per line with deterministic key
//! ordering; the metrics registry is a set of monotonic counters shared
//! across the executors of one engine instance.

mod logger;
mod metrics;
mod scope;

pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::ObservationScope;
