//! Sorted-index merge join
//!
//! The operator joins N collections on equality by merging their
//! pre-sorted index streams, with projection pushdown decided once before
//! execution and full-document fetches deferred past LIMIT/SORT wherever
//! the chosen indexes cover the needed attributes.
//!
//! # Execution Pipeline
//!
//! 1. `ProjectionAnalyzer` classifies each participant's attribute accesses
//! 2. `ShardCoordinator` runs one `MergeJoinExecutor` per colocated shard
//! 3. Executors pull `IndexStream` groups and emit `JoinRow`s
//! 4. Downstream SORT/LIMIT narrows the rows, raising the early-stop signal
//! 5. `Materializer` upgrades surviving deferred bindings
//!
//! # Invariants
//!
//! - A row is emitted only when every participant's current key is equal
//! - A duplicate-key group is the unit of skipping and of cross products
//! - ProjectionSets never change during execution
//! - Cursors advance monotonically; nothing rewinds

mod config;
mod context;
mod coordinator;
mod errors;
mod executor;
mod materializer;
mod participant;
mod projection;
mod row;

pub use config::JoinConfig;
pub use context::{CancelToken, ExecutionContext, StopSignal};
pub use coordinator::{ShardCoordinator, ShardedParticipant};
pub use errors::{JoinError, JoinErrorCode, JoinResult, Severity};
pub use executor::{JoinInput, MergeJoinExecutor};
pub use materializer::Materializer;
pub use participant::{IndexParticipant, LocalFilter};
pub use projection::{
    AttributeAccess, AttributeUse, ConsumerPlacement, ProjectionAnalyzer, ProjectionSet,
};
pub use row::{JoinRow, RowBinding};
