//! Sorted secondary indexes for the join engine
//!
//! Indexes are derived, in-memory state built from a point-in-time
//! collection scan; they are never the source of truth.
//!
//! # Design Principles
//!
//! - Deterministic: entries sorted by typed key, ties broken by handle
//! - Typed keys: total order Null < Bool < Int < Float < String
//! - Streaming: consumers iterate through `IndexStream` cursors that move
//!   in whole duplicate-key groups and never rewind

mod cursor;
mod errors;
mod key;
mod sorted;

pub use cursor::{IndexStream, SortDirection, SortedIndexCursor};
pub use errors::{IndexError, IndexErrorCode, IndexResult};
pub use key::{IndexKey, SortKey};
pub use sorted::{IndexDescriptor, IndexEntry, KeyRange, SortedIndex};
