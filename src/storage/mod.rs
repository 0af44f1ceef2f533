//! Storage seam for the join engine
//!
//! The join operator never touches disk; it sees storage through two
//! contracts:
//!
//! - `DocumentResolver` - fetch a full document by handle
//! - `DocumentStore` - in-memory collection store used by embedders and
//!   tests; indexes are built from a point-in-time scan, the resolver reads
//!   live state
//!
//! # Design Principles
//!
//! - Handles are stable identities (`collection/key`), values are JSON
//! - Resolution of a removed document is a miss, never an error
//! - Snapshot isolation for index scans comes from the index owning its
//!   entries; the store itself is freely mutable between scan and resolve

mod document;
mod errors;
mod resolver;

pub use document::{attribute_path, Document, DocumentHandle};
pub use errors::{StorageError, StorageResult};
pub use resolver::{DocumentResolver, DocumentStore};
