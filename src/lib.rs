//! cairndb - sorted-index merge-join execution for a document database
//!
//! The crate implements the index-join execution path of the query engine:
//! sorted secondary-index streams, projection pushdown with late
//! materialization, a multi-way sort-merge executor, and shard-colocated
//! fan-out. Plan selection, query parsing, and the network layer live
//! outside this crate and interact with it only through the seams in
//! `storage` and `join`.

pub mod index;
pub mod join;
pub mod observability;
pub mod storage;
