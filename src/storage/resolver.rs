//! Document resolution and the in-memory store
//!
//! `DocumentResolver` is the only way the join engine obtains full document
//! bodies. `DocumentStore` is the in-memory implementation backing the
//! engine's tests and embedded deployments: collections are `BTreeMap`s
//! keyed by document key, so scans are deterministic.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use serde_json::Value;

use super::document::{Document, DocumentHandle};
use super::errors::{StorageError, StorageResult};

/// Fetches full documents by handle.
///
/// A removed document resolves to `Ok(None)`; only faults below the seam
/// produce errors.
pub trait DocumentResolver: Send + Sync {
    /// Resolve a handle to its current document, if it still exists
    fn resolve(&self, handle: &DocumentHandle) -> StorageResult<Option<Document>>;
}

type Collections = HashMap<String, BTreeMap<String, Value>>;

/// In-memory document store with named collections.
///
/// Writes go through `&self` (interior mutability) so a store can be shared
/// between the index build path and concurrent mutators, mirroring how the
/// engine's transactions mutate data under a running query. Index scans are
/// point-in-time: `collection_scan` copies the collection, and any later
/// `remove` is only visible through `resolve`.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    collections: Arc<RwLock<Collections>>,
}

impl DocumentStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collection if it does not already exist
    pub fn create_collection(&self, name: &str) {
        let mut collections = self.collections.write().expect("store lock poisoned");
        collections.entry(name.to_string()).or_default();
    }

    /// Inserts or replaces a document.
    ///
    /// Object bodies get `_id` and `_key` system attributes injected, the
    /// way the engine exposes them to queries.
    pub fn insert(&self, collection: &str, key: &str, body: Value) {
        let handle = DocumentHandle::new(collection, key);
        let mut body = body;
        if let Value::Object(ref mut map) = body {
            map.insert("_id".to_string(), Value::String(handle.id()));
            map.insert("_key".to_string(), Value::String(key.to_string()));
        }
        let mut collections = self.collections.write().expect("store lock poisoned");
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), body);
    }

    /// Removes a document, returning whether it existed
    pub fn remove(&self, collection: &str, key: &str) -> bool {
        let mut collections = self.collections.write().expect("store lock poisoned");
        collections
            .get_mut(collection)
            .map(|docs| docs.remove(key).is_some())
            .unwrap_or(false)
    }

    /// Number of documents currently in a collection
    pub fn collection_len(&self, collection: &str) -> usize {
        let collections = self.collections.read().expect("store lock poisoned");
        collections.get(collection).map(BTreeMap::len).unwrap_or(0)
    }

    /// Takes a point-in-time scan of a collection in key order.
    ///
    /// This is the snapshot an index build iterates; mutations after the
    /// scan do not affect it.
    pub fn collection_scan(&self, collection: &str) -> StorageResult<Vec<Document>> {
        let collections = self.collections.read().expect("store lock poisoned");
        let docs = collections
            .get(collection)
            .ok_or_else(|| StorageError::UnknownCollection(collection.to_string()))?;
        Ok(docs
            .iter()
            .map(|(key, body)| {
                Document::new(DocumentHandle::new(collection, key.clone()), body.clone())
            })
            .collect())
    }
}

impl DocumentResolver for DocumentStore {
    fn resolve(&self, handle: &DocumentHandle) -> StorageResult<Option<Document>> {
        let collections = self.collections.read().expect("store lock poisoned");
        Ok(collections
            .get(&handle.collection)
            .and_then(|docs| docs.get(&handle.key))
            .map(|body| Document::new(handle.clone(), body.clone())))
    }
}
