//! Sorted secondary indexes built from collection scans
//!
//! A `SortedIndex` owns its entries: it is the stable view a join scans,
//! regardless of what happens to the store afterwards. Entries are sorted
//! by typed key with handle tie-break, so iteration order is deterministic
//! and duplicate-key groups are contiguous.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::storage::{attribute_path, DocumentHandle, DocumentStore};

use super::cursor::{SortDirection, SortedIndexCursor};
use super::errors::{IndexError, IndexResult};
use super::key::{IndexKey, SortKey};

/// Describes one index: its key fields, uniqueness, and the extra
/// attributes stored alongside each entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    /// Index name
    pub name: String,
    /// Indexed attribute paths, in key order
    pub fields: Vec<String>,
    /// Whether keys are unique across the collection
    pub unique: bool,
    /// Non-key attributes stored in each entry (covering projections)
    pub stored_fields: Vec<String>,
    /// Whether this is the collection's primary index
    pub primary: bool,
}

impl IndexDescriptor {
    /// A non-unique sorted index over the given fields
    pub fn sorted(name: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            name: name.into(),
            fields,
            unique: false,
            stored_fields: Vec::new(),
            primary: false,
        }
    }

    /// A unique sorted index over the given fields
    pub fn unique(name: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            unique: true,
            ..Self::sorted(name, fields)
        }
    }

    /// The collection's primary index (unique over `_key`)
    pub fn primary() -> Self {
        Self {
            name: "primary".to_string(),
            fields: vec!["_key".to_string()],
            unique: true,
            stored_fields: Vec::new(),
            primary: true,
        }
    }

    /// Adds stored (covering) fields
    pub fn with_stored_fields(mut self, fields: Vec<String>) -> Self {
        self.stored_fields = fields;
        self
    }

    /// Whether key fields plus stored fields cover every given attribute
    pub fn covers<'a>(&self, attributes: impl IntoIterator<Item = &'a String>) -> bool {
        attributes.into_iter().all(|attr| {
            self.fields.iter().any(|f| f == attr) || self.stored_fields.iter().any(|f| f == attr)
        })
    }
}

/// One index entry: document handle, sort key, and the captured values of
/// key and stored fields.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// Handle of the indexed document
    pub handle: DocumentHandle,
    /// Typed sort key, one component per indexed field
    pub key: SortKey,
    /// Values of key fields and stored fields, captured at build time
    values: Map<String, Value>,
}

impl IndexEntry {
    /// Creates an entry from its parts (used by cursors and tests)
    pub fn new(handle: DocumentHandle, key: SortKey, values: Map<String, Value>) -> Self {
        Self {
            handle,
            key,
            values,
        }
    }

    /// Value of a covered field, if captured
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Builds a projection object from the requested fields.
    ///
    /// Fields not captured in the entry project as null; callers only ask
    /// for fields the descriptor covers.
    pub fn project<'a>(&self, fields: impl IntoIterator<Item = &'a String>) -> Value {
        let mut out = Map::new();
        for field in fields {
            let value = self.values.get(field).cloned().unwrap_or(Value::Null);
            out.insert(field.clone(), value);
        }
        Value::Object(out)
    }
}

/// Inclusive key range restricting a cursor
#[derive(Debug, Clone, Default)]
pub struct KeyRange {
    /// Lowest admitted key, unbounded if None
    pub min: Option<SortKey>,
    /// Highest admitted key, unbounded if None
    pub max: Option<SortKey>,
}

impl KeyRange {
    /// The unbounded range
    pub fn all() -> Self {
        Self::default()
    }
}

/// A sorted secondary index over one collection (or one shard of it).
#[derive(Debug)]
pub struct SortedIndex {
    descriptor: IndexDescriptor,
    collection: String,
    entries: Vec<IndexEntry>,
}

impl SortedIndex {
    /// Builds the index from a point-in-time scan of the collection.
    ///
    /// Documents whose key fields hold arrays or objects are not indexable
    /// and are skipped; missing attributes index as null. A duplicate key
    /// in a unique index fails the build.
    pub fn build(
        descriptor: IndexDescriptor,
        collection: &str,
        store: &DocumentStore,
    ) -> IndexResult<Self> {
        let docs = store
            .collection_scan(collection)
            .map_err(|e| IndexError::build_failed(&descriptor.name, e.to_string()))?;

        let mut entries = Vec::with_capacity(docs.len());
        'docs: for doc in docs {
            let mut components = Vec::with_capacity(descriptor.fields.len());
            let mut values = Map::new();
            for field in &descriptor.fields {
                let raw = attribute_path(&doc.body, field)
                    .cloned()
                    .unwrap_or(Value::Null);
                match IndexKey::from_json(&raw) {
                    Some(component) => components.push(component),
                    None => continue 'docs,
                }
                values.insert(field.clone(), raw);
            }
            for field in &descriptor.stored_fields {
                let raw = attribute_path(&doc.body, field).cloned().unwrap_or(Value::Null);
                values.insert(field.clone(), raw);
            }
            entries.push(IndexEntry::new(doc.handle, SortKey(components), values));
        }

        entries.sort_by(|a, b| a.key.cmp(&b.key).then_with(|| a.handle.cmp(&b.handle)));

        if descriptor.unique {
            for pair in entries.windows(2) {
                if pair[0].key == pair[1].key {
                    return Err(IndexError::unique_violation(
                        &descriptor.name,
                        format!("{:?}", pair[0].key),
                    ));
                }
            }
        }

        Ok(Self {
            descriptor,
            collection: collection.to_string(),
            entries,
        })
    }

    /// The index descriptor
    pub fn descriptor(&self) -> &IndexDescriptor {
        &self.descriptor
    }

    /// The indexed collection (or shard) name
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries slice, ascending by (key, handle)
    pub(crate) fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Opens a cursor over the whole index
    pub fn open_cursor(self: Arc<Self>, direction: SortDirection) -> SortedIndexCursor {
        self.open_cursor_range(direction, KeyRange::all())
    }

    /// Opens a cursor restricted to an inclusive key range
    pub fn open_cursor_range(
        self: Arc<Self>,
        direction: SortDirection,
        range: KeyRange,
    ) -> SortedIndexCursor {
        let lo = match &range.min {
            Some(min) => self.entries.partition_point(|e| e.key < *min),
            None => 0,
        };
        let hi = match &range.max {
            Some(max) => self.entries.partition_point(|e| e.key <= *max),
            None => self.entries.len(),
        };
        let hi = hi.max(lo);
        SortedIndexCursor::new(self, direction, lo, hi)
    }
}
