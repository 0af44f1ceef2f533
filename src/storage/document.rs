//! Document identities and attribute access
//!
//! A document is addressed by a handle, `collection/key`. The engine keeps
//! handles and bodies separate: index entries and deferred join bindings
//! carry handles, full bodies only exist where a fetch actually happened.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable identity of a document: collection name plus document key.
///
/// The textual form is `collection/key` and is what user queries see as the
/// `_id` attribute.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentHandle {
    /// Collection the document lives in
    pub collection: String,
    /// Document key, unique within the collection
    pub key: String,
}

impl DocumentHandle {
    /// Creates a handle from collection and key
    pub fn new(collection: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            key: key.into(),
        }
    }

    /// Returns the `collection/key` identifier
    pub fn id(&self) -> String {
        format!("{}/{}", self.collection, self.key)
    }

    /// Parses a `collection/key` identifier.
    ///
    /// Returns None if the input has no `/` separator or an empty part.
    pub fn parse(id: &str) -> Option<Self> {
        let (collection, key) = id.split_once('/')?;
        if collection.is_empty() || key.is_empty() {
            return None;
        }
        Some(Self::new(collection, key))
    }
}

impl fmt::Display for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.key)
    }
}

/// A resolved document: handle plus JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Identity of the document
    pub handle: DocumentHandle,
    /// Document body
    pub body: Value,
}

impl Document {
    /// Creates a document
    pub fn new(handle: DocumentHandle, body: Value) -> Self {
        Self { handle, body }
    }

    /// Reads an attribute by dotted path
    pub fn attribute(&self, path: &str) -> Option<&Value> {
        attribute_path(&self.body, path)
    }
}

/// Resolves a dotted attribute path (`a.b.c`) against a JSON value.
///
/// Returns None if any segment is missing or a non-object is traversed.
pub fn attribute_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_handle_roundtrip() {
        let handle = DocumentHandle::new("users", "alice");
        assert_eq!(handle.id(), "users/alice");
        assert_eq!(DocumentHandle::parse("users/alice"), Some(handle));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(DocumentHandle::parse("users"), None);
        assert_eq!(DocumentHandle::parse("/alice"), None);
        assert_eq!(DocumentHandle::parse("users/"), None);
    }

    #[test]
    fn test_parse_keeps_extra_separators_in_key() {
        // Keys may themselves contain '/'; only the first separator splits.
        let handle = DocumentHandle::parse("users/a/b").unwrap();
        assert_eq!(handle.collection, "users");
        assert_eq!(handle.key, "a/b");
    }

    #[test]
    fn test_attribute_path_nested() {
        let body = json!({"address": {"city": "Oslo", "geo": {"lat": 59.9}}});
        assert_eq!(attribute_path(&body, "address.city"), Some(&json!("Oslo")));
        assert_eq!(attribute_path(&body, "address.geo.lat"), Some(&json!(59.9)));
        assert_eq!(attribute_path(&body, "address.zip"), None);
        assert_eq!(attribute_path(&body, "name"), None);
    }

    #[test]
    fn test_document_attribute() {
        let doc = Document::new(
            DocumentHandle::new("users", "u1"),
            json!({"name": "Alice", "age": 34}),
        );
        assert_eq!(doc.attribute("name"), Some(&json!("Alice")));
        assert_eq!(doc.attribute("missing"), None);
    }
}
