//! Join rows and per-participant bindings
//!
//! A binding is either a value already in hand or a handle whose fetch has
//! been deferred past the point where cheaper operators may still discard
//! the row. The tagged union keeps "not fetched yet" distinct from "null"
//! all the way through the pipeline.

use serde_json::Value;

use crate::index::SortKey;
use crate::storage::{attribute_path, DocumentHandle};

/// One participant's contribution to a join row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowBinding {
    /// Value available now: a full document, a covering projection, or
    /// null for participants that produce no output
    Materialized(Value),
    /// Full-document fetch deferred; resolved by the materializer
    Deferred(DocumentHandle),
}

impl RowBinding {
    /// Whether this binding still awaits materialization
    pub fn is_deferred(&self) -> bool {
        matches!(self, RowBinding::Deferred(_))
    }

    /// The bound value, if materialized
    pub fn value(&self) -> Option<&Value> {
        match self {
            RowBinding::Materialized(value) => Some(value),
            RowBinding::Deferred(_) => None,
        }
    }

    /// Reads an attribute from a materialized binding
    pub fn attribute(&self, path: &str) -> Option<&Value> {
        self.value().and_then(|value| attribute_path(value, path))
    }
}

/// One output row of the merge join: the shared key plus one binding per
/// participant, in participant order.
#[derive(Debug, Clone)]
pub struct JoinRow {
    /// The key every participant matched on
    pub key: SortKey,
    /// Per-participant bindings
    pub bindings: Vec<RowBinding>,
}

impl JoinRow {
    /// Creates a row
    pub fn new(key: SortKey, bindings: Vec<RowBinding>) -> Self {
        Self { key, bindings }
    }

    /// Binding of the participant at `index`
    pub fn binding(&self, index: usize) -> &RowBinding {
        &self.bindings[index]
    }

    /// Attribute of the participant at `index`, if materialized
    pub fn attribute(&self, index: usize, path: &str) -> Option<&Value> {
        self.bindings.get(index).and_then(|b| b.attribute(path))
    }

    /// Number of bindings still deferred
    pub fn deferred_count(&self) -> usize {
        self.bindings.iter().filter(|b| b.is_deferred()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexKey;
    use serde_json::json;

    #[test]
    fn test_materialized_attribute_access() {
        let binding = RowBinding::Materialized(json!({"a": {"b": 7}}));
        assert!(!binding.is_deferred());
        assert_eq!(binding.attribute("a.b"), Some(&json!(7)));
        assert_eq!(binding.attribute("a.c"), None);
    }

    #[test]
    fn test_deferred_binding_has_no_value() {
        let binding = RowBinding::Deferred(DocumentHandle::new("users", "u1"));
        assert!(binding.is_deferred());
        assert_eq!(binding.value(), None);
        assert_eq!(binding.attribute("x"), None);
    }

    #[test]
    fn test_row_deferred_count() {
        let row = JoinRow::new(
            SortKey::single(IndexKey::from_int(1)),
            vec![
                RowBinding::Materialized(json!({"x": 1})),
                RowBinding::Deferred(DocumentHandle::new("b", "k")),
            ],
        );
        assert_eq!(row.deferred_count(), 1);
        assert_eq!(row.attribute(0, "x"), Some(&json!(1)));
        assert_eq!(row.attribute(1, "x"), None);
    }
}
