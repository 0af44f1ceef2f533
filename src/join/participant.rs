//! Join participants
//!
//! A participant is one collection (or one shard of it) entering the join
//! through a chosen sorted index. The planner fixes all of this before
//! execution; a participant never changes for the lifetime of a join.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::index::{IndexDescriptor, SortDirection};

/// A filter evaluated entirely from one participant's own attributes,
/// pushed down into the index scan.
///
/// The predicate receives an object holding the participant's covered
/// attributes (or the full document when the index does not cover them)
/// and decides membership before a row is ever assembled.
#[derive(Clone)]
pub struct LocalFilter {
    name: String,
    predicate: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
}

impl LocalFilter {
    /// Creates a named filter
    pub fn new(
        name: impl Into<String>,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Filter name, used in logs and explain output
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluates the filter against the participant's attribute view
    pub fn matches(&self, attributes: &Value) -> bool {
        (self.predicate)(attributes)
    }
}

impl fmt::Debug for LocalFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalFilter").field("name", &self.name).finish()
    }
}

/// One collection's role in a merge join.
#[derive(Debug, Clone)]
pub struct IndexParticipant {
    /// Collection (or shard) the participant reads
    pub collection: String,
    /// The sorted index chosen by the planner
    pub descriptor: IndexDescriptor,
    /// Iteration direction; all participants of one executor must agree
    pub direction: SortDirection,
    /// Attribute the equality predicate is written over. Normally the
    /// leading index field; `_id` over a primary index marks the one shape
    /// this operator must reject.
    pub join_attribute: String,
    /// Participant-local filter pushed into the scan, if any
    pub local_filter: Option<LocalFilter>,
}

impl IndexParticipant {
    /// Creates a participant joining on the index's leading field
    pub fn new(
        collection: impl Into<String>,
        descriptor: IndexDescriptor,
        direction: SortDirection,
    ) -> Self {
        let join_attribute = descriptor
            .fields
            .first()
            .cloned()
            .unwrap_or_default();
        Self {
            collection: collection.into(),
            descriptor,
            direction,
            join_attribute,
            local_filter: None,
        }
    }

    /// Overrides the predicate attribute (used for handle-qualified
    /// predicates the analyzer must reject)
    pub fn with_join_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.join_attribute = attribute.into();
        self
    }

    /// Attaches a pushed-down local filter
    pub fn with_local_filter(mut self, filter: LocalFilter) -> Self {
        self.local_filter = Some(filter);
        self
    }
}
