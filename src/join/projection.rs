//! Projection analysis
//!
//! Before execution, every participant's attribute accesses are classified
//! once into a `ProjectionSet`. The classification is a small liveness
//! analysis over three access sets the planner hands in: attributes in the
//! output expression, attributes in participant-local filters, and
//! attributes in cross-participant filters or sort/limit keys.
//!
//! The resulting set is read-only during execution and decides, per
//! participant, whether rows carry covering index projections, full
//! documents fetched at scan time, or deferred handles.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::errors::{JoinError, JoinResult};
use super::participant::IndexParticipant;

/// How one attribute of a participant is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeUse {
    /// Needed in the final output, or by a filter spanning participants
    Output,
    /// Needed only by a filter local to this participant
    FilterOnly,
    /// Never read
    Unused,
}

/// Attribute accesses the planner observed for one participant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttributeAccess {
    /// Attributes referenced by the output expression
    pub output: BTreeSet<String>,
    /// Attributes referenced by filters local to this participant
    pub local_filter: BTreeSet<String>,
    /// Attributes referenced by cross-participant filters or sort keys
    pub cross_filter: BTreeSet<String>,
}

impl AttributeAccess {
    /// No accesses at all (pure existence/count participant)
    pub fn none() -> Self {
        Self::default()
    }

    /// Builds from output attributes only
    pub fn output_only<const N: usize>(attributes: [&str; N]) -> Self {
        Self {
            output: attributes.iter().map(|a| a.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Adds a local-filter attribute
    pub fn with_local_filter(mut self, attribute: &str) -> Self {
        self.local_filter.insert(attribute.to_string());
        self
    }

    /// Adds a cross-participant filter or sort attribute
    pub fn with_cross_filter(mut self, attribute: &str) -> Self {
        self.cross_filter.insert(attribute.to_string());
        self
    }

    /// Classifies every referenced attribute.
    ///
    /// Output and cross-participant references dominate: an attribute that
    /// is both filtered on locally and requested as output classifies as
    /// `Output`, so it never blocks deferral on its own.
    pub fn classify(&self) -> BTreeMap<String, AttributeUse> {
        let mut uses = BTreeMap::new();
        for attr in self.output.iter().chain(self.cross_filter.iter()) {
            uses.insert(attr.clone(), AttributeUse::Output);
        }
        for attr in &self.local_filter {
            uses.entry(attr.clone()).or_insert(AttributeUse::FilterOnly);
        }
        uses
    }

    /// Use of one attribute (Unused if never referenced)
    pub fn usage(&self, attribute: &str) -> AttributeUse {
        self.classify()
            .get(attribute)
            .copied()
            .unwrap_or(AttributeUse::Unused)
    }
}

/// Where a participant's output is consumed relative to the next
/// LIMIT/SORT boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerPlacement {
    /// Some consumer of the output runs before the boundary
    BeforeBoundary,
    /// All output consumers run after the boundary
    AfterBoundary,
}

/// The analyzer's verdict for one participant, immutable during execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionSet {
    /// Attributes the participant must surface as output
    pub projections: Vec<String>,
    /// Attributes needed only to evaluate local filters
    pub filter_projections: Vec<String>,
    /// Whether the participant surfaces any output at all
    pub produces_output: bool,
    /// Whether index key fields plus stored values cover every needed
    /// attribute, permitting scans without document fetches
    pub index_covers_projections: bool,
    /// Whether the full-document fetch may be deferred past the boundary
    pub late_materialized: bool,
}

impl ProjectionSet {
    /// All attributes the scan must be able to produce
    pub fn needed_attributes(&self) -> BTreeSet<String> {
        self.projections
            .iter()
            .chain(self.filter_projections.iter())
            .cloned()
            .collect()
    }
}

/// Computes `ProjectionSet`s ahead of execution.
pub struct ProjectionAnalyzer;

impl ProjectionAnalyzer {
    /// Analyzes one participant.
    ///
    /// Rejects the one participant shape this operator cannot stream: a
    /// primary index with its equality predicate written over the full
    /// document handle (`_id`) instead of a plain key.
    pub fn analyze(
        participant: &IndexParticipant,
        access: &AttributeAccess,
        placement: ConsumerPlacement,
    ) -> JoinResult<ProjectionSet> {
        if participant.descriptor.primary && participant.join_attribute == "_id" {
            return Err(JoinError::plan_invalid_participant(
                &participant.collection,
                "primary-index cursor cannot stream handle-qualified lookups",
            ));
        }

        let uses = access.classify();
        let projections: Vec<String> = uses
            .iter()
            .filter(|(_, u)| **u == AttributeUse::Output)
            .map(|(a, _)| a.clone())
            .collect();
        let filter_projections: Vec<String> = uses
            .iter()
            .filter(|(_, u)| **u == AttributeUse::FilterOnly)
            .map(|(a, _)| a.clone())
            .collect();

        let produces_output = !projections.is_empty();
        let index_covers_projections = participant
            .descriptor
            .covers(projections.iter().chain(filter_projections.iter()));

        // Deferral needs a covering index (the scan must never fetch) and
        // every output consumer behind the boundary. Filter-only
        // attributes resolve from index values at scan time, so they do
        // not block deferral either.
        let late_materialized = produces_output
            && index_covers_projections
            && placement == ConsumerPlacement::AfterBoundary;

        Ok(ProjectionSet {
            projections,
            filter_projections,
            produces_output,
            index_covers_projections,
            late_materialized,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{IndexDescriptor, SortDirection};

    fn participant(descriptor: IndexDescriptor) -> IndexParticipant {
        IndexParticipant::new("users", descriptor, SortDirection::Forward)
    }

    fn covered_descriptor() -> IndexDescriptor {
        IndexDescriptor::sorted("idx_x", vec!["x".to_string()])
            .with_stored_fields(vec!["y".to_string(), "z".to_string()])
    }

    #[test]
    fn test_output_and_filter_classification() {
        let access = AttributeAccess::output_only(["x"])
            .with_local_filter("y")
            .with_cross_filter("z");

        assert_eq!(access.usage("x"), AttributeUse::Output);
        assert_eq!(access.usage("y"), AttributeUse::FilterOnly);
        assert_eq!(access.usage("z"), AttributeUse::Output);
        assert_eq!(access.usage("w"), AttributeUse::Unused);
    }

    #[test]
    fn test_output_dominates_local_filter() {
        // Referenced by a local filter AND the output expression: Output.
        let access = AttributeAccess::output_only(["y"]).with_local_filter("y");
        assert_eq!(access.usage("y"), AttributeUse::Output);

        let set = ProjectionAnalyzer::analyze(
            &participant(covered_descriptor()),
            &access,
            ConsumerPlacement::AfterBoundary,
        )
        .unwrap();
        assert_eq!(set.projections, vec!["y".to_string()]);
        assert!(set.filter_projections.is_empty());
        assert!(set.late_materialized);
    }

    #[test]
    fn test_no_accesses_produces_no_output() {
        let set = ProjectionAnalyzer::analyze(
            &participant(covered_descriptor()),
            &AttributeAccess::none(),
            ConsumerPlacement::BeforeBoundary,
        )
        .unwrap();
        assert!(!set.produces_output);
        assert!(set.projections.is_empty());
        assert!(set.filter_projections.is_empty());
        assert!(!set.late_materialized);
    }

    #[test]
    fn test_uncovered_projection_blocks_deferral() {
        let access = AttributeAccess::output_only(["name"]);
        let set = ProjectionAnalyzer::analyze(
            &participant(covered_descriptor()),
            &access,
            ConsumerPlacement::AfterBoundary,
        )
        .unwrap();
        assert!(!set.index_covers_projections);
        assert!(!set.late_materialized);
    }

    #[test]
    fn test_before_boundary_blocks_deferral() {
        let access = AttributeAccess::output_only(["y"]);
        let set = ProjectionAnalyzer::analyze(
            &participant(covered_descriptor()),
            &access,
            ConsumerPlacement::BeforeBoundary,
        )
        .unwrap();
        assert!(set.index_covers_projections);
        assert!(!set.late_materialized);
    }

    #[test]
    fn test_filter_only_does_not_block_deferral() {
        let access = AttributeAccess::output_only(["y"]).with_local_filter("z");
        let set = ProjectionAnalyzer::analyze(
            &participant(covered_descriptor()),
            &access,
            ConsumerPlacement::AfterBoundary,
        )
        .unwrap();
        assert_eq!(set.filter_projections, vec!["z".to_string()]);
        assert!(set.late_materialized);
    }

    #[test]
    fn test_primary_handle_predicate_rejected() {
        let p = participant(IndexDescriptor::primary()).with_join_attribute("_id");
        let err = ProjectionAnalyzer::analyze(
            &p,
            &AttributeAccess::output_only(["_key"]),
            ConsumerPlacement::BeforeBoundary,
        )
        .unwrap_err();
        assert_eq!(err.code().code(), "CAIRN_JOIN_PLAN_INVALID");
    }

    #[test]
    fn test_primary_key_predicate_accepted() {
        // A plain `_key` predicate over the primary index streams fine.
        let p = participant(IndexDescriptor::primary());
        assert_eq!(p.join_attribute, "_key");
        let set = ProjectionAnalyzer::analyze(
            &p,
            &AttributeAccess::output_only(["_key"]),
            ConsumerPlacement::BeforeBoundary,
        )
        .unwrap();
        assert!(set.produces_output);
    }
}
