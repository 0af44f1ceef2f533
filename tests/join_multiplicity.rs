//! Merge-Join Multiplicity Tests
//!
//! Result-cardinality invariants of the sorted-index merge join:
//! - Per-key multiplicity is the product of duplicate-group sizes
//! - Keys missing from any participant contribute zero rows
//! - Multi-way joins agree with nested two-way joins
//! - Re-execution is deterministic

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;

use cairndb::index::{IndexDescriptor, SortDirection, SortedIndex};
use cairndb::join::{
    AttributeAccess, ConsumerPlacement, ExecutionContext, IndexParticipant, JoinConfig, JoinInput,
    JoinRow, MergeJoinExecutor, ProjectionAnalyzer,
};
use cairndb::storage::DocumentStore;

// =============================================================================
// Helper Functions
// =============================================================================

/// Seeds a collection with one document per value, `{"x": value}`.
fn seed(store: &DocumentStore, collection: &str, values: &[i64]) {
    store.create_collection(collection);
    for (i, v) in values.iter().enumerate() {
        store.insert(collection, &format!("k{:04}", i), json!({"x": v}));
    }
}

/// Builds a participant joining on `x`, with an opened forward cursor.
fn input_on_x(store: &DocumentStore, collection: &str) -> JoinInput {
    let participant = IndexParticipant::new(
        collection,
        IndexDescriptor::sorted("idx_x", vec!["x".to_string()]),
        SortDirection::Forward,
    );
    let projection = ProjectionAnalyzer::analyze(
        &participant,
        &AttributeAccess::output_only(["x"]),
        ConsumerPlacement::BeforeBoundary,
    )
    .unwrap();
    let index =
        Arc::new(SortedIndex::build(participant.descriptor.clone(), collection, store).unwrap());
    let cursor = index.open_cursor(SortDirection::Forward);
    JoinInput::new(participant, projection, Box::new(cursor))
}

/// Runs a join over the named collections and drains all rows.
fn join_all(store: &DocumentStore, collections: &[&str]) -> Vec<JoinRow> {
    let inputs = collections.iter().map(|c| input_on_x(store, c)).collect();
    MergeJoinExecutor::new(
        inputs,
        Arc::new(store.clone()),
        JoinConfig::default(),
        ExecutionContext::new(),
    )
    .unwrap()
    .drain()
    .unwrap()
}

/// Per-key row counts of a result set.
fn counts_by_key(rows: &[JoinRow]) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for row in rows {
        let key = row.attribute(0, "x").unwrap().as_i64().unwrap();
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

// =============================================================================
// Two-Way Multiplicity
// =============================================================================

/// A.x unique over 0..9, B.x even values 0,2,..,18: exactly the five
/// shared keys match, one row each.
#[test]
fn test_even_keys_intersection() {
    let store = DocumentStore::new();
    seed(&store, "a", &(0..10).collect::<Vec<_>>());
    seed(&store, "b", &(0..10).map(|k| 2 * k).collect::<Vec<_>>());

    let rows = join_all(&store, &["a", "b"]);

    assert_eq!(rows.len(), 5);
    for row in &rows {
        assert_eq!(row.attribute(0, "x"), row.attribute(1, "x"));
    }
    let keys: Vec<i64> = counts_by_key(&rows).into_keys().collect();
    assert_eq!(keys, vec![0, 2, 4, 6, 8]);
}

/// Every row of both sides shares one key: full cross product.
#[test]
fn test_full_product() {
    let store = DocumentStore::new();
    seed(&store, "a", &[42; 10]);
    seed(&store, "b", &[42; 10]);

    let rows = join_all(&store, &["a", "b"]);
    assert_eq!(rows.len(), 100);
}

/// A.x unique over 0..99, B.x = i mod 100 over 0..999: every B document
/// matches exactly one A document.
#[test]
fn test_mod_hundred_multiplicity() {
    let store = DocumentStore::new();
    seed(&store, "a", &(0..100).collect::<Vec<_>>());
    seed(&store, "b", &(0..1000).map(|i| i % 100).collect::<Vec<_>>());

    let rows = join_all(&store, &["a", "b"]);

    assert_eq!(rows.len(), 1000);
    for row in &rows {
        assert_eq!(row.attribute(0, "x"), row.attribute(1, "x"));
    }
    // Every key contributes exactly |groupA| * |groupB| = 1 * 10 rows.
    for (_, count) in counts_by_key(&rows) {
        assert_eq!(count, 10);
    }
}

/// Per-key multiplicity is the product of duplicate-group sizes.
#[test]
fn test_group_product_per_key() {
    let store = DocumentStore::new();
    seed(&store, "a", &[1, 1, 2, 3, 3, 3]);
    seed(&store, "b", &[1, 2, 2, 3]);

    let rows = join_all(&store, &["a", "b"]);
    let counts = counts_by_key(&rows);

    assert_eq!(counts.get(&1), Some(&2)); // 2 * 1
    assert_eq!(counts.get(&2), Some(&2)); // 1 * 2
    assert_eq!(counts.get(&3), Some(&3)); // 3 * 1
    assert_eq!(rows.len(), 7);
}

// =============================================================================
// Multi-Way Joins
// =============================================================================

/// A three-way transitive join has the same per-key counts as joining the
/// first two sides and multiplying in the third.
#[test]
fn test_three_way_matches_nested_two_way() {
    let store = DocumentStore::new();
    seed(&store, "a", &[0, 1, 1, 2, 4]);
    seed(&store, "b", &[1, 1, 2, 3, 4]);
    seed(&store, "c", &[1, 2, 2, 4, 5]);

    let three_way = join_all(&store, &["a", "b", "c"]);
    let two_way = join_all(&store, &["a", "b"]);

    // Group sizes of the third side.
    let mut c_groups: BTreeMap<i64, usize> = BTreeMap::new();
    for v in [1, 2, 2, 4, 5] {
        *c_groups.entry(v).or_insert(0) += 1;
    }

    let mut expected: BTreeMap<i64, usize> = BTreeMap::new();
    for (key, count) in counts_by_key(&two_way) {
        let c_size = c_groups.get(&key).copied().unwrap_or(0);
        if c_size > 0 {
            expected.insert(key, count * c_size);
        }
    }

    assert_eq!(counts_by_key(&three_way), expected);
    for row in &three_way {
        assert_eq!(row.attribute(0, "x"), row.attribute(1, "x"));
        assert_eq!(row.attribute(1, "x"), row.attribute(2, "x"));
    }
}

// =============================================================================
// Determinism and Ordering
// =============================================================================

/// Re-running an unmodified query yields identical rows.
#[test]
fn test_idempotent_re_execution() {
    let store = DocumentStore::new();
    seed(&store, "a", &[3, 1, 4, 1, 5, 9, 2, 6]);
    seed(&store, "b", &[2, 7, 1, 8, 2, 8, 1]);

    let first = join_all(&store, &["a", "b"]);
    let second = join_all(&store, &["a", "b"]);

    assert_eq!(first.len(), second.len());
    for (left, right) in first.iter().zip(second.iter()) {
        assert_eq!(left.key, right.key);
        assert_eq!(left.attribute(0, "x"), right.attribute(0, "x"));
        assert_eq!(left.attribute(1, "x"), right.attribute(1, "x"));
    }
}

/// Absent an explicit SORT, rows appear in non-decreasing key order.
#[test]
fn test_rows_in_non_decreasing_key_order() {
    let store = DocumentStore::new();
    seed(&store, "a", &[5, 3, 3, 9, 1, 5]);
    seed(&store, "b", &[3, 5, 9, 9, 1]);

    let rows = join_all(&store, &["a", "b"]);
    assert!(!rows.is_empty());
    for pair in rows.windows(2) {
        assert!(pair[0].key <= pair[1].key);
    }
}
