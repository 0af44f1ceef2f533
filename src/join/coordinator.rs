//! Shard-colocated join fan-out
//!
//! When every participant is partitioned identically, a join-key match can
//! never span shards, so the join decomposes into one independent
//! merge-join executor per shard column. Executors run as blocking tasks
//! on the runtime's worker pool; their outputs are concatenated in shard
//! order, never merged - a global ORDER BY needs an explicit downstream
//! sort.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::index::SortedIndex;
use crate::observability::ObservationScope;
use crate::storage::DocumentResolver;

use super::config::JoinConfig;
use super::context::ExecutionContext;
use super::errors::{JoinError, JoinResult};
use super::executor::{JoinInput, MergeJoinExecutor};
use super::participant::IndexParticipant;
use super::projection::ProjectionSet;
use super::row::JoinRow;

/// One participant with its per-shard indexes, in shard order.
///
/// Shard i of every participant holds the data for shard column i; the
/// planner guarantees the distributions are compatible, the coordinator
/// only verifies the shape.
pub struct ShardedParticipant {
    /// The participant descriptor shared by all its shards
    pub participant: IndexParticipant,
    /// The analyzer's verdict, shared by all shards
    pub projection: ProjectionSet,
    /// One sorted index per shard
    pub shards: Vec<Arc<SortedIndex>>,
}

impl ShardedParticipant {
    /// Bundles a participant with its shard indexes
    pub fn new(
        participant: IndexParticipant,
        projection: ProjectionSet,
        shards: Vec<Arc<SortedIndex>>,
    ) -> Self {
        Self {
            participant,
            projection,
            shards,
        }
    }
}

/// Fans a join out across colocated shard columns and concatenates the
/// per-shard row streams.
pub struct ShardCoordinator {
    config: JoinConfig,
}

impl ShardCoordinator {
    /// Creates a coordinator with the given execution config
    pub fn new(config: JoinConfig) -> Self {
        Self { config }
    }

    /// Runs one executor per shard column and concatenates their outputs.
    ///
    /// Any structural error aborts the whole join: the shared token is
    /// tripped so sibling shard tasks stop at their next advance, and the
    /// structural error wins over the resulting killed outcomes.
    pub async fn execute(
        &self,
        participants: Vec<ShardedParticipant>,
        resolver: Arc<dyn DocumentResolver>,
        ctx: ExecutionContext,
    ) -> JoinResult<Vec<JoinRow>> {
        if participants.is_empty() {
            return Err(JoinError::plan_invalid("join has no participants"));
        }
        let shard_count = participants[0].shards.len();
        for p in &participants {
            if p.shards.len() != shard_count {
                return Err(JoinError::plan_invalid_participant(
                    &p.participant.collection,
                    "shard counts differ; participants are not colocated",
                ));
            }
        }

        let query_id = ctx.query_id.to_string();
        let shards_field = shard_count.to_string();
        let scope = ObservationScope::with_fields(
            "INDEX_JOIN",
            &[("query_id", &query_id), ("shards", &shards_field)],
        );

        let mut tasks: Vec<JoinHandle<JoinResult<Vec<JoinRow>>>> =
            Vec::with_capacity(shard_count);
        for shard in 0..shard_count {
            let inputs: Vec<JoinInput> = participants
                .iter()
                .map(|p| {
                    JoinInput::new(
                        p.participant.clone(),
                        p.projection.clone(),
                        Box::new(
                            Arc::clone(&p.shards[shard]).open_cursor(p.participant.direction),
                        ),
                    )
                })
                .collect();
            let resolver = Arc::clone(&resolver);
            let config = self.config.clone();
            let task_ctx = ctx.clone();
            tasks.push(tokio::task::spawn_blocking(
                move || -> JoinResult<Vec<JoinRow>> {
                    MergeJoinExecutor::new(inputs, resolver, config, task_ctx)?.drain()
                },
            ));
        }
        ctx.metrics.add_shard_tasks(shard_count as u64);

        let mut rows = Vec::new();
        let mut failure: Option<JoinError> = None;
        for task in tasks {
            match task.await {
                Ok(Ok(shard_rows)) => rows.extend(shard_rows),
                Ok(Err(err)) => {
                    ctx.cancel.cancel();
                    failure = Some(Self::prefer(failure.take(), err));
                }
                Err(join_err) => {
                    ctx.cancel.cancel();
                    failure = Some(Self::prefer(
                        failure.take(),
                        JoinError::storage_failed(format!("shard task failed: {}", join_err)),
                    ));
                }
            }
        }

        if let Some(err) = failure {
            // Scope drops uncompleted and logs the abort.
            return Err(err);
        }

        ctx.metrics.increment_queries_executed();
        let row_count = rows.len().to_string();
        scope.complete_with_fields(&[("rows", &row_count)]);
        Ok(rows)
    }

    /// Keeps the most telling error: anything structural beats the killed
    /// outcomes it caused in sibling shards.
    fn prefer(current: Option<JoinError>, incoming: JoinError) -> JoinError {
        match current {
            None => incoming,
            Some(existing) if existing.is_killed() && !incoming.is_killed() => incoming,
            Some(existing) => existing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{IndexDescriptor, SortDirection};
    use crate::join::projection::{AttributeAccess, ConsumerPlacement, ProjectionAnalyzer};
    use crate::storage::DocumentStore;
    use serde_json::json;

    fn sharded_participant(
        store: &DocumentStore,
        collection: &str,
        shards: &[&[i64]],
    ) -> ShardedParticipant {
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

        let mut indexes = Vec::new();
        for (i, values) in shards.iter().enumerate() {
            let shard_name = format!("{}_s{}", collection, i);
            store.create_collection(&shard_name);
            for (j, v) in values.iter().enumerate() {
                store.insert(&shard_name, &format!("k{:03}", j), json!({"x": v}));
            }
            indexes.push(Arc::new(
                SortedIndex::build(participant.descriptor.clone(), &shard_name, store).unwrap(),
            ));
        }
        ShardedParticipant::new(participant, projection, indexes)
    }

    #[tokio::test]
    async fn test_per_shard_join_concatenates() {
        let store = DocumentStore::new();
        // Shard 0 holds even keys, shard 1 odd keys, both sides colocated.
        let left = sharded_participant(&store, "a", &[&[0, 2, 4], &[1, 3]]);
        let right = sharded_participant(&store, "b", &[&[2, 4, 6], &[3, 5]]);

        let coordinator = ShardCoordinator::new(JoinConfig::default());
        let rows = coordinator
            .execute(
                vec![left, right],
                Arc::new(store.clone()),
                ExecutionContext::new(),
            )
            .await
            .unwrap();

        // Shard 0 matches {2,4}, shard 1 matches {3}; concatenated in
        // shard order.
        let keys: Vec<i64> = rows
            .iter()
            .map(|r| r.attribute(0, "x").unwrap().as_i64().unwrap())
            .collect();
        assert_eq!(keys, vec![2, 4, 3]);
    }

    #[tokio::test]
    async fn test_shard_count_mismatch_rejected() {
        let store = DocumentStore::new();
        let left = sharded_participant(&store, "a", &[&[1], &[2]]);
        let right = sharded_participant(&store, "b", &[&[1]]);

        let coordinator = ShardCoordinator::new(JoinConfig::default());
        let err = coordinator
            .execute(
                vec![left, right],
                Arc::new(store.clone()),
                ExecutionContext::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code().code(), "CAIRN_JOIN_PLAN_INVALID");
    }

    #[tokio::test]
    async fn test_cancellation_reaches_shard_tasks() {
        let store = DocumentStore::new();
        let left = sharded_participant(&store, "a", &[&[1, 2, 3]]);
        let right = sharded_participant(&store, "b", &[&[1, 2, 3]]);

        let ctx = ExecutionContext::new();
        ctx.cancel.cancel();
        let coordinator = ShardCoordinator::new(JoinConfig::default());
        let err = coordinator
            .execute(vec![left, right], Arc::new(store.clone()), ctx)
            .await
            .unwrap_err();
        assert!(err.is_killed());
    }
}
