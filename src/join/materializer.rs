//! Late materialization
//!
//! Upgrades deferred bindings to full documents once downstream SORT/LIMIT
//! has narrowed the candidate set. Handles are resolved participant by
//! participant in bounded batches, each batch deduping repeated handles, so
//! the number of fetches is capped by the rows that survived upstream - not
//! by the number of candidates scanned.
//!
//! A handle whose document was removed between the join scan and
//! materialization drops its row (soft miss). Only faults below the
//! storage seam abort the query.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::observability::MetricsRegistry;
use crate::storage::{DocumentHandle, DocumentResolver};

use super::config::JoinConfig;
use super::context::ExecutionContext;
use super::errors::JoinResult;
use super::row::{JoinRow, RowBinding};

/// Resolves deferred join-row bindings in per-participant batches.
pub struct Materializer {
    resolver: Arc<dyn DocumentResolver>,
    metrics: Arc<MetricsRegistry>,
    batch_size: usize,
}

impl Materializer {
    /// Creates a materializer sharing the context's metrics
    pub fn new(resolver: Arc<dyn DocumentResolver>, config: &JoinConfig, ctx: &ExecutionContext) -> Self {
        Self {
            resolver,
            metrics: Arc::clone(&ctx.metrics),
            batch_size: config.materialize_batch_size.max(1),
        }
    }

    /// Upgrades every deferred binding, preserving row order.
    ///
    /// Rows whose deferred document no longer exists are dropped; the
    /// result is possibly smaller but consistent.
    pub fn materialize(&self, rows: Vec<JoinRow>) -> JoinResult<Vec<JoinRow>> {
        let width = rows.first().map(|row| row.bindings.len()).unwrap_or(0);
        let mut rows = rows;
        let mut keep = vec![true; rows.len()];

        for column in 0..width {
            for batch_start in (0..rows.len()).step_by(self.batch_size) {
                let batch_end = (batch_start + self.batch_size).min(rows.len());
                let mut resolved: HashMap<DocumentHandle, Option<Value>> = HashMap::new();
                for index in batch_start..batch_end {
                    if !keep[index] {
                        continue;
                    }
                    let RowBinding::Deferred(handle) = &rows[index].bindings[column] else {
                        continue;
                    };
                    let body = match resolved.get(handle) {
                        Some(cached) => cached.clone(),
                        None => {
                            let body = self.resolver.resolve(handle)?.map(|doc| doc.body);
                            self.metrics.increment_documents_fetched();
                            resolved.insert(handle.clone(), body.clone());
                            body
                        }
                    };
                    match body {
                        Some(body) => {
                            rows[index].bindings[column] = RowBinding::Materialized(body);
                        }
                        None => {
                            keep[index] = false;
                            self.metrics.increment_rows_dropped_missing();
                        }
                    }
                }
            }
        }

        let mut kept = keep.iter();
        rows.retain(|_| *kept.next().unwrap_or(&false));
        Ok(rows)
    }
}
