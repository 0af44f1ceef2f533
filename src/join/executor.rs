//! Merge-join executor
//!
//! Executes a multi-way equality join directly over pre-sorted index
//! streams. The machine advances all cursors to a shared key, buffers each
//! participant's duplicate-key group, emits the Cartesian product of the
//! groups one row at a time, and repeats until any stream exhausts.
//!
//! Execution flow (strict order):
//! 1. Construction validates the participant set (fail fast)
//! 2. Advance: skip every cursor below the maximum current key, whole
//!    duplicate groups at a time, until all keys are equal
//! 3. Buffer the duplicate group of every participant, applying pushed-down
//!    local filters and building one binding per surviving entry
//! 4. Emit the cross product in fixed participant order, first participant
//!    varying slowest
//! 5. Consume the groups and return to Advance
//!
//! Cancellation is polled at every advance transition; the LIMIT early-stop
//! signal is polled between emissions. Rows already handed to the caller
//! are never retracted.

use std::cmp::Ordering;
use std::sync::Arc;

use serde_json::Value;

use crate::index::{IndexEntry, IndexStream, SortDirection, SortKey};
use crate::observability::MetricsRegistry;
use crate::storage::DocumentResolver;

use super::config::JoinConfig;
use super::context::ExecutionContext;
use super::errors::{JoinError, JoinResult};
use super::participant::IndexParticipant;
use super::projection::ProjectionSet;
use super::row::{JoinRow, RowBinding};

/// One participant's inputs to an executor: descriptor, analysis verdict,
/// and an opened cursor.
pub struct JoinInput {
    /// The participant descriptor
    pub participant: IndexParticipant,
    /// The analyzer's verdict for this participant
    pub projection: ProjectionSet,
    /// Cursor positioned at the first entry
    pub cursor: Box<dyn IndexStream>,
}

impl JoinInput {
    /// Bundles one participant's executor inputs
    pub fn new(
        participant: IndexParticipant,
        projection: ProjectionSet,
        cursor: Box<dyn IndexStream>,
    ) -> Self {
        Self {
            participant,
            projection,
            cursor,
        }
    }
}

/// Executor state. Construction is the INIT step; `Cancelled` is reachable
/// from every state through the shared token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Advance,
    Emit,
    Done,
    Cancelled,
}

struct ParticipantState {
    participant: IndexParticipant,
    projection: ProjectionSet,
    /// All attributes the scan must produce, sorted
    needed: Vec<String>,
    cursor: Box<dyn IndexStream>,
}

/// Lazy Cartesian product over the buffered groups of one matched key.
///
/// Counters form an odometer with the last participant in the least
/// significant position, so the first participant varies slowest -
/// nested-loop order.
struct GroupProduct {
    key: SortKey,
    groups: Vec<Vec<RowBinding>>,
    counters: Vec<usize>,
    exhausted: bool,
}

impl GroupProduct {
    fn new(key: SortKey, groups: Vec<Vec<RowBinding>>) -> Self {
        let exhausted = groups.iter().any(Vec::is_empty);
        let counters = vec![0; groups.len()];
        Self {
            key,
            groups,
            counters,
            exhausted,
        }
    }

    fn next_row(&mut self) -> Option<JoinRow> {
        if self.exhausted {
            return None;
        }
        let bindings = self
            .groups
            .iter()
            .zip(&self.counters)
            .map(|(group, &i)| group[i].clone())
            .collect();

        let mut position = self.groups.len();
        loop {
            if position == 0 {
                self.exhausted = true;
                break;
            }
            position -= 1;
            self.counters[position] += 1;
            if self.counters[position] < self.groups[position].len() {
                break;
            }
            self.counters[position] = 0;
        }

        Some(JoinRow::new(self.key.clone(), bindings))
    }
}

/// Pull-based sort-merge join over N sorted index streams.
pub struct MergeJoinExecutor {
    parts: Vec<ParticipantState>,
    resolver: Arc<dyn DocumentResolver>,
    config: JoinConfig,
    ctx: ExecutionContext,
    direction: SortDirection,
    state: State,
    product: Option<GroupProduct>,
}

impl std::fmt::Debug for MergeJoinExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeJoinExecutor")
            .field("parts", &self.parts.len())
            .field("direction", &self.direction)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl MergeJoinExecutor {
    /// Validates the participant set and takes ownership of the cursors.
    ///
    /// Comparator compatibility is a planner precondition; construction
    /// only fail-fast checks what it can see: at least two participants,
    /// one shared direction, one shared key arity, and every equality
    /// predicate driving its index's leading field.
    pub fn new(
        inputs: Vec<JoinInput>,
        resolver: Arc<dyn DocumentResolver>,
        config: JoinConfig,
        ctx: ExecutionContext,
    ) -> JoinResult<Self> {
        if inputs.len() < 2 {
            return Err(JoinError::plan_invalid(
                "merge join needs at least two participants",
            ));
        }
        let direction = inputs[0].participant.direction;
        let arity = inputs[0].participant.descriptor.fields.len();
        for input in &inputs {
            let p = &input.participant;
            if p.direction != direction {
                return Err(JoinError::plan_invalid_participant(
                    &p.collection,
                    "sort direction differs across participants",
                ));
            }
            if p.descriptor.fields.len() != arity {
                return Err(JoinError::plan_invalid_participant(
                    &p.collection,
                    "index key arity differs across participants",
                ));
            }
            if p.descriptor.fields.first() != Some(&p.join_attribute) {
                return Err(JoinError::plan_invalid_participant(
                    &p.collection,
                    "equality predicate does not drive the leading index field",
                ));
            }
        }

        let parts = inputs
            .into_iter()
            .map(|input| ParticipantState {
                needed: input.projection.needed_attributes().into_iter().collect(),
                participant: input.participant,
                projection: input.projection,
                cursor: input.cursor,
            })
            .collect();

        Ok(Self {
            parts,
            resolver,
            config,
            ctx,
            direction,
            state: State::Advance,
            product: None,
        })
    }

    /// Produces the next join row, or None once the join is complete.
    ///
    /// After cancellation every call returns the killed error; after any
    /// structural error the join is closed and stays closed.
    pub fn next_row(&mut self) -> JoinResult<Option<JoinRow>> {
        loop {
            match self.state {
                State::Advance => {
                    let aligned = match self.align_cursors() {
                        Ok(aligned) => aligned,
                        Err(err) => return Err(self.fail(err)),
                    };
                    match aligned {
                        None => {
                            self.close();
                            self.state = State::Done;
                        }
                        Some(key) => match self.buffer_match(key) {
                            Ok(product) => {
                                self.product = Some(product);
                                self.state = State::Emit;
                            }
                            Err(err) => return Err(self.fail(err)),
                        },
                    }
                }
                State::Emit => {
                    if self.ctx.stop.is_raised() {
                        self.close();
                        self.state = State::Done;
                        continue;
                    }
                    if let Some(row) = self.product.as_mut().and_then(GroupProduct::next_row) {
                        self.ctx.metrics.increment_rows_emitted();
                        return Ok(Some(row));
                    }
                    // Product drained: consume the matched group everywhere.
                    self.product = None;
                    let mut advance_error = None;
                    for part in self.parts.iter_mut() {
                        if let Err(err) = part.cursor.advance_past_key() {
                            advance_error = Some(JoinError::from(err));
                            break;
                        }
                    }
                    if let Some(err) = advance_error {
                        return Err(self.fail(err));
                    }
                    self.state = State::Advance;
                }
                State::Done => return Ok(None),
                State::Cancelled => return Err(JoinError::killed()),
            }
        }
    }

    /// Drains the remaining rows into a vector
    pub fn drain(&mut self) -> JoinResult<Vec<JoinRow>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_row()? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Advances cursors until all share a key (Some) or any exhausts (None).
    fn align_cursors(&mut self) -> JoinResult<Option<SortKey>> {
        let direction = self.direction;
        loop {
            if self.ctx.cancel.is_cancelled() {
                return Err(JoinError::killed());
            }

            let mut max_key: Option<SortKey> = None;
            for part in self.parts.iter_mut() {
                let Some(key) = part.cursor.peek_key()? else {
                    return Ok(None);
                };
                max_key = Some(match max_key {
                    None => key,
                    Some(current) => {
                        if direction.compare(&key, &current) == Ordering::Greater {
                            key
                        } else {
                            current
                        }
                    }
                });
            }
            let Some(target) = max_key else {
                return Ok(None);
            };

            let mut aligned = true;
            for part in self.parts.iter_mut() {
                let Some(key) = part.cursor.peek_key()? else {
                    return Ok(None);
                };
                if direction.compare(&key, &target) == Ordering::Less {
                    part.cursor.advance_past_key()?;
                    aligned = false;
                }
            }
            if aligned {
                return Ok(Some(target));
            }
        }
    }

    /// Buffers every participant's duplicate group for the matched key and
    /// prepares the cross product.
    fn buffer_match(&mut self, key: SortKey) -> JoinResult<GroupProduct> {
        let mut groups = Vec::with_capacity(self.parts.len());
        for part in self.parts.iter_mut() {
            let entries = part.cursor.read_group()?;
            let mut bindings = Vec::with_capacity(entries.len());
            for entry in &entries {
                if let Some(binding) =
                    Self::entry_binding(part, self.resolver.as_ref(), &self.ctx.metrics, entry)?
                {
                    bindings.push(binding);
                }
            }
            groups.push(bindings);
        }

        if let Some(limit) = self.config.group_buffer_limit {
            let product_size = groups
                .iter()
                .fold(1usize, |acc, group| acc.saturating_mul(group.len()));
            if product_size > limit {
                return Err(JoinError::group_limit(product_size, limit));
            }
        }

        self.ctx.metrics.increment_groups_matched();
        Ok(GroupProduct::new(key, groups))
    }

    /// Builds the binding for one group entry, applying the participant's
    /// pushed-down filter. Returns None when the filter rejects the entry.
    fn entry_binding(
        part: &ParticipantState,
        resolver: &dyn DocumentResolver,
        metrics: &MetricsRegistry,
        entry: &IndexEntry,
    ) -> JoinResult<Option<RowBinding>> {
        let projection = &part.projection;
        let covered = projection.index_covers_projections;
        let needs_scan_values = part.participant.local_filter.is_some()
            || projection.produces_output
            || !projection.filter_projections.is_empty();

        // The index snapshot and the scan share one stable view, so an
        // entry whose document cannot be fetched here is a structural
        // fault, unlike the recoverable miss at late materialization.
        let mut fetched: Option<Value> = None;
        if !covered && needs_scan_values && !projection.late_materialized {
            let doc = resolver.resolve(&entry.handle)?.ok_or_else(|| {
                JoinError::storage_failed(format!(
                    "document {} vanished from the scan snapshot",
                    entry.handle
                ))
            })?;
            metrics.increment_documents_fetched();
            fetched = Some(doc.body);
        }

        if let Some(filter) = &part.participant.local_filter {
            let passes = if covered {
                filter.matches(&entry.project(part.needed.iter()))
            } else {
                match &fetched {
                    Some(body) => filter.matches(body),
                    None => filter.matches(&Value::Null),
                }
            };
            if !passes {
                return Ok(None);
            }
        }

        let binding = if !projection.produces_output {
            RowBinding::Materialized(Value::Null)
        } else if projection.late_materialized {
            RowBinding::Deferred(entry.handle.clone())
        } else if covered {
            RowBinding::Materialized(entry.project(projection.projections.iter()))
        } else {
            RowBinding::Materialized(fetched.take().unwrap_or(Value::Null))
        };
        Ok(Some(binding))
    }

    /// Closes all cursors; the join cannot produce further rows.
    fn close(&mut self) {
        self.parts.clear();
        self.product = None;
    }

    /// Closes the join after an error, routing cancellation to the
    /// Cancelled state and everything else to Done.
    fn fail(&mut self, err: JoinError) -> JoinError {
        self.close();
        if err.is_killed() {
            self.ctx.metrics.increment_queries_killed();
            self.state = State::Cancelled;
        } else {
            self.state = State::Done;
        }
        err
    }
}
