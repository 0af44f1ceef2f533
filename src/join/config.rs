//! Join execution configuration

use serde::{Deserialize, Serialize};

/// Tunables for one join execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinConfig {
    /// Cap on the cross-product size buffered for one duplicate-key match.
    /// None means unbounded; exceeding the cap fails the query with
    /// CAIRN_JOIN_GROUP_LIMIT rather than spilling.
    pub group_buffer_limit: Option<usize>,
    /// Rows per materialization batch; each batch dedupes handle lookups
    /// independently.
    pub materialize_batch_size: usize,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            group_buffer_limit: None,
            materialize_batch_size: 128,
        }
    }
}
