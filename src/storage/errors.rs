//! Storage seam errors
//!
//! Faults crossing the storage boundary are structural: the join aborts on
//! any of them. A missing document is not an error (`Ok(None)` from the
//! resolver) - the caller decides whether a miss is recoverable.

use thiserror::Error;

/// Result type for storage seam operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors surfaced by the storage seam
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Collection does not exist in the store
    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    /// Reading a document failed below the seam
    #[error("document read failed for {handle}: {reason}")]
    ReadFailed {
        /// Handle of the document being read
        handle: String,
        /// Underlying failure description
        reason: String,
    },

    /// A point-in-time scan of a collection could not be taken
    #[error("collection scan failed for {0}: {1}")]
    ScanFailed(String, String),
}

impl StorageError {
    /// Create a read failure for a handle
    pub fn read_failed(handle: impl Into<String>, reason: impl Into<String>) -> Self {
        StorageError::ReadFailed {
            handle: handle.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_handle() {
        let err = StorageError::read_failed("users/alice", "socket closed");
        let text = err.to_string();
        assert!(text.contains("users/alice"));
        assert!(text.contains("socket closed"));
    }

    #[test]
    fn test_unknown_collection_display() {
        let err = StorageError::UnknownCollection("orders".to_string());
        assert_eq!(err.to_string(), "unknown collection: orders");
    }
}
