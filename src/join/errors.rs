//! Join error types
//!
//! Error codes:
//! - CAIRN_JOIN_PLAN_INVALID (REJECT)
//! - CAIRN_JOIN_GROUP_LIMIT (ERROR)
//! - CAIRN_JOIN_STORAGE_FAILED (FATAL)
//! - CAIRN_QUERY_KILLED (KILLED)
//!
//! Structural errors abort the query; cancellation is a distinct,
//! non-error termination path; per-row materialization misses never
//! surface here at all (the row is dropped instead).

use std::fmt;

use crate::index::IndexError;
use crate::storage::StorageError;

/// Severity levels for join errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Query rejected at planning/construction time
    Reject,
    /// Query failed but the system is healthy
    Error,
    /// Structural fault, query aborted
    Fatal,
    /// Query terminated by cancellation, not a data error
    Killed,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
            Severity::Killed => write!(f, "KILLED"),
        }
    }
}

/// Join-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinErrorCode {
    /// Participants cannot be joined by this operator
    CairnJoinPlanInvalid,
    /// A duplicate-key cross product exceeded the configured buffer cap
    CairnJoinGroupLimit,
    /// A storage or index fault surfaced during the join
    CairnJoinStorageFailed,
    /// The query was cancelled
    CairnQueryKilled,
}

impl JoinErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            JoinErrorCode::CairnJoinPlanInvalid => "CAIRN_JOIN_PLAN_INVALID",
            JoinErrorCode::CairnJoinGroupLimit => "CAIRN_JOIN_GROUP_LIMIT",
            JoinErrorCode::CairnJoinStorageFailed => "CAIRN_JOIN_STORAGE_FAILED",
            JoinErrorCode::CairnQueryKilled => "CAIRN_QUERY_KILLED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            JoinErrorCode::CairnJoinPlanInvalid => Severity::Reject,
            JoinErrorCode::CairnJoinGroupLimit => Severity::Error,
            JoinErrorCode::CairnJoinStorageFailed => Severity::Fatal,
            JoinErrorCode::CairnQueryKilled => Severity::Killed,
        }
    }
}

impl fmt::Display for JoinErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Join error type with full context
#[derive(Debug, Clone)]
pub struct JoinError {
    /// Error code
    code: JoinErrorCode,
    /// Human-readable message
    message: String,
    /// Collection of the offending participant, if applicable
    participant: Option<String>,
}

impl JoinError {
    /// Create a planning rejection
    pub fn plan_invalid(reason: impl Into<String>) -> Self {
        Self {
            code: JoinErrorCode::CairnJoinPlanInvalid,
            message: reason.into(),
            participant: None,
        }
    }

    /// Create a planning rejection attributed to one participant
    pub fn plan_invalid_participant(
        collection: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            code: JoinErrorCode::CairnJoinPlanInvalid,
            message: reason.into(),
            participant: Some(collection.into()),
        }
    }

    /// Create a group buffer cap error
    pub fn group_limit(product: usize, limit: usize) -> Self {
        Self {
            code: JoinErrorCode::CairnJoinGroupLimit,
            message: format!(
                "duplicate-key cross product of {} rows exceeds buffer cap {}",
                product, limit
            ),
            participant: None,
        }
    }

    /// Create a storage fault error
    pub fn storage_failed(reason: impl Into<String>) -> Self {
        Self {
            code: JoinErrorCode::CairnJoinStorageFailed,
            message: reason.into(),
            participant: None,
        }
    }

    /// Create a cancellation outcome
    pub fn killed() -> Self {
        Self {
            code: JoinErrorCode::CairnQueryKilled,
            message: "query killed".to_string(),
            participant: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> JoinErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns whether this is a structural (fatal) failure
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    /// Returns whether this is the cancellation outcome
    pub fn is_killed(&self) -> bool {
        self.severity() == Severity::Killed
    }
}

impl fmt::Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(participant) = &self.participant {
            write!(f, " [participant {}]", participant)?;
        }
        Ok(())
    }
}

impl std::error::Error for JoinError {}

impl From<StorageError> for JoinError {
    fn from(err: StorageError) -> Self {
        JoinError::storage_failed(err.to_string())
    }
}

impl From<IndexError> for JoinError {
    fn from(err: IndexError) -> Self {
        JoinError::storage_failed(err.to_string())
    }
}

/// Result type for join operations
pub type JoinResult<T> = Result<T, JoinError>;
