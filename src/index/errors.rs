//! Index error types
//!
//! Error codes:
//! - CAIRN_INDEX_BUILD_FAILED (FATAL)
//! - CAIRN_INDEX_UNIQUE_VIOLATION (FATAL)
//! - CAIRN_INDEX_READ_FAILED (FATAL)

use std::fmt;

/// Severity levels for index errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// System must halt the affected query immediately
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Index-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexErrorCode {
    /// Index build from a collection scan failed
    CairnIndexBuildFailed,
    /// Duplicate key inserted into a unique index
    CairnIndexUniqueViolation,
    /// Cursor read failed below the storage seam
    CairnIndexReadFailed,
}

impl IndexErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            IndexErrorCode::CairnIndexBuildFailed => "CAIRN_INDEX_BUILD_FAILED",
            IndexErrorCode::CairnIndexUniqueViolation => "CAIRN_INDEX_UNIQUE_VIOLATION",
            IndexErrorCode::CairnIndexReadFailed => "CAIRN_INDEX_READ_FAILED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Fatal // All index errors abort the query
    }
}

impl fmt::Display for IndexErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Index error type with full context
#[derive(Debug, Clone)]
pub struct IndexError {
    /// Error code
    code: IndexErrorCode,
    /// Human-readable message
    message: String,
    /// Index name if applicable
    index: Option<String>,
}

impl IndexError {
    /// Create an index build failed error
    pub fn build_failed(index: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code: IndexErrorCode::CairnIndexBuildFailed,
            message: reason.into(),
            index: Some(index.into()),
        }
    }

    /// Create a unique violation error
    pub fn unique_violation(index: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            code: IndexErrorCode::CairnIndexUniqueViolation,
            message: format!("duplicate key {} in unique index", key.into()),
            index: Some(index.into()),
        }
    }

    /// Create a cursor read failure
    pub fn read_failed(reason: impl Into<String>) -> Self {
        Self {
            code: IndexErrorCode::CairnIndexReadFailed,
            message: reason.into(),
            index: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> IndexErrorCode {
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

    /// Returns the index name if applicable
    pub fn index(&self) -> Option<&str> {
        self.index.as_deref()
    }
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(index) = &self.index {
            write!(f, " [index {}]", index)?;
        }
        Ok(())
    }
}

impl std::error::Error for IndexError {}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            IndexErrorCode::CairnIndexBuildFailed.code(),
            "CAIRN_INDEX_BUILD_FAILED"
        );
        assert_eq!(
            IndexErrorCode::CairnIndexUniqueViolation.code(),
            "CAIRN_INDEX_UNIQUE_VIOLATION"
        );
        assert_eq!(
            IndexErrorCode::CairnIndexReadFailed.code(),
            "CAIRN_INDEX_READ_FAILED"
        );
    }

    #[test]
    fn test_all_index_errors_are_fatal() {
        let err = IndexError::unique_violation("idx_x", "42");
        assert_eq!(err.severity(), Severity::Fatal);
        assert_eq!(err.index(), Some("idx_x"));
    }

    #[test]
    fn test_display() {
        let err = IndexError::build_failed("idx_x", "collection vanished");
        let text = format!("{}", err);
        assert!(text.contains("CAIRN_INDEX_BUILD_FAILED"));
        assert!(text.contains("FATAL"));
        assert!(text.contains("idx_x"));
    }
}
