//! Store error types.
//!
//! Every store operation is a network call in the production backend, so the
//! error carries the operation that failed alongside a sanitized reason.

use std::fmt;

use thiserror::Error;

/// The store operation an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    Connect,
    Ping,
    SaveMemory,
    GetMemory,
    DeleteMemory,
    QueryRecent,
    SaveCheckpoint,
    LoadCheckpoint,
    ListCheckpoints,
    AcquireLock,
    ReleaseLock,
}

impl StoreOperation {
    /// Stable snake_case name used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreOperation::Connect => "connect",
            StoreOperation::Ping => "ping",
            StoreOperation::SaveMemory => "save_memory",
            StoreOperation::GetMemory => "get_memory",
            StoreOperation::DeleteMemory => "delete_memory",
            StoreOperation::QueryRecent => "query_recent",
            StoreOperation::SaveCheckpoint => "save_checkpoint",
            StoreOperation::LoadCheckpoint => "load_checkpoint",
            StoreOperation::ListCheckpoints => "list_checkpoints",
            StoreOperation::AcquireLock => "acquire_lock",
            StoreOperation::ReleaseLock => "release_lock",
        }
    }
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by [`crate::MemoryStore`] implementations.
///
/// Absence of a record is never an error: lookups return `Ok(None)`.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The backing store could not be reached or rejected the command.
    #[error("store unavailable during {operation}: {reason}")]
    Unavailable {
        operation: StoreOperation,
        reason: String,
    },

    /// A stored value could not be encoded or decoded.
    #[error("serialization failed during {operation}: {reason}")]
    Serialization {
        operation: StoreOperation,
        reason: String,
    },

    /// The store was configured with invalid parameters.
    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),
}

impl StoreError {
    pub fn unavailable(operation: StoreOperation, reason: impl Into<String>) -> Self {
        StoreError::Unavailable {
            operation,
            reason: reason.into(),
        }
    }

    pub fn serialization(operation: StoreOperation, reason: impl Into<String>) -> Self {
        StoreError::Serialization {
            operation,
            reason: reason.into(),
        }
    }

    /// The operation that failed, if the error is tied to one.
    pub fn operation(&self) -> Option<StoreOperation> {
        match self {
            StoreError::Unavailable { operation, .. }
            | StoreError::Serialization { operation, .. } => Some(*operation),
            StoreError::InvalidConfig(_) => None,
        }
    }

    /// Whether a caller-side retry could plausibly succeed.
    ///
    /// The store itself never retries; retry policy belongs to the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable { .. })
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_names_operation() {
        let err = StoreError::unavailable(StoreOperation::SaveMemory, "connection refused");
        assert_eq!(
            err.to_string(),
            "store unavailable during save_memory: connection refused"
        );
    }

    #[test]
    fn test_is_retryable() {
        assert!(StoreError::unavailable(StoreOperation::Ping, "timeout").is_retryable());
        assert!(
            !StoreError::serialization(StoreOperation::LoadCheckpoint, "bad json").is_retryable()
        );
        assert!(!StoreError::InvalidConfig("pool size".into()).is_retryable());
    }

    #[test]
    fn test_operation_accessor() {
        let err = StoreError::serialization(StoreOperation::QueryRecent, "x");
        assert_eq!(err.operation(), Some(StoreOperation::QueryRecent));
        assert_eq!(StoreError::InvalidConfig("x".into()).operation(), None);
    }
}
