//! Error types for the replicated-store interface.

use thiserror::Error;

/// Result type alias for store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur against a region's replica.
///
/// Everything except `VersionConflict` and `InvalidTransition` is
/// transient from the caller's point of view: safe to retry on a
/// fresh invocation, never retried silently within one.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to open database: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("store unreachable: {0}")]
    Unreachable(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Optimistic-concurrency check failed: a concurrent invocation
    /// already advanced the failover record.
    #[error("version conflict: expected {expected}, found {found}")]
    VersionConflict { expected: u64, found: u64 },

    /// A finalized backup row cannot change status again.
    #[error("backup {backup_id} is already {status}")]
    InvalidTransition { backup_id: String, status: String },
}

impl StateError {
    /// Whether this error is an optimistic-concurrency conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}
