//! Error types for the transaction table
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Errors are `Clone` because a single apply result is delivered both to the
//! waiting caller and to every completion callback registered on its
//! [`Pending`](crate::Pending) handle.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for transaction table operations
pub type TxResult<T> = std::result::Result<T, TxError>;

/// Error types for the transaction table
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TxError {
    /// Xid component exceeds the XA limits
    #[error("Invalid xid: {0}")]
    InvalidXid(String),

    /// Storage collaborator failed to execute an operation
    #[error("Storage error: {0}")]
    Storage(String),

    /// Apply did not complete within the caller's deadline
    #[error("Apply timed out after {0:?}")]
    Timeout(Duration),

    /// Apply was dropped before it produced a result
    ///
    /// Raised when the executing pool shuts down with the task still queued,
    /// or when the task itself panics.
    #[error("Apply cancelled before completion")]
    Cancelled,

    /// Broadcast to cluster members failed
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Payload encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be read, parsed or validated
    #[error("Configuration error: {0}")]
    Config(String),

    /// Worker pool refused the task (queue full or shut down)
    #[error("Task rejected: {0}")]
    Rejected(String),

    /// Local transaction runtime reported a failure while completing
    #[error(transparent)]
    LocalTx(#[from] LocalTxError),
}

impl TxError {
    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        TxError::Storage(message.into())
    }

    /// Create an RPC error
    pub fn rpc(message: impl Into<String>) -> Self {
        TxError::Rpc(message.into())
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        TxError::Serialization(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        TxError::Config(message.into())
    }

    /// True for failures where the apply may or may not have executed
    ///
    /// A caller that sees one of these must treat the outcome as unknown.
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, TxError::Timeout(_) | TxError::Cancelled)
    }
}

/// Outcome reported by the local transaction runtime when a commit or
/// rollback did not complete cleanly
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocalTxError {
    /// Some resources committed, others rolled back
    #[error("Heuristic mixed outcome")]
    HeuristicMixed,

    /// Resources rolled back on their own although commit was requested
    #[error("Heuristic rollback")]
    HeuristicRollback,

    /// Resources committed on their own although rollback was requested
    #[error("Heuristic commit")]
    HeuristicCommit,

    /// Any other runtime failure
    #[error("Local transaction failed: {0}")]
    Failed(String),
}

impl LocalTxError {
    /// True for heuristic outcomes
    pub fn is_heuristic(&self) -> bool {
        !matches!(self, LocalTxError::Failed(_))
    }
}
