//! Status and error types
//!
//! Recoverable failures flow through [`Status`] values returned from
//! executors and futures. Contract violations (calling a kind-restricted
//! iterator accessor, resetting past the end) are debug assertions, never
//! `Status`.

use thiserror::Error;

/// Error kinds produced by the query pipeline.
///
/// `success` and `partial-success` are result states, not errors, and are
/// tracked on [`crate::context::ExecResult`] instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// Query text could not be parsed
    #[error("Syntax error: {0}")]
    Syntax(String),

    /// Query is well-formed but semantically invalid
    #[error("Semantic error: {0}")]
    Semantic(String),

    /// Space, tag, or edge schema does not exist
    #[error("Schema not found: {0}")]
    SchemaNotFound(String),

    /// Operation not allowed for the current role
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A storage RPC failed entirely
    #[error("Storage rpc failed: {0}")]
    StorageRpcFailed(String),

    /// One or more storage partitions failed and partial results were not
    /// accepted
    #[error("Partition failed: {0}")]
    PartitionFailed(String),

    /// Query exceeded its deadline
    #[error("Query timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// Query was cancelled by the client or the session
    #[error("Query cancelled")]
    Cancelled,

    /// An input value is not a valid vertex id for the space
    #[error("Invalid vid: {0}")]
    InvalidVid(String),

    /// An expression evaluated to a value of the wrong type
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// The per-query memory budget was exceeded
    #[error("Out of memory: used {used} bytes, limit {limit} bytes")]
    OutOfMemory { limit: usize, used: usize },

    /// Invariant violation inside the engine
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Status {
    /// Wrap a failing status with the plan-node kind that observed it.
    ///
    /// Used when a downstream executor republishes an upstream failure.
    /// Cancellation and timeouts stay unwrapped so the root status keeps its
    /// kind.
    pub fn with_node(self, node_name: &str) -> Status {
        match self {
            Status::Cancelled | Status::Timeout { .. } => self,
            other => Status::Internal(format!("{node_name}: {other}")),
        }
    }
}

/// Result type for status-returning operations
pub type StatusResult<T> = Result<T, Status>;

/// Per-partition error codes carried in storage responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Succeeded,
    PartNotFound,
    LeaderChanged,
    ConsensusError,
    DataError,
    KeyNotFound,
    RpcFailure,
    Unknown,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorCode::Succeeded => "SUCCEEDED",
            ErrorCode::PartNotFound => "E_PART_NOT_FOUND",
            ErrorCode::LeaderChanged => "E_LEADER_CHANGED",
            ErrorCode::ConsensusError => "E_CONSENSUS_ERROR",
            ErrorCode::DataError => "E_DATA_ERROR",
            ErrorCode::KeyNotFound => "E_KEY_NOT_FOUND",
            ErrorCode::RpcFailure => "E_RPC_FAILURE",
            ErrorCode::Unknown => "E_UNKNOWN",
        };
        f.write_str(name)
    }
}
