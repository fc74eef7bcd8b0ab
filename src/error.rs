//! Error types for TableKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::protocol::FailReason;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Unified error type for TableKV operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    /// Malformed framing; the connection is terminated
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Illegal characters in a name or value
    #[error("Validation error: {0}")]
    Validation(String),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("No such table: {0}")]
    NoSuchTable(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Key already exists: {0}")]
    KeyExists(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Version conflict: expected counter {expected}, row is at {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    // -------------------------------------------------------------------------
    // Query Errors
    // -------------------------------------------------------------------------
    #[error("Invalid predicate: {0}")]
    InvalidPredicate(String),

    #[error("Query type error: {0}")]
    QueryType(String),

    // -------------------------------------------------------------------------
    // Client Errors
    // -------------------------------------------------------------------------
    /// The server answered with a FAIL status
    #[error("Request rejected by server: {0}")]
    Rejected(FailReason),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Concurrency Errors
    // -------------------------------------------------------------------------
    #[error("Worker pool error: {0}")]
    Pool(String),
}

impl KvError {
    /// The FAIL reason a session reports for this error
    pub fn fail_reason(&self) -> FailReason {
        match self {
            KvError::NoSuchTable(_) => FailReason::Table,
            KvError::KeyNotFound(_) | KvError::KeyExists(_) => FailReason::Key,
            KvError::SchemaMismatch(_) => FailReason::Column,
            KvError::VersionConflict { .. } => FailReason::Counter,
            KvError::InvalidPredicate(_) | KvError::QueryType(_) => FailReason::Predicate,
            KvError::Rejected(reason) => *reason,
            _ => FailReason::Invalid,
        }
    }
}
