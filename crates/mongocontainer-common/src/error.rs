//! Error types for mongocontainer

use thiserror::Error;

/// Result type alias for mongocontainer operations
pub type Result<T> = std::result::Result<T, ContainerError>;

/// Unified error type for all mongocontainer operations
///
/// A query that matches nothing is not an error; it resolves to an empty
/// result handle. `NoDocuments` is only produced when a caller explicitly
/// requires a document to be present.
#[derive(Error, Debug, Clone)]
pub enum ContainerError {
    /// Malformed URI, unreachable server or failed handshake during setup
    #[error("Connection error: {0}")]
    Connection(String),

    /// Driver failure during an operation, passed through unmodified
    #[cfg(feature = "mongodb-errors")]
    #[error("MongoDB error: {0}")]
    MongoDB(#[source] mongodb::error::Error),

    #[error("Disconnect error: {0}")]
    Disconnect(String),

    /// Operation attempted on a handle that has been disconnected
    #[error("Database handle is closed")]
    Closed,

    /// The caller's deadline expired before the operation completed
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The caller cancelled the operation
    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("No document matched the filter")]
    NoDocuments,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl ContainerError {
    /// Returns true if this error is potentially retryable.
    ///
    /// The adapter never retries on its own; this only informs callers.
    pub fn is_retryable(&self) -> bool {
        match self {
            ContainerError::Timeout(_) => true,
            #[cfg(feature = "mongodb-errors")]
            ContainerError::MongoDB(err) => {
                err.contains_label(mongodb::error::RETRYABLE_WRITE_ERROR)
                    || err.contains_label(mongodb::error::TRANSIENT_TRANSACTION_ERROR)
                    || matches!(*err.kind, mongodb::error::ErrorKind::Io(_))
            }
            _ => false,
        }
    }

    /// Returns true if the handle was already closed when the call was made
    pub fn is_closed(&self) -> bool {
        matches!(self, ContainerError::Closed)
    }
}

impl From<serde_json::Error> for ContainerError {
    fn from(err: serde_json::Error) -> Self {
        ContainerError::Serialization(err.to_string())
    }
}

// MongoDB-specific error conversions (when mongodb-errors feature is enabled)
#[cfg(feature = "mongodb-errors")]
impl From<mongodb::error::Error> for ContainerError {
    fn from(err: mongodb::error::Error) -> Self {
        ContainerError::MongoDB(err)
    }
}

#[cfg(feature = "mongodb-errors")]
impl From<bson::ser::Error> for ContainerError {
    fn from(err: bson::ser::Error) -> Self {
        ContainerError::Serialization(format!("BSON serialization error: {}", err))
    }
}

#[cfg(feature = "mongodb-errors")]
impl From<bson::de::Error> for ContainerError {
    fn from(err: bson::de::Error) -> Self {
        ContainerError::Deserialization(format!("BSON deserialization error: {}", err))
    }
}
