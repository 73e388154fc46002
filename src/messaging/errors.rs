//! # Store Error Types
//!
//! Failures of the shared list/hash store, as structured thiserror variants
//! instead of `Box<dyn Error>` patterns.

use thiserror::Error;

/// Store operation failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessagingError {
    #[error("Store connection error: {message}")]
    Connection { message: String },

    #[error("Queue operation failed: {queue_name}: {operation}: {message}")]
    QueueOperation {
        queue_name: String,
        operation: String,
        message: String,
    },

    #[error("Hash operation failed: {bucket}: {operation}: {message}")]
    HashOperation {
        bucket: String,
        operation: String,
        message: String,
    },

    #[error("Record serialization error: {message}")]
    RecordSerialization { message: String },

    #[error("Record deserialization error: {message}")]
    RecordDeserialization { message: String },
}

impl MessagingError {
    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a queue operation error
    pub fn queue_operation(
        queue_name: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::QueueOperation {
            queue_name: queue_name.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a hash operation error
    pub fn hash_operation(
        bucket: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::HashOperation {
            bucket: bucket.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a record serialization error
    pub fn record_serialization(message: impl Into<String>) -> Self {
        Self::RecordSerialization {
            message: message.into(),
        }
    }

    /// Create a record deserialization error
    pub fn record_deserialization(message: impl Into<String>) -> Self {
        Self::RecordDeserialization {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for MessagingError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_syntax() || err.is_data() || err.is_eof() {
            MessagingError::record_deserialization(err.to_string())
        } else {
            MessagingError::record_serialization(err.to_string())
        }
    }
}

/// Result type alias for store operations
pub type MessagingResult<T> = Result<T, MessagingError>;
