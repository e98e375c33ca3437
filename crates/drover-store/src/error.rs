//! Error types for storage operations.

use thiserror::Error;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while reading or writing the backing store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Generic failure reported by the object store.
    #[error("object store error: {0}")]
    ObjectStore(String),

    /// Invalid input detected before any store interaction.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A key that does not decode as the expected head or artifact layout.
    #[error("invalid key format: {0}")]
    InvalidKey(String),

    /// The referenced object does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Network or storage failure while moving artifact bytes. Re-invoking
    /// the same call is the prescribed recovery; writes are idempotent by
    /// key.
    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<object_store::Error> for StoreError {
    fn from(err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { path, .. } => StoreError::NotFound(path),
            other => StoreError::ObjectStore(other.to_string()),
        }
    }
}
