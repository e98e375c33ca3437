//! Error types for backend operations.

use thiserror::Error;

use drover_commons::CommonsError;
use drover_link::LinkError;
use drover_store::StoreError;

/// Result type for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Errors surfaced by the backend contract.
///
/// `InvalidInput` conditions are always detected before any remote side
/// effect; `Transfer` aborts only the remaining work of the current call
/// (writes are idempotent by key, so re-invoking the operation is the
/// prescribed recovery).
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend has no loadable configuration. Non-fatal during
    /// selection: the backend reports itself unavailable and is skipped.
    #[error("backend is not configured: {0}")]
    NotConfigured(String),

    /// A named backend is absent from the known set.
    #[error("backend not found: {0}")]
    BackendNotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("hub error: {0}")]
    Hub(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<StoreError> for BackendError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidInput(msg) => BackendError::InvalidInput(msg),
            StoreError::NotFound(msg) => BackendError::NotFound(msg),
            StoreError::Transfer(msg) => BackendError::Transfer(msg),
            StoreError::Serialization(err) => BackendError::Serialization(err),
            StoreError::Io(err) => BackendError::Io(err),
            other => BackendError::Storage(other.to_string()),
        }
    }
}

impl From<CommonsError> for BackendError {
    fn from(err: CommonsError) -> Self {
        match err {
            CommonsError::InvalidInput(msg) => BackendError::InvalidInput(msg),
            CommonsError::NotFound(msg) => BackendError::NotFound(msg),
        }
    }
}

impl From<LinkError> for BackendError {
    fn from(err: LinkError) -> Self {
        match err {
            LinkError::Config(msg) => BackendError::NotConfigured(msg),
            other => BackendError::Hub(other.to_string()),
        }
    }
}
