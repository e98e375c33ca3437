//! Shared error kinds for drover.
//!
//! Richer, crate-specific errors live downstream (`drover-store`,
//! `drover-link`, `drover-backend`); this type covers validation that has to
//! happen in the data model itself, without pulling in storage or network
//! dependencies.

use thiserror::Error;

/// Result type for data-model operations.
pub type Result<T> = std::result::Result<T, CommonsError>;

/// Errors raised by the shared data model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommonsError {
    /// Invalid input provided by the caller (malformed value, bad unit, ...).
    /// Always carries the offending input so the caller can report it.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl CommonsError {
    /// Creates an InvalidInput error with a message.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Creates a NotFound error with a message.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}
