//! Error types for hub communication.

use thiserror::Error;

/// Result type for hub client operations.
pub type Result<T> = std::result::Result<T, LinkError>;

/// Errors raised while talking to a hub.
#[derive(Error, Debug)]
pub enum LinkError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("hub request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The hub rejected the request.
    #[error("hub returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The configured token was rejected.
    #[error("hub authentication failed: {0}")]
    Unauthorized(String),

    /// The client was built with incomplete configuration.
    #[error("hub client misconfigured: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
