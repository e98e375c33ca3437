//! Type-safe wrapper for run names.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Type-safe wrapper for run names.
///
/// Run names group jobs into a run; they are allocated by the backend at
/// `create_run` time (mnemonic `{adjective}-{noun}-{n}` names) but any
/// string free of the key separators `/`, `;` and `,` is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunName(String);

impl RunName {
    /// Creates a new RunName from a string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the run name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the inner String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RunName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RunName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RunName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for RunName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
