//! Secrets exposed to runners as environment values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A named secret scoped to a repository.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    pub secret_name: String,
    pub secret_value: String,
}

// Manual Debug so values never leak into logs.
impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("secret_name", &self.secret_name)
            .field("secret_value", &"********")
            .finish()
    }
}
