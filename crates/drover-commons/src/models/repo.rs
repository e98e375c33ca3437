//! Source repository identity and credentials.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a source repository; used as the namespace prefix for every
/// head and artifact key a backend writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoAddress {
    pub repo_user_name: String,
    pub repo_name: String,
}

impl RepoAddress {
    pub fn new(repo_user_name: impl Into<String>, repo_name: impl Into<String>) -> Self {
        Self {
            repo_user_name: repo_user_name.into(),
            repo_name: repo_name.into(),
        }
    }

    /// The repository path used inside storage keys: `{user}/{name}`.
    pub fn path(&self) -> String {
        format!("{}/{}", self.repo_user_name, self.repo_name)
    }
}

impl fmt::Display for RepoAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.repo_user_name, self.repo_name)
    }
}

/// Protocol used to reach the repository remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoProtocol {
    Https,
    Ssh,
}

/// Credentials a runner needs to fetch the repository.
///
/// Stored by the backend on behalf of the runner fleet; never logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoCredentials {
    pub protocol: RepoProtocol,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oauth_token: Option<String>,
}
