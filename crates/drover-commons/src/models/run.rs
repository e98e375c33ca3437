//! Runs: derived aggregates over job heads.

use serde::{Deserialize, Serialize};

use crate::ids::{RunName, TagName};
use crate::models::job::JobStatus;
use crate::models::repo::RepoAddress;

/// A run is a computed grouping of the jobs sharing `(run_name,
/// workflow_name)` within one repository.
///
/// Runs are never stored: every `RunHead` is folded out of job heads at
/// listing time. `submitted_at` is the minimum over the members, `status`
/// the deterministic merge of the member statuses, `artifacts` the
/// concatenation of member artifact lists (duplicates preserved).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunHead {
    pub repo_address: RepoAddress,
    pub run_name: RunName,
    pub workflow_name: Option<String>,
    pub provider_name: Option<String>,
    pub status: JobStatus,
    pub submitted_at: i64,
    #[serde(default)]
    pub artifact_paths: Vec<String>,
    pub tag_name: Option<TagName>,
}
