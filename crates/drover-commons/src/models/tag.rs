//! Tags: named, immutable pointers to a run's artifacts.

use serde::{Deserialize, Serialize};

use crate::ids::{RunName, TagName};
use crate::models::artifact::ArtifactHead;
use crate::models::repo::RepoAddress;

/// An immutable pointer from a tag name to a run and the artifacts it
/// produced.
///
/// A tag head must never be observable before every artifact it references
/// has been durably stored; deleting a tag removes only the head, never the
/// referenced artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagHead {
    pub repo_address: RepoAddress,
    pub tag_name: TagName,
    pub run_name: RunName,
    pub workflow_name: Option<String>,
    pub provider_name: Option<String>,
    pub created_at: i64,
    #[serde(default)]
    pub artifact_heads: Vec<ArtifactHead>,
}
