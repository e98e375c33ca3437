//! Artifacts: named directories of files produced by jobs.

use serde::{Deserialize, Serialize};

use crate::ids::JobId;

/// Declared at submission time: the path a job will produce as an artifact,
/// and whether the runner should mount it incrementally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSpec {
    pub artifact_path: String,
    #[serde(default)]
    pub mount: bool,
}

/// Identifies which job produced which artifact path; the unit a tag head
/// references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactHead {
    pub job_id: JobId,
    pub artifact_path: String,
}

/// One stored artifact file, as enumerated from storage keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub job_id: JobId,
    pub name: String,
    pub file: String,
    pub filesize_in_bytes: u64,
}
