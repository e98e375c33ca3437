//! # drover-commons
//!
//! Shared data model for drover: typed identifiers, job/run/tag entities,
//! resource requirements and common error kinds.
//!
//! This crate sits at the bottom of the workspace dependency graph and is
//! consumed by every other drover crate. It carries no storage or network
//! dependencies.

pub mod errors;
pub mod ids;
pub mod models;

// Re-export commonly used types
pub use errors::{CommonsError, Result};
pub use ids::{JobId, RunName, SnowflakeGenerator, TagName};
pub use models::app::{AppHead, AppSpec};
pub use models::artifact::{Artifact, ArtifactHead, ArtifactSpec};
pub use models::job::{Dep, Job, JobHead, JobSpec, JobStatus};
pub use models::log_event::{LogEvent, LogSource};
pub use models::repo::{RepoAddress, RepoCredentials, RepoProtocol};
pub use models::requirements::{parse_memory, GpusRequirements, Requirements};
pub use models::run::RunHead;
pub use models::secret::Secret;
pub use models::tag::TagHead;

/// Current time as milliseconds since the Unix epoch.
///
/// All `submitted_at`/`created_at` fields in the data model use this unit.
pub fn timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
