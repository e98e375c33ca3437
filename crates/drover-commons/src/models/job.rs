//! Jobs: the unit of execution a backend submits and tracks.
//!
//! A [`Job`] carries the full, immutable submission spec plus the fields the
//! backend mutates as execution progresses (status, host, ports). A
//! [`JobHead`] is the compact projection of a job that fits into a single
//! listable storage key; it is what run aggregation consumes.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CommonsError;
use crate::ids::{JobId, RunName, TagName};
use crate::models::app::AppSpec;
use crate::models::artifact::ArtifactSpec;
use crate::models::repo::RepoAddress;
use crate::models::requirements::Requirements;

/// Job lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Submitted,
    Downloading,
    Running,
    Uploading,
    Stopping,
    Aborting,
    Stopped,
    Aborted,
    Failed,
    Done,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Submitted => "submitted",
            JobStatus::Downloading => "downloading",
            JobStatus::Running => "running",
            JobStatus::Uploading => "uploading",
            JobStatus::Stopping => "stopping",
            JobStatus::Aborting => "aborting",
            JobStatus::Stopped => "stopped",
            JobStatus::Aborted => "aborted",
            JobStatus::Failed => "failed",
            JobStatus::Done => "done",
        }
    }

    /// True while the job still occupies a runner (no terminal state reached).
    pub fn is_unfinished(&self) -> bool {
        !self.is_finished()
    }

    /// True once the job reached a terminal state.
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            JobStatus::Stopped | JobStatus::Aborted | JobStatus::Failed | JobStatus::Done
        )
    }

    /// Total order over statuses by lifecycle progress.
    ///
    /// Used to merge concurrently observed heads of the same job (the
    /// further-progressed head wins) and to pick a deterministic run status
    /// among several unfinished members.
    pub fn progress_rank(&self) -> u8 {
        match self {
            JobStatus::Submitted => 0,
            JobStatus::Downloading => 1,
            JobStatus::Running => 2,
            JobStatus::Uploading => 3,
            JobStatus::Stopping => 4,
            JobStatus::Aborting => 5,
            JobStatus::Stopped => 6,
            JobStatus::Aborted => 7,
            JobStatus::Failed => 8,
            JobStatus::Done => 9,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = CommonsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submitted" => Ok(JobStatus::Submitted),
            "downloading" => Ok(JobStatus::Downloading),
            "running" => Ok(JobStatus::Running),
            "uploading" => Ok(JobStatus::Uploading),
            "stopping" => Ok(JobStatus::Stopping),
            "aborting" => Ok(JobStatus::Aborting),
            "stopped" => Ok(JobStatus::Stopped),
            "aborted" => Ok(JobStatus::Aborted),
            "failed" => Ok(JobStatus::Failed),
            "done" => Ok(JobStatus::Done),
            other => Err(CommonsError::invalid_input(format!(
                "unknown job status: {other}"
            ))),
        }
    }
}

/// A resolved dependency: points at a prior run whose artifacts are exposed
/// as input to the new job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dep {
    pub repo_user_name: String,
    pub repo_name: String,
    pub run_name: RunName,
}

/// One execution unit.
///
/// Spec fields are immutable after submission; `status`, `host_name` and
/// `ports` mutate as execution progresses and are written exclusively by the
/// backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: JobId,
    pub repo_address: RepoAddress,
    pub run_name: RunName,
    pub workflow_name: Option<String>,
    pub provider_name: Option<String>,
    pub status: JobStatus,
    pub submitted_at: i64,
    pub image_name: String,
    pub commands: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    pub working_dir: Option<String>,
    #[serde(default)]
    pub artifact_specs: Vec<ArtifactSpec>,
    pub port_count: Option<u16>,
    #[serde(default)]
    pub ports: Vec<u16>,
    pub host_name: Option<String>,
    pub requirements: Option<Requirements>,
    #[serde(default)]
    pub deps: Vec<Dep>,
    #[serde(default)]
    pub app_specs: Vec<AppSpec>,
    pub tag_name: Option<TagName>,
}

impl Job {
    /// The compact, listable projection of this job.
    pub fn head(&self) -> JobHead {
        JobHead {
            job_id: self.job_id.clone(),
            run_name: self.run_name.clone(),
            workflow_name: self.workflow_name.clone(),
            provider_name: self.provider_name.clone(),
            status: self.status,
            submitted_at: self.submitted_at,
            artifact_paths: self
                .artifact_specs
                .iter()
                .map(|spec| spec.artifact_path.clone())
                .collect(),
            app_names: self
                .app_specs
                .iter()
                .map(|spec| spec.app_name.clone())
                .collect(),
            tag_name: self.tag_name.clone(),
        }
    }
}

/// Compact projection of a [`Job`], decodable from a single storage key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHead {
    pub job_id: JobId,
    pub run_name: RunName,
    pub workflow_name: Option<String>,
    pub provider_name: Option<String>,
    pub status: JobStatus,
    pub submitted_at: i64,
    #[serde(default)]
    pub artifact_paths: Vec<String>,
    #[serde(default)]
    pub app_names: Vec<String>,
    pub tag_name: Option<TagName>,
}

/// Provider output: everything needed to build a [`Job`] except run identity
/// and submission metadata, which the submission driver stamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub image_name: String,
    pub commands: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    pub working_dir: Option<String>,
    #[serde(default)]
    pub artifact_specs: Vec<ArtifactSpec>,
    pub port_count: Option<u16>,
    pub requirements: Option<Requirements>,
    #[serde(default)]
    pub app_specs: Vec<AppSpec>,
}
