//! The polymorphic backend contract.
//!
//! Every variant (local filesystem, object-store cloud, remote hub) exposes
//! the same operations with identical semantics; callers select one through
//! the registry and program against this trait alone.

use std::path::Path;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use drover_commons::{
    Artifact, Job, JobHead, JobId, LogEvent, RepoAddress, RepoCredentials, RunHead, RunName,
    Secret, TagHead, TagName,
};

use crate::error::Result;
use crate::runs::aggregate_run_heads;

/// Lazy, timestamp-ordered sequence of log events.
///
/// In attached mode the sequence is unbounded: it keeps polling for new
/// events until the caller stops consuming. Dropping the stream at any point
/// is the supported cancellation path and releases every underlying
/// resource.
pub type LogEventStream = Pin<Box<dyn Stream<Item = Result<LogEvent>> + Send>>;

/// The backend contract: submission, listing, stopping, tagging, log
/// streaming, secrets and artifact transfer.
///
/// Operations behave as single synchronous calls from the caller's
/// perspective; implementations may parallelize internally (bounded worker
/// pools for file transfer) but must never let a logical operation appear
/// partially complete to another caller outside the documented safe-crash
/// points.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Stable name used for registry lookup ("local", "cloud", "hub").
    fn name(&self) -> &'static str;

    /// Whether this backend found a loadable configuration. Unloaded
    /// backends are skipped during selection.
    fn is_loaded(&self) -> bool;

    /// Allocates a fresh, unique run name within the repository.
    async fn create_run(&self, repo_address: &RepoAddress) -> Result<RunName>;

    /// Persists a job (body plus listable head marker).
    async fn create_job(&self, job: &Job) -> Result<()>;

    /// Creates the job and hands it to a runner.
    async fn submit_job(&self, job: &Job) -> Result<()> {
        self.create_job(job).await?;
        self.run_job(job).await
    }

    async fn get_job(&self, repo_address: &RepoAddress, job_id: &JobId) -> Result<Option<Job>>;

    /// Lists job heads, optionally filtered to one run. Concurrently
    /// observable duplicates from an unfinished head replace are resolved in
    /// favor of the greatest `submitted_at`.
    async fn list_job_heads(
        &self,
        repo_address: &RepoAddress,
        run_name: Option<&RunName>,
    ) -> Result<Vec<JobHead>>;

    /// Hands an already-created job to a runner.
    async fn run_job(&self, job: &Job) -> Result<()>;

    /// Signals one job to stop; `abort` requests a hard kill instead of a
    /// graceful stop. Advisory: returns once the signal is issued, not once
    /// the remote side confirms termination. Stopping a finished job is a
    /// silent no-op.
    async fn stop_job(
        &self,
        repo_address: &RepoAddress,
        job_id: &JobId,
        abort: bool,
    ) -> Result<()>;

    /// Cascades [`stop_job`](Self::stop_job) over every head matching the
    /// run/workflow filter whose status is unfinished at listing time. A
    /// head finishing between listing and stop is a silent no-op, not an
    /// error.
    async fn stop_jobs(
        &self,
        repo_address: &RepoAddress,
        run_name: Option<&RunName>,
        workflow_name: Option<&str>,
        abort: bool,
    ) -> Result<()> {
        let job_heads = self.list_job_heads(repo_address, run_name).await?;
        for head in job_heads {
            if let Some(workflow) = workflow_name {
                if head.workflow_name.as_deref() != Some(workflow) {
                    continue;
                }
            }
            if head.status.is_unfinished() {
                self.stop_job(repo_address, &head.job_id, abort).await?;
            }
        }
        Ok(())
    }

    /// Folds job heads into run views (runs are never stored; every listing
    /// recomputes them).
    async fn list_run_heads(
        &self,
        repo_address: &RepoAddress,
        run_name: Option<&RunName>,
    ) -> Result<Vec<RunHead>> {
        let job_heads = self.list_job_heads(repo_address, run_name).await?;
        Ok(aggregate_run_heads(repo_address, job_heads))
    }

    /// Streams log events of a run from `start_time` on. See
    /// [`LogEventStream`] for the attached-mode contract.
    async fn poll_logs(
        &self,
        repo_address: &RepoAddress,
        run_name: &RunName,
        start_time: i64,
        attached: bool,
    ) -> Result<LogEventStream>;

    // -- artifacts ----------------------------------------------------------

    async fn list_run_artifact_files(
        &self,
        repo_address: &RepoAddress,
        run_name: &RunName,
    ) -> Result<Vec<Artifact>>;

    async fn download_run_artifact_files(
        &self,
        repo_address: &RepoAddress,
        run_name: &RunName,
        output_dir: &Path,
        output_job_dirs: bool,
    ) -> Result<()>;

    /// Uploads a local directory as one named artifact of the job. Fails
    /// fast, before any remote call, if the directory does not exist.
    async fn upload_job_artifact_files(
        &self,
        job: &Job,
        artifact_name: &str,
        local_dir: &Path,
    ) -> Result<()>;

    /// One-level folder listing inside a job's artifacts, for interactive
    /// browsing. `path` is relative to the job and starts with the artifact
    /// name. Returns `(name, is_folder)` pairs.
    async fn list_job_artifact_folder(
        &self,
        job: &Job,
        path: &str,
    ) -> Result<Vec<(String, bool)>>;

    // -- tags ---------------------------------------------------------------

    async fn list_tag_heads(&self, repo_address: &RepoAddress) -> Result<Vec<TagHead>>;

    async fn get_tag_head(
        &self,
        repo_address: &RepoAddress,
        tag_name: &TagName,
    ) -> Result<Option<TagHead>>;

    /// Tags an existing run's artifacts.
    async fn add_tag_from_run(
        &self,
        repo_address: &RepoAddress,
        tag_name: &TagName,
        run_name: &RunName,
    ) -> Result<()>;

    /// Creates a tag out of local directories: anchors them under a
    /// placeholder job, uploads every directory as one named artifact, then
    /// writes the tag head strictly last, so the tag is observable only once
    /// all its artifacts exist.
    async fn add_tag_from_local_dirs(
        &self,
        repo_address: &RepoAddress,
        tag_name: &TagName,
        local_dirs: &[std::path::PathBuf],
    ) -> Result<()>;

    /// Removes the tag head only; referenced artifacts are not reclaimed.
    async fn delete_tag_head(&self, repo_address: &RepoAddress, tag_head: &TagHead)
        -> Result<()>;

    // -- repo credentials ---------------------------------------------------

    async fn get_repo_credentials(
        &self,
        repo_address: &RepoAddress,
    ) -> Result<Option<RepoCredentials>>;

    async fn save_repo_credentials(
        &self,
        repo_address: &RepoAddress,
        credentials: &RepoCredentials,
    ) -> Result<()>;

    // -- secrets ------------------------------------------------------------

    async fn list_secret_names(&self, repo_address: &RepoAddress) -> Result<Vec<String>>;

    async fn get_secret(
        &self,
        repo_address: &RepoAddress,
        secret_name: &str,
    ) -> Result<Option<Secret>>;

    async fn add_secret(&self, repo_address: &RepoAddress, secret: &Secret) -> Result<()>;

    async fn update_secret(&self, repo_address: &RepoAddress, secret: &Secret) -> Result<()>;

    async fn delete_secret(&self, repo_address: &RepoAddress, secret_name: &str) -> Result<()>;
}
