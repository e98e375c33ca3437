//! Backend implementation over a [`Storage`] handle.
//!
//! The local and cloud variants differ only in how the store handle is
//! built (a rooted local filesystem vs. an S3 bucket); everything else
//! (heads, runs, tags, artifacts, secrets, logs) is this one implementation
//! delegating to the `base` modules.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use object_store::ObjectStore;

use drover_commons::{
    Artifact, Job, JobHead, JobId, RepoAddress, RepoCredentials, RunName, Secret, TagHead,
    TagName,
};
use drover_store::{artifacts, LogProgress, Storage};

use crate::backend::{Backend, LogEventStream};
use crate::base::{jobs, logs, runs, secrets, tags};
use crate::error::{BackendError, Result};

/// A backend running the head/artifact scheme directly against a store.
pub struct StoreBackend {
    name: &'static str,
    storage: Option<Storage>,
}

impl StoreBackend {
    /// A backend in the not-configured state: visible in the registry,
    /// skipped during selection.
    pub fn unconfigured(name: &'static str) -> Self {
        Self {
            name,
            storage: None,
        }
    }

    /// A backend over an already-built store handle.
    pub fn with_store(name: &'static str, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            name,
            storage: Some(Storage::new(store)),
        }
    }

    fn storage(&self) -> Result<&Storage> {
        self.storage.as_ref().ok_or_else(|| {
            BackendError::NotConfigured(format!("the '{}' backend is not configured", self.name))
        })
    }
}

#[async_trait]
impl Backend for StoreBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_loaded(&self) -> bool {
        self.storage.is_some()
    }

    async fn create_run(&self, repo_address: &RepoAddress) -> Result<RunName> {
        runs::create_run(self.storage()?, repo_address).await
    }

    async fn create_job(&self, job: &Job) -> Result<()> {
        jobs::create_job(self.storage()?, &job.repo_address, job, true).await
    }

    async fn get_job(&self, repo_address: &RepoAddress, job_id: &JobId) -> Result<Option<Job>> {
        jobs::get_job(self.storage()?, repo_address, job_id).await
    }

    async fn list_job_heads(
        &self,
        repo_address: &RepoAddress,
        run_name: Option<&RunName>,
    ) -> Result<Vec<JobHead>> {
        jobs::list_job_heads(self.storage()?, repo_address, run_name).await
    }

    async fn run_job(&self, job: &Job) -> Result<()> {
        jobs::run_job(self.storage()?, &job.repo_address, job).await
    }

    async fn stop_job(
        &self,
        repo_address: &RepoAddress,
        job_id: &JobId,
        abort: bool,
    ) -> Result<()> {
        jobs::stop_job(self.storage()?, repo_address, job_id, abort).await
    }

    async fn poll_logs(
        &self,
        repo_address: &RepoAddress,
        run_name: &RunName,
        start_time: i64,
        attached: bool,
    ) -> Result<LogEventStream> {
        Ok(logs::poll_log_events(
            self.storage()?.clone(),
            repo_address,
            run_name,
            start_time,
            attached,
        ))
    }

    async fn list_run_artifact_files(
        &self,
        repo_address: &RepoAddress,
        run_name: &RunName,
    ) -> Result<Vec<Artifact>> {
        Ok(artifacts::list_run_artifact_files(self.storage()?, repo_address, run_name).await?)
    }

    async fn download_run_artifact_files(
        &self,
        repo_address: &RepoAddress,
        run_name: &RunName,
        output_dir: &Path,
        output_job_dirs: bool,
    ) -> Result<()> {
        let progress = LogProgress::new(format!("downloading artifacts of '{run_name}'"));
        artifacts::download_run_artifacts(
            self.storage()?,
            repo_address,
            run_name,
            output_dir,
            output_job_dirs,
            &progress,
        )
        .await?;
        Ok(())
    }

    async fn upload_job_artifact_files(
        &self,
        job: &Job,
        artifact_name: &str,
        local_dir: &Path,
    ) -> Result<()> {
        let progress = LogProgress::new(format!("uploading artifact '{artifact_name}'"));
        artifacts::upload_artifact_dir(
            self.storage()?,
            &job.repo_address,
            &job.run_name,
            &job.job_id,
            artifact_name,
            local_dir,
            &progress,
        )
        .await?;
        Ok(())
    }

    async fn list_job_artifact_folder(
        &self,
        job: &Job,
        path: &str,
    ) -> Result<Vec<(String, bool)>> {
        Ok(artifacts::list_artifact_folder(
            self.storage()?,
            &job.repo_address,
            &job.run_name,
            &job.job_id,
            path,
        )
        .await?)
    }

    async fn list_tag_heads(&self, repo_address: &RepoAddress) -> Result<Vec<TagHead>> {
        tags::list_tag_heads(self.storage()?, repo_address).await
    }

    async fn get_tag_head(
        &self,
        repo_address: &RepoAddress,
        tag_name: &TagName,
    ) -> Result<Option<TagHead>> {
        tags::get_tag_head(self.storage()?, repo_address, tag_name).await
    }

    async fn add_tag_from_run(
        &self,
        repo_address: &RepoAddress,
        tag_name: &TagName,
        run_name: &RunName,
    ) -> Result<()> {
        tags::add_tag_from_run(self.storage()?, repo_address, tag_name, run_name).await
    }

    async fn add_tag_from_local_dirs(
        &self,
        repo_address: &RepoAddress,
        tag_name: &TagName,
        local_dirs: &[PathBuf],
    ) -> Result<()> {
        tags::add_tag_from_local_dirs(self.storage()?, repo_address, tag_name, local_dirs).await
    }

    async fn delete_tag_head(
        &self,
        repo_address: &RepoAddress,
        tag_head: &TagHead,
    ) -> Result<()> {
        tags::delete_tag_head(self.storage()?, repo_address, tag_head).await
    }

    async fn get_repo_credentials(
        &self,
        repo_address: &RepoAddress,
    ) -> Result<Option<RepoCredentials>> {
        secrets::get_repo_credentials(self.storage()?, repo_address).await
    }

    async fn save_repo_credentials(
        &self,
        repo_address: &RepoAddress,
        credentials: &RepoCredentials,
    ) -> Result<()> {
        secrets::save_repo_credentials(self.storage()?, repo_address, credentials).await
    }

    async fn list_secret_names(&self, repo_address: &RepoAddress) -> Result<Vec<String>> {
        secrets::list_secret_names(self.storage()?, repo_address).await
    }

    async fn get_secret(
        &self,
        repo_address: &RepoAddress,
        secret_name: &str,
    ) -> Result<Option<Secret>> {
        secrets::get_secret(self.storage()?, repo_address, secret_name).await
    }

    async fn add_secret(&self, repo_address: &RepoAddress, secret: &Secret) -> Result<()> {
        secrets::add_secret(self.storage()?, repo_address, secret).await
    }

    async fn update_secret(&self, repo_address: &RepoAddress, secret: &Secret) -> Result<()> {
        secrets::update_secret(self.storage()?, repo_address, secret).await
    }

    async fn delete_secret(&self, repo_address: &RepoAddress, secret_name: &str) -> Result<()> {
        secrets::delete_secret(self.storage()?, repo_address, secret_name).await
    }
}
