//! The hub backend: a thin client forwarding every operation to a remote
//! service implementing the identical contract.
//!
//! Each method maps one-to-one onto a named endpoint of the hub (see
//! `drover-link`); no head or artifact logic runs on this side beyond what
//! is needed to move local files.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream;
use serde::{Deserialize, Serialize};

use drover_commons::{
    timestamp_millis, Artifact, ArtifactHead, Job, JobHead, JobId, LogEvent, RepoAddress,
    RepoCredentials, RunHead, RunName, Secret, SnowflakeGenerator, TagHead, TagName,
};
use drover_link::HubClient;
use drover_store::artifacts::{artifact_file_key, collect_files, relative_key_path};

use crate::backend::{Backend, LogEventStream};
use crate::error::{BackendError, Result};

pub const HUB_BACKEND_NAME: &str = "hub";

/// Delay between endpoint polls when an attached log stream has drained
/// everything.
const LOG_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// `[hub]` section of the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    pub url: String,
    pub token: String,
    pub hub_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

/// Backend forwarding to a remote hub.
pub struct HubBackend {
    client: Option<HubClient>,
}

impl HubBackend {
    /// Builds the hub backend; an absent or unbuildable section yields the
    /// unconfigured state rather than an error.
    pub fn from_config(config: Option<&HubConfig>) -> Self {
        let client = config.and_then(|config| {
            let mut builder = HubClient::builder()
                .base_url(&config.url)
                .hub_name(&config.hub_name)
                .token(&config.token);
            if let Some(seconds) = config.timeout_seconds {
                builder = builder.timeout(Duration::from_secs(seconds));
            }
            match builder.build() {
                Ok(client) => Some(client),
                Err(err) => {
                    log::warn!("hub backend: cannot build client: {err}");
                    None
                }
            }
        });
        Self { client }
    }

    fn client(&self) -> Result<&HubClient> {
        self.client.as_ref().ok_or_else(|| {
            BackendError::NotConfigured("the 'hub' backend is not configured".to_string())
        })
    }
}

#[async_trait]
impl Backend for HubBackend {
    fn name(&self) -> &'static str {
        HUB_BACKEND_NAME
    }

    fn is_loaded(&self) -> bool {
        self.client.is_some()
    }

    async fn create_run(&self, repo_address: &RepoAddress) -> Result<RunName> {
        Ok(self.client()?.create_run(repo_address).await?)
    }

    async fn create_job(&self, job: &Job) -> Result<()> {
        Ok(self.client()?.create_job(job).await?)
    }

    async fn get_job(&self, repo_address: &RepoAddress, job_id: &JobId) -> Result<Option<Job>> {
        Ok(self.client()?.get_job(repo_address, job_id).await?)
    }

    async fn list_job_heads(
        &self,
        repo_address: &RepoAddress,
        run_name: Option<&RunName>,
    ) -> Result<Vec<JobHead>> {
        Ok(self.client()?.list_job_heads(repo_address, run_name).await?)
    }

    async fn run_job(&self, job: &Job) -> Result<()> {
        Ok(self.client()?.run_job(job).await?)
    }

    async fn stop_job(
        &self,
        repo_address: &RepoAddress,
        job_id: &JobId,
        abort: bool,
    ) -> Result<()> {
        Ok(self.client()?.stop_job(repo_address, job_id, abort).await?)
    }

    /// The hub aggregates runs itself; forward instead of recomputing.
    async fn list_run_heads(
        &self,
        repo_address: &RepoAddress,
        run_name: Option<&RunName>,
    ) -> Result<Vec<RunHead>> {
        Ok(self.client()?.list_run_heads(repo_address, run_name).await?)
    }

    async fn poll_logs(
        &self,
        repo_address: &RepoAddress,
        run_name: &RunName,
        start_time: i64,
        attached: bool,
    ) -> Result<LogEventStream> {
        struct PollState {
            client: HubClient,
            repo: RepoAddress,
            run_name: RunName,
            next_start: i64,
            pending: VecDeque<LogEvent>,
            attached: bool,
            fetched_once: bool,
        }
        let state = PollState {
            client: self.client()?.clone(),
            repo: repo_address.clone(),
            run_name: run_name.clone(),
            next_start: start_time,
            pending: VecDeque::new(),
            attached,
            fetched_once: false,
        };
        Ok(Box::pin(stream::unfold(state, |mut state| async move {
            loop {
                if let Some(event) = state.pending.pop_front() {
                    return Some((Ok(event), state));
                }
                if state.fetched_once {
                    if !state.attached {
                        return None;
                    }
                    tokio::time::sleep(LOG_POLL_INTERVAL).await;
                }
                let events = match state
                    .client
                    .poll_logs(&state.repo, &state.run_name, state.next_start)
                    .await
                {
                    Ok(events) => events,
                    Err(err) => return Some((Err(err.into()), state)),
                };
                state.fetched_once = true;
                if let Some(last) = events.last() {
                    state.next_start = last.timestamp + 1;
                }
                state.pending.extend(events);
            }
        })))
    }

    async fn list_run_artifact_files(
        &self,
        repo_address: &RepoAddress,
        run_name: &RunName,
    ) -> Result<Vec<Artifact>> {
        Ok(self
            .client()?
            .list_run_artifact_files(repo_address, run_name)
            .await?)
    }

    async fn download_run_artifact_files(
        &self,
        repo_address: &RepoAddress,
        run_name: &RunName,
        output_dir: &Path,
        output_job_dirs: bool,
    ) -> Result<()> {
        let client = self.client()?;
        let files = client
            .list_run_artifact_files(repo_address, run_name)
            .await?;
        for artifact in files {
            let key = artifact_file_key(
                repo_address,
                run_name,
                &artifact.job_id,
                &artifact.name,
                &artifact.file,
            );
            let relative: PathBuf = if output_job_dirs {
                PathBuf::from(format!("{},{}", run_name, artifact.job_id))
                    .join(&artifact.name)
                    .join(&artifact.file)
            } else {
                PathBuf::from(&artifact.name).join(&artifact.file)
            };
            let target = output_dir.join(relative);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let data = client.download_file(repo_address, &key).await?;
            tokio::fs::write(&target, data).await?;
        }
        Ok(())
    }

    async fn upload_job_artifact_files(
        &self,
        job: &Job,
        artifact_name: &str,
        local_dir: &Path,
    ) -> Result<()> {
        if !local_dir.is_dir() {
            return Err(BackendError::InvalidInput(format!(
                "'{}' does not refer to an existing directory",
                local_dir.display()
            )));
        }
        let client = self.client()?;
        for (path, _size) in collect_files(local_dir)? {
            let relative = relative_key_path(local_dir, &path)?;
            let content = tokio::fs::read(&path).await?;
            client
                .upload_file(
                    &job.repo_address,
                    &job.run_name,
                    &job.job_id,
                    artifact_name,
                    &relative,
                    &content,
                )
                .await?;
        }
        Ok(())
    }

    async fn list_job_artifact_folder(
        &self,
        job: &Job,
        path: &str,
    ) -> Result<Vec<(String, bool)>> {
        let client = self.client()?;
        let files = client
            .list_run_artifact_files(&job.repo_address, &job.run_name)
            .await?;
        let prefix = format!("{}/", path.trim_end_matches('/'));
        let mut folders: Vec<String> = Vec::new();
        let mut plain: Vec<String> = Vec::new();
        for artifact in files {
            if artifact.job_id != job.job_id {
                continue;
            }
            let full = format!("{}/{}", artifact.name, artifact.file);
            let Some(rest) = full.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((folder, _)) => {
                    if !folders.iter().any(|f| f == folder) {
                        folders.push(folder.to_string());
                    }
                }
                None => plain.push(rest.to_string()),
            }
        }
        let mut entries: Vec<(String, bool)> =
            folders.into_iter().map(|name| (name, true)).collect();
        entries.extend(plain.into_iter().map(|name| (name, false)));
        Ok(entries)
    }

    async fn list_tag_heads(&self, repo_address: &RepoAddress) -> Result<Vec<TagHead>> {
        Ok(self.client()?.list_tag_heads(repo_address).await?)
    }

    async fn get_tag_head(
        &self,
        repo_address: &RepoAddress,
        tag_name: &TagName,
    ) -> Result<Option<TagHead>> {
        Ok(self.client()?.get_tag_head(repo_address, tag_name).await?)
    }

    async fn add_tag_from_run(
        &self,
        repo_address: &RepoAddress,
        tag_name: &TagName,
        run_name: &RunName,
    ) -> Result<()> {
        Ok(self
            .client()?
            .add_tag_from_run(repo_address, tag_name, run_name)
            .await?)
    }

    /// Same ordering as the store-backed flow: validate locally, upload every
    /// file, publish the assembled tag head as the last write.
    async fn add_tag_from_local_dirs(
        &self,
        repo_address: &RepoAddress,
        tag_name: &TagName,
        local_dirs: &[PathBuf],
    ) -> Result<()> {
        if local_dirs.is_empty() {
            return Err(BackendError::InvalidInput(
                "at least one local directory is required".to_string(),
            ));
        }
        let mut artifact_names = Vec::with_capacity(local_dirs.len());
        for dir in local_dirs {
            if !dir.is_dir() {
                return Err(BackendError::InvalidInput(format!(
                    "'{}' does not refer to an existing directory",
                    dir.display()
                )));
            }
            let name = dir
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    BackendError::InvalidInput(format!(
                        "'{}' has no usable directory name",
                        dir.display()
                    ))
                })?;
            artifact_names.push(name);
        }

        let client = self.client()?;
        if client.get_tag_head(repo_address, tag_name).await?.is_some() {
            return Err(BackendError::AlreadyExists(format!(
                "tag '{tag_name}' in the '{repo_address}' repo"
            )));
        }
        let run_name = client.create_run(repo_address).await?;
        let job_id = SnowflakeGenerator::for_process()
            .next_job_id()
            .map_err(BackendError::Other)?;

        for (dir, artifact_name) in local_dirs.iter().zip(&artifact_names) {
            for (path, _size) in collect_files(dir)? {
                let relative = relative_key_path(dir, &path)?;
                let content = tokio::fs::read(&path).await?;
                client
                    .upload_file(
                        repo_address,
                        &run_name,
                        &job_id,
                        artifact_name,
                        &relative,
                        &content,
                    )
                    .await?;
            }
        }

        let tag_head = TagHead {
            repo_address: repo_address.clone(),
            tag_name: tag_name.clone(),
            run_name,
            workflow_name: None,
            provider_name: Some("bash".to_string()),
            created_at: timestamp_millis(),
            artifact_heads: artifact_names
                .iter()
                .map(|name| ArtifactHead {
                    job_id: job_id.clone(),
                    artifact_path: name.clone(),
                })
                .collect(),
        };
        Ok(client.add_tag_head(&tag_head).await?)
    }

    async fn delete_tag_head(
        &self,
        repo_address: &RepoAddress,
        tag_head: &TagHead,
    ) -> Result<()> {
        Ok(self
            .client()?
            .delete_tag_head(repo_address, &tag_head.tag_name)
            .await?)
    }

    async fn get_repo_credentials(
        &self,
        repo_address: &RepoAddress,
    ) -> Result<Option<RepoCredentials>> {
        Ok(self.client()?.get_repo_credentials(repo_address).await?)
    }

    async fn save_repo_credentials(
        &self,
        repo_address: &RepoAddress,
        credentials: &RepoCredentials,
    ) -> Result<()> {
        Ok(self
            .client()?
            .save_repo_credentials(repo_address, credentials)
            .await?)
    }

    async fn list_secret_names(&self, repo_address: &RepoAddress) -> Result<Vec<String>> {
        Ok(self.client()?.list_secret_names(repo_address).await?)
    }

    async fn get_secret(
        &self,
        repo_address: &RepoAddress,
        secret_name: &str,
    ) -> Result<Option<Secret>> {
        Ok(self.client()?.get_secret(repo_address, secret_name).await?)
    }

    async fn add_secret(&self, repo_address: &RepoAddress, secret: &Secret) -> Result<()> {
        Ok(self.client()?.add_secret(repo_address, secret).await?)
    }

    async fn update_secret(&self, repo_address: &RepoAddress, secret: &Secret) -> Result<()> {
        Ok(self.client()?.update_secret(repo_address, secret).await?)
    }

    async fn delete_secret(&self, repo_address: &RepoAddress, secret_name: &str) -> Result<()> {
        Ok(self
            .client()?
            .delete_secret(repo_address, secret_name)
            .await?)
    }
}
