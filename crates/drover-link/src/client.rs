//! Hub client with builder pattern.
//!
//! One method per backend operation; each method maps to exactly one
//! endpoint `/{hub_name}/{resource}/{action}`.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use drover_commons::{
    Artifact, Job, JobHead, JobId, LogEvent, RepoAddress, RepoCredentials, RunHead, RunName,
    Secret, TagHead, TagName,
};

use crate::error::{LinkError, Result};
use crate::schema::*;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for one hub, scoped to a hub name.
#[derive(Clone)]
pub struct HubClient {
    base_url: String,
    hub_name: String,
    token: String,
    http_client: reqwest::Client,
}

impl HubClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> HubClientBuilder {
        HubClientBuilder::default()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.hub_name, path)
    }

    async fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        let response = self.send(path, body).await?;
        Ok(response.json::<R>().await?)
    }

    /// POST without a meaningful response body.
    async fn post_unit<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        self.send(path, body).await?;
        Ok(())
    }

    async fn send<B: Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response> {
        let url = self.endpoint(path);
        log::debug!("hub request: POST {url}");
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = match response.json::<ErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        };
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(LinkError::Unauthorized(message));
        }
        Err(LinkError::Api {
            status: status.as_u16(),
            message,
        })
    }

    // -- runs ---------------------------------------------------------------

    pub async fn create_run(&self, repo_address: &RepoAddress) -> Result<RunName> {
        let response: CreateRunResponse = self
            .post(
                "runs/create",
                &RepoRequest {
                    repo_address: repo_address.clone(),
                },
            )
            .await?;
        Ok(response.run_name)
    }

    pub async fn list_run_heads(
        &self,
        repo_address: &RepoAddress,
        run_name: Option<&RunName>,
    ) -> Result<Vec<RunHead>> {
        let response: ListRunHeadsResponse = self
            .post(
                "runs/list/heads",
                &ListRunHeadsRequest {
                    repo_address: repo_address.clone(),
                    run_name: run_name.cloned(),
                },
            )
            .await?;
        Ok(response.run_heads)
    }

    // -- jobs ---------------------------------------------------------------

    pub async fn create_job(&self, job: &Job) -> Result<()> {
        self.post_unit("jobs/create", &JobRequest { job: job.clone() })
            .await
    }

    pub async fn get_job(&self, repo_address: &RepoAddress, job_id: &JobId) -> Result<Option<Job>> {
        let response: GetJobResponse = self
            .post(
                "jobs/get",
                &GetJobRequest {
                    repo_address: repo_address.clone(),
                    job_id: job_id.clone(),
                },
            )
            .await?;
        Ok(response.job)
    }

    pub async fn list_job_heads(
        &self,
        repo_address: &RepoAddress,
        run_name: Option<&RunName>,
    ) -> Result<Vec<JobHead>> {
        let response: ListJobHeadsResponse = self
            .post(
                "jobs/list/heads",
                &ListJobHeadsRequest {
                    repo_address: repo_address.clone(),
                    run_name: run_name.cloned(),
                },
            )
            .await?;
        Ok(response.job_heads)
    }

    // -- runners ------------------------------------------------------------

    pub async fn run_job(&self, job: &Job) -> Result<()> {
        self.post_unit("runners/run", &JobRequest { job: job.clone() })
            .await
    }

    pub async fn stop_job(
        &self,
        repo_address: &RepoAddress,
        job_id: &JobId,
        abort: bool,
    ) -> Result<()> {
        self.post_unit(
            "runners/stop",
            &StopJobRequest {
                repo_address: repo_address.clone(),
                job_id: job_id.clone(),
                abort,
            },
        )
        .await
    }

    // -- logs ---------------------------------------------------------------

    pub async fn poll_logs(
        &self,
        repo_address: &RepoAddress,
        run_name: &RunName,
        start_time: i64,
    ) -> Result<Vec<LogEvent>> {
        let response: PollLogsResponse = self
            .post(
                "logs/poll",
                &PollLogsRequest {
                    repo_address: repo_address.clone(),
                    run_name: run_name.clone(),
                    start_time,
                },
            )
            .await?;
        Ok(response.events)
    }

    // -- artifacts ----------------------------------------------------------

    pub async fn list_run_artifact_files(
        &self,
        repo_address: &RepoAddress,
        run_name: &RunName,
    ) -> Result<Vec<Artifact>> {
        let response: ListArtifactsResponse = self
            .post(
                "artifacts/list",
                &ListArtifactsRequest {
                    repo_address: repo_address.clone(),
                    run_name: run_name.clone(),
                },
            )
            .await?;
        Ok(response.artifacts)
    }

    /// Fetch one artifact file by its storage key; the response body is the
    /// raw file content.
    pub async fn download_file(&self, repo_address: &RepoAddress, key: &str) -> Result<Bytes> {
        let response = self
            .send(
                "artifacts/download",
                &DownloadFileRequest {
                    repo_address: repo_address.clone(),
                    key: key.to_string(),
                },
            )
            .await?;
        Ok(response.bytes().await?)
    }

    pub async fn upload_file(
        &self,
        repo_address: &RepoAddress,
        run_name: &RunName,
        job_id: &JobId,
        artifact_name: &str,
        file_path: &str,
        content: &[u8],
    ) -> Result<()> {
        self.post_unit(
            "artifacts/upload",
            &UploadFileRequest {
                repo_address: repo_address.clone(),
                run_name: run_name.clone(),
                job_id: job_id.clone(),
                artifact_name: artifact_name.to_string(),
                file_path: file_path.to_string(),
                content_b64: BASE64.encode(content),
            },
        )
        .await
    }

    // -- tags ---------------------------------------------------------------

    pub async fn list_tag_heads(&self, repo_address: &RepoAddress) -> Result<Vec<TagHead>> {
        let response: ListTagsResponse = self
            .post(
                "tags/list",
                &RepoRequest {
                    repo_address: repo_address.clone(),
                },
            )
            .await?;
        Ok(response.tag_heads)
    }

    pub async fn get_tag_head(
        &self,
        repo_address: &RepoAddress,
        tag_name: &TagName,
    ) -> Result<Option<TagHead>> {
        let response: GetTagResponse = self
            .post(
                "tags/get",
                &GetTagRequest {
                    repo_address: repo_address.clone(),
                    tag_name: tag_name.clone(),
                },
            )
            .await?;
        Ok(response.tag_head)
    }

    pub async fn add_tag_from_run(
        &self,
        repo_address: &RepoAddress,
        tag_name: &TagName,
        run_name: &RunName,
    ) -> Result<()> {
        self.post_unit(
            "tags/add",
            &AddTagFromRunRequest {
                repo_address: repo_address.clone(),
                tag_name: tag_name.clone(),
                run_name: run_name.clone(),
            },
        )
        .await
    }

    /// Publish a client-assembled tag head (the tag-from-local-dirs flow:
    /// artifacts are uploaded first, the head is the last write).
    pub async fn add_tag_head(&self, tag_head: &TagHead) -> Result<()> {
        self.post_unit(
            "tags/add/head",
            &AddTagHeadRequest {
                tag_head: tag_head.clone(),
            },
        )
        .await
    }

    pub async fn delete_tag_head(
        &self,
        repo_address: &RepoAddress,
        tag_name: &TagName,
    ) -> Result<()> {
        self.post_unit(
            "tags/delete",
            &DeleteTagRequest {
                repo_address: repo_address.clone(),
                tag_name: tag_name.clone(),
            },
        )
        .await
    }

    // -- repo credentials ---------------------------------------------------

    pub async fn get_repo_credentials(
        &self,
        repo_address: &RepoAddress,
    ) -> Result<Option<RepoCredentials>> {
        let response: GetCredentialsResponse = self
            .post(
                "repos/credentials/get",
                &RepoRequest {
                    repo_address: repo_address.clone(),
                },
            )
            .await?;
        Ok(response.credentials)
    }

    pub async fn save_repo_credentials(
        &self,
        repo_address: &RepoAddress,
        credentials: &RepoCredentials,
    ) -> Result<()> {
        self.post_unit(
            "repos/credentials/save",
            &SaveCredentialsRequest {
                repo_address: repo_address.clone(),
                credentials: credentials.clone(),
            },
        )
        .await
    }

    // -- secrets ------------------------------------------------------------

    pub async fn list_secret_names(&self, repo_address: &RepoAddress) -> Result<Vec<String>> {
        let response: ListSecretsResponse = self
            .post(
                "secrets/list",
                &RepoRequest {
                    repo_address: repo_address.clone(),
                },
            )
            .await?;
        Ok(response.secret_names)
    }

    pub async fn get_secret(
        &self,
        repo_address: &RepoAddress,
        secret_name: &str,
    ) -> Result<Option<Secret>> {
        let response: GetSecretResponse = self
            .post(
                "secrets/get",
                &GetSecretRequest {
                    repo_address: repo_address.clone(),
                    secret_name: secret_name.to_string(),
                },
            )
            .await?;
        Ok(response.secret)
    }

    pub async fn add_secret(&self, repo_address: &RepoAddress, secret: &Secret) -> Result<()> {
        self.post_unit(
            "secrets/add",
            &SecretRequest {
                repo_address: repo_address.clone(),
                secret: secret.clone(),
            },
        )
        .await
    }

    pub async fn update_secret(&self, repo_address: &RepoAddress, secret: &Secret) -> Result<()> {
        self.post_unit(
            "secrets/update",
            &SecretRequest {
                repo_address: repo_address.clone(),
                secret: secret.clone(),
            },
        )
        .await
    }

    pub async fn delete_secret(
        &self,
        repo_address: &RepoAddress,
        secret_name: &str,
    ) -> Result<()> {
        self.post_unit(
            "secrets/delete",
            &DeleteSecretRequest {
                repo_address: repo_address.clone(),
                secret_name: secret_name.to_string(),
            },
        )
        .await
    }
}

/// Builder for [`HubClient`].
#[derive(Default)]
pub struct HubClientBuilder {
    base_url: Option<String>,
    hub_name: Option<String>,
    token: Option<String>,
    timeout: Option<Duration>,
}

impl HubClientBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn hub_name(mut self, hub_name: impl Into<String>) -> Self {
        self.hub_name = Some(hub_name.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<HubClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| LinkError::Config("base_url is required".to_string()))?
            .trim_end_matches('/')
            .to_string();
        let hub_name = self
            .hub_name
            .ok_or_else(|| LinkError::Config("hub_name is required".to_string()))?;
        let token = self
            .token
            .ok_or_else(|| LinkError::Config("token is required".to_string()))?;

        let http_client = reqwest::Client::builder()
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()?;

        Ok(HubClient {
            base_url,
            hub_name,
            token,
            http_client,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_base_url() {
        let err = HubClient::builder().hub_name("main").token("t").build();
        assert!(matches!(err, Err(LinkError::Config(msg)) if msg.contains("base_url")));
    }

    #[test]
    fn test_endpoints_are_scoped_under_the_hub_name() {
        let client = HubClient::builder()
            .base_url("http://localhost:3000/")
            .hub_name("main")
            .token("t")
            .build()
            .unwrap();
        assert_eq!(
            client.endpoint("jobs/list/heads"),
            "http://localhost:3000/main/jobs/list/heads"
        );
        assert_eq!(
            client.endpoint("runners/stop"),
            "http://localhost:3000/main/runners/stop"
        );
    }
}
