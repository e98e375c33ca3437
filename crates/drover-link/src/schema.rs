//! Request/response records of the hub wire protocol.
//!
//! Bodies are the shared data-model entities wrapped in small envelope
//! structs, one pair per endpoint where the payload is more than a single
//! entity.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use drover_commons::{
    Artifact, Job, JobHead, JobId, LogEvent, RepoAddress, RepoCredentials, RunHead, RunName,
    Secret, TagHead, TagName,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoRequest {
    pub repo_address: RepoAddress,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRunResponse {
    pub run_name: RunName,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    pub job: Job,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetJobRequest {
    pub repo_address: RepoAddress,
    pub job_id: JobId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetJobResponse {
    pub job: Option<Job>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListJobHeadsRequest {
    pub repo_address: RepoAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_name: Option<RunName>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListJobHeadsResponse {
    pub job_heads: Vec<JobHead>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopJobRequest {
    pub repo_address: RepoAddress,
    pub job_id: JobId,
    pub abort: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRunHeadsRequest {
    pub repo_address: RepoAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_name: Option<RunName>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRunHeadsResponse {
    pub run_heads: Vec<RunHead>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollLogsRequest {
    pub repo_address: RepoAddress,
    pub run_name: RunName,
    pub start_time: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollLogsResponse {
    pub events: Vec<LogEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListArtifactsRequest {
    pub repo_address: RepoAddress,
    pub run_name: RunName,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListArtifactsResponse {
    pub artifacts: Vec<Artifact>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadFileRequest {
    pub repo_address: RepoAddress,
    pub key: String,
}

/// Uploads one artifact file; content travels base64-encoded inside the
/// JSON envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadFileRequest {
    pub repo_address: RepoAddress,
    pub run_name: RunName,
    pub job_id: JobId,
    pub artifact_name: String,
    pub file_path: String,
    pub content_b64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListTagsResponse {
    pub tag_heads: Vec<TagHead>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTagRequest {
    pub repo_address: RepoAddress,
    pub tag_name: TagName,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTagResponse {
    pub tag_head: Option<TagHead>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTagFromRunRequest {
    pub repo_address: RepoAddress,
    pub tag_name: TagName,
    pub run_name: RunName,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTagHeadRequest {
    pub tag_head: TagHead,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteTagRequest {
    pub repo_address: RepoAddress,
    pub tag_name: TagName,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetCredentialsResponse {
    pub credentials: Option<RepoCredentials>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveCredentialsRequest {
    pub repo_address: RepoAddress,
    pub credentials: RepoCredentials,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListSecretsResponse {
    pub secret_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetSecretRequest {
    pub repo_address: RepoAddress,
    pub secret_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetSecretResponse {
    pub secret: Option<Secret>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretRequest {
    pub repo_address: RepoAddress,
    pub secret: Secret,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteSecretRequest {
    pub repo_address: RepoAddress,
    pub secret_name: String,
}

/// Error body the hub returns alongside non-2xx statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub details: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use drover_commons::JobStatus;

    #[test]
    fn test_list_job_heads_request_omits_absent_run_filter() {
        let request = ListJobHeadsRequest {
            repo_address: RepoAddress::new("u", "r"),
            run_name: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("run_name").is_none());
    }

    #[test]
    fn test_job_head_wire_round_trip() {
        let response = ListJobHeadsResponse {
            job_heads: vec![JobHead {
                job_id: JobId::from("j1"),
                run_name: RunName::from("run1"),
                workflow_name: Some("train".to_string()),
                provider_name: None,
                status: JobStatus::Done,
                submitted_at: 123,
                artifact_paths: vec!["model".to_string()],
                app_names: vec![],
                tag_name: None,
            }],
        };
        let json = serde_json::to_string(&response).unwrap();
        let decoded: ListJobHeadsResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.job_heads, response.job_heads);
    }
}
