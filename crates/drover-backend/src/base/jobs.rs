//! Job persistence over the head/body scheme.
//!
//! A job is stored twice: the full spec as a JSON body at
//! `jobs/{repo}/{job_id}.json`, and the listable projection as an
//! empty-bodied head marker whose key encodes every head field. Status
//! transitions replace the head (write new, delete old) so a fresh listing
//! always sees the job exactly once.

use bytes::Bytes;

use drover_commons::{Job, JobHead, JobId, JobStatus, RepoAddress, RunName, TagName};
use drover_store::{keys, Storage};

use crate::error::{BackendError, Result};

/// Writes the job body and, unless suppressed, the head marker.
///
/// The tag-from-local-dirs flow suppresses the head: a body with no head is
/// invisible to every listing, which is what makes a crash before the tag
/// head write safe.
pub async fn create_job(
    storage: &Storage,
    repo: &RepoAddress,
    job: &Job,
    create_head: bool,
) -> Result<()> {
    let body = serde_json::to_vec(job)?;
    storage
        .put_object(&keys::job_file_key(repo, &job.job_id), Bytes::from(body))
        .await?;
    if create_head {
        storage
            .put_marker(&keys::job_head_key(repo, &job.head()))
            .await?;
    }
    Ok(())
}

/// Reads a job body back; `None` if the job does not exist.
pub async fn get_job(
    storage: &Storage,
    repo: &RepoAddress,
    job_id: &JobId,
) -> Result<Option<Job>> {
    match storage
        .get_object_opt(&keys::job_file_key(repo, job_id))
        .await?
    {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Lists job heads, optionally filtered to one run.
///
/// Malformed keys under the prefix are skipped with a warning rather than
/// failing the listing; duplicate heads of the same job (an unfinished
/// replace) are resolved in favor of the greatest `submitted_at`.
pub async fn list_job_heads(
    storage: &Storage,
    repo: &RepoAddress,
    run_name: Option<&RunName>,
) -> Result<Vec<JobHead>> {
    let prefix = keys::job_heads_prefix(repo, run_name);
    let mut heads = Vec::new();
    for key in storage.list_keys(&prefix).await? {
        match keys::parse_job_head_key(repo, &key) {
            Ok(head) => heads.push(head),
            Err(err) => log::warn!("skipping undecodable job head '{key}': {err}"),
        }
    }
    Ok(keys::dedup_job_heads(heads))
}

/// Writes a runner ticket for the external runner fleet to pick up.
pub async fn run_job(storage: &Storage, repo: &RepoAddress, job: &Job) -> Result<()> {
    let body = serde_json::to_vec(job)?;
    storage
        .put_object(&keys::runner_key(repo, &job.job_id), Bytes::from(body))
        .await?;
    log::debug!("queued runner ticket for job {}", job.job_id);
    Ok(())
}

/// Transitions a job to a new status: rewrites the body, then replaces the
/// head (new key first, old key deleted after).
pub async fn update_job_status(
    storage: &Storage,
    repo: &RepoAddress,
    job: &Job,
    new_status: JobStatus,
) -> Result<()> {
    let old_head_key = keys::job_head_key(repo, &job.head());
    let mut updated = job.clone();
    updated.status = new_status;

    let body = serde_json::to_vec(&updated)?;
    storage
        .put_object(&keys::job_file_key(repo, &job.job_id), Bytes::from(body))
        .await?;
    storage
        .replace_marker(&keys::job_head_key(repo, &updated.head()), &old_head_key)
        .await?;
    Ok(())
}

/// Signals one job to stop. Graceful stop transitions to `Stopping`, a hard
/// kill to `Aborting`; a job already finished (or already being stopped the
/// same way) is a silent no-op.
pub async fn stop_job(
    storage: &Storage,
    repo: &RepoAddress,
    job_id: &JobId,
    abort: bool,
) -> Result<()> {
    let job = get_job(storage, repo, job_id).await?.ok_or_else(|| {
        BackendError::NotFound(format!("job '{job_id}' in the '{repo}' repo"))
    })?;
    if job.status.is_finished() {
        return Ok(());
    }
    let target = if abort {
        JobStatus::Aborting
    } else {
        JobStatus::Stopping
    };
    if job.status == target {
        return Ok(());
    }
    update_job_status(storage, repo, &job, target).await
}

/// Rewrites a head (and its body, when present) with a new tag name, via the
/// replace protocol.
pub async fn stamp_tag(
    storage: &Storage,
    repo: &RepoAddress,
    head: &JobHead,
    tag_name: Option<&TagName>,
) -> Result<()> {
    if head.tag_name.as_ref() == tag_name {
        return Ok(());
    }
    if let Some(mut job) = get_job(storage, repo, &head.job_id).await? {
        job.tag_name = tag_name.cloned();
        let body = serde_json::to_vec(&job)?;
        storage
            .put_object(&keys::job_file_key(repo, &head.job_id), Bytes::from(body))
            .await?;
    }
    let mut updated = head.clone();
    updated.tag_name = tag_name.cloned();
    storage
        .replace_marker(
            &keys::job_head_key(repo, &updated),
            &keys::job_head_key(repo, head),
        )
        .await?;
    Ok(())
}
