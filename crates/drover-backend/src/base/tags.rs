//! Tag heads: creation, lookup and deletion.
//!
//! The tag head is always the last write of a tag-creating flow, so a tag is
//! observable only once every artifact it references is durable. A crash
//! before the head write leaves an orphaned, head-less job that no listing
//! can see: safe, and reclaimable later.

use std::path::PathBuf;

use drover_commons::{
    timestamp_millis, ArtifactHead, ArtifactSpec, Job, JobStatus, RepoAddress, RunName,
    SnowflakeGenerator, TagHead, TagName,
};
use drover_store::artifacts::upload_artifact_dir;
use drover_store::{keys, LogProgress, Storage};

use crate::base::{jobs, runs};
use crate::error::{BackendError, Result};

/// Provider identity stamped onto the placeholder job anchoring
/// tag-from-local-dirs artifacts.
const LOCAL_DIRS_PROVIDER: &str = "bash";
const LOCAL_DIRS_IMAGE: &str = "scratch";

/// Lists all tag heads of a repository.
pub async fn list_tag_heads(storage: &Storage, repo: &RepoAddress) -> Result<Vec<TagHead>> {
    let prefix = keys::tag_heads_prefix(repo, None);
    let mut heads = Vec::new();
    for key in storage.list_keys(&prefix).await? {
        match keys::parse_tag_head_key(repo, &key) {
            Ok(head) => heads.push(head),
            Err(err) => log::warn!("skipping undecodable tag head '{key}': {err}"),
        }
    }
    Ok(heads)
}

/// Looks a tag head up by name.
pub async fn get_tag_head(
    storage: &Storage,
    repo: &RepoAddress,
    tag_name: &TagName,
) -> Result<Option<TagHead>> {
    let prefix = keys::tag_heads_prefix(repo, Some(tag_name));
    for key in storage.list_keys(&prefix).await? {
        match keys::parse_tag_head_key(repo, &key) {
            Ok(head) if &head.tag_name == tag_name => return Ok(Some(head)),
            Ok(_) => continue,
            Err(err) => log::warn!("skipping undecodable tag head '{key}': {err}"),
        }
    }
    Ok(None)
}

/// Tags an existing run: writes the tag head referencing the run's jobs and
/// artifacts, then stamps the tag name onto the member job heads.
pub async fn add_tag_from_run(
    storage: &Storage,
    repo: &RepoAddress,
    tag_name: &TagName,
    run_name: &RunName,
) -> Result<()> {
    if get_tag_head(storage, repo, tag_name).await?.is_some() {
        return Err(BackendError::AlreadyExists(format!(
            "tag '{tag_name}' in the '{repo}' repo"
        )));
    }
    let job_heads = jobs::list_job_heads(storage, repo, Some(run_name)).await?;
    if job_heads.is_empty() {
        return Err(BackendError::NotFound(format!(
            "run '{run_name}' in the '{repo}' repo"
        )));
    }

    let artifact_heads: Vec<ArtifactHead> = job_heads
        .iter()
        .flat_map(|head| {
            head.artifact_paths.iter().map(|path| ArtifactHead {
                job_id: head.job_id.clone(),
                artifact_path: path.clone(),
            })
        })
        .collect();
    let tag_head = TagHead {
        repo_address: repo.clone(),
        tag_name: tag_name.clone(),
        run_name: run_name.clone(),
        workflow_name: job_heads[0].workflow_name.clone(),
        provider_name: job_heads[0].provider_name.clone(),
        created_at: job_heads
            .iter()
            .map(|head| head.submitted_at)
            .min()
            .unwrap_or_else(timestamp_millis),
        artifact_heads,
    };

    // The run's artifacts are already durable; the head write makes the tag
    // visible, the head stamps after it are cosmetic.
    storage
        .put_marker(&keys::tag_head_key(repo, &tag_head))
        .await?;
    for head in &job_heads {
        jobs::stamp_tag(storage, repo, head, Some(tag_name)).await?;
    }
    Ok(())
}

/// Creates a tag out of local directories.
///
/// Order is load-bearing: every directory is validated before any store
/// interaction; the placeholder job is written without a head (invisible);
/// artifacts upload next; the tag head is strictly the last write.
pub async fn add_tag_from_local_dirs(
    storage: &Storage,
    repo: &RepoAddress,
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
    if get_tag_head(storage, repo, tag_name).await?.is_some() {
        return Err(BackendError::AlreadyExists(format!(
            "tag '{tag_name}' in the '{repo}' repo"
        )));
    }

    let run_name = runs::create_run(storage, repo).await?;
    let generator = SnowflakeGenerator::for_process();
    let job_id = generator.next_job_id().map_err(BackendError::Other)?;
    let job = Job {
        job_id: job_id.clone(),
        repo_address: repo.clone(),
        run_name: run_name.clone(),
        workflow_name: None,
        provider_name: Some(LOCAL_DIRS_PROVIDER.to_string()),
        status: JobStatus::Done,
        submitted_at: timestamp_millis(),
        image_name: LOCAL_DIRS_IMAGE.to_string(),
        commands: Vec::new(),
        env: Default::default(),
        working_dir: None,
        artifact_specs: artifact_names
            .iter()
            .map(|name| ArtifactSpec {
                artifact_path: name.clone(),
                mount: false,
            })
            .collect(),
        port_count: None,
        ports: Vec::new(),
        host_name: None,
        requirements: None,
        deps: Vec::new(),
        app_specs: Vec::new(),
        tag_name: Some(tag_name.clone()),
    };
    // Body only: a head would make the half-built tag's run listable.
    jobs::create_job(storage, repo, &job, false).await?;

    for (dir, artifact_name) in local_dirs.iter().zip(&artifact_names) {
        let progress = LogProgress::new(format!("uploading artifact '{artifact_name}'"));
        upload_artifact_dir(
            storage,
            repo,
            &run_name,
            &job_id,
            artifact_name,
            dir,
            &progress,
        )
        .await?;
    }

    let tag_head = TagHead {
        repo_address: repo.clone(),
        tag_name: tag_name.clone(),
        run_name,
        workflow_name: None,
        provider_name: Some(LOCAL_DIRS_PROVIDER.to_string()),
        created_at: job.submitted_at,
        artifact_heads: artifact_names
            .iter()
            .map(|name| ArtifactHead {
                job_id: job_id.clone(),
                artifact_path: name.clone(),
            })
            .collect(),
    };
    storage
        .put_marker(&keys::tag_head_key(repo, &tag_head))
        .await?;
    Ok(())
}

/// Deletes the tag head (artifacts are never reclaimed here) and clears the
/// tag stamp from the member job heads.
pub async fn delete_tag_head(
    storage: &Storage,
    repo: &RepoAddress,
    tag_head: &TagHead,
) -> Result<()> {
    storage
        .delete_object(&keys::tag_head_key(repo, tag_head))
        .await?;
    let job_heads = jobs::list_job_heads(storage, repo, Some(&tag_head.run_name)).await?;
    for head in &job_heads {
        if head.tag_name.as_ref() == Some(&tag_head.tag_name) {
            jobs::stamp_tag(storage, repo, head, None).await?;
        }
    }
    Ok(())
}
