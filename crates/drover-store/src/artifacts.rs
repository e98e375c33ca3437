//! Artifact addressing and transfer.
//!
//! Every artifact file maps bidirectionally onto the key
//!
//! ```text
//! artifacts/{repo_user}/{repo_name}/{run_name},{job_id}/{artifact_name}/{relative_file_path}
//! ```
//!
//! The layout is positional and unescaped for interoperability with data
//! already in the store, so run names, job ids and artifact names must be
//! free of the reserved separators (`/`, `,`, `;`), enforced at the
//! boundary before any store call. Uploads and downloads are idempotent by
//! key: a failed call aborts its remaining files without rolling back, and
//! re-invoking the whole call is the prescribed recovery.

use std::path::{Path, PathBuf};

use futures_util::stream::{self, TryStreamExt};

use drover_commons::{Artifact, JobId, RepoAddress, RunName};

use crate::error::{Result, StoreError};
use crate::keys::validate_key_component;
use crate::progress::Progress;
use crate::storage::Storage;

/// Concurrent file transfers per logical operation.
const TRANSFER_CONCURRENCY: usize = 8;

/// One artifact file decoded back out of its storage key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFileRef {
    pub run_name: RunName,
    pub job_id: JobId,
    pub artifact_name: String,
    pub file: String,
}

/// Key prefix covering every artifact of one run (note the trailing comma:
/// it closes the run-name position so `run1` never matches `run10`).
pub fn run_artifacts_prefix(repo: &RepoAddress, run_name: &RunName) -> String {
    format!("artifacts/{}/{},", repo.path(), run_name)
}

/// Encodes one artifact file into its storage key.
pub fn artifact_file_key(
    repo: &RepoAddress,
    run_name: &RunName,
    job_id: &JobId,
    artifact_name: &str,
    relative_path: &str,
) -> String {
    format!(
        "artifacts/{}/{},{}/{}/{}",
        repo.path(),
        run_name,
        job_id,
        artifact_name,
        relative_path
    )
}

/// Decodes an artifact key back into its components; the exact inverse of
/// [`artifact_file_key`].
pub fn parse_artifact_key(repo: &RepoAddress, key: &str) -> Result<ArtifactFileRef> {
    let prefix = format!("artifacts/{}/", repo.path());
    let rest = key
        .strip_prefix(&prefix)
        .ok_or_else(|| StoreError::InvalidKey(format!("not an artifact key: {key}")))?;

    let mut segments = rest.splitn(3, '/');
    let run_and_job = segments.next().unwrap_or_default();
    let artifact_name = segments
        .next()
        .ok_or_else(|| StoreError::InvalidKey(format!("missing artifact name: {key}")))?;
    let file = segments
        .next()
        .ok_or_else(|| StoreError::InvalidKey(format!("missing file path: {key}")))?;

    let (run_name, job_id) = run_and_job
        .split_once(',')
        .ok_or_else(|| StoreError::InvalidKey(format!("missing job separator: {key}")))?;

    Ok(ArtifactFileRef {
        run_name: RunName::from(run_name),
        job_id: JobId::from(job_id),
        artifact_name: artifact_name.to_string(),
        file: file.to_string(),
    })
}

/// Uploads a local directory as one named artifact of a job.
///
/// Validates the directory before any store call and computes the total byte
/// size up front. Files stream concurrently through a bounded pool; the
/// first failing file aborts the remaining ones; already-uploaded files stay,
/// since keys are idempotent and re-invoking the call is safe. Returns the total
/// bytes uploaded.
pub async fn upload_artifact_dir(
    storage: &Storage,
    repo: &RepoAddress,
    run_name: &RunName,
    job_id: &JobId,
    artifact_name: &str,
    local_dir: &Path,
    progress: &dyn Progress,
) -> Result<u64> {
    validate_key_component(run_name.as_str(), "run name")?;
    validate_key_component(job_id.as_str(), "job id")?;
    validate_key_component(artifact_name, "artifact name")?;
    if !local_dir.is_dir() {
        return Err(StoreError::InvalidInput(format!(
            "'{}' does not refer to an existing directory",
            local_dir.display()
        )));
    }

    let files = collect_files(local_dir)?;
    let total: u64 = files.iter().map(|(_, size)| size).sum();
    progress.start(total);

    stream::iter(files.into_iter().map(Ok::<_, StoreError>))
        .try_for_each_concurrent(TRANSFER_CONCURRENCY, |(path, size)| async move {
            let relative = relative_key_path(local_dir, &path)?;
            let key = artifact_file_key(repo, run_name, job_id, artifact_name, &relative);
            let data = tokio::fs::read(&path).await?;
            storage.put_object(&key, data.into()).await.map_err(|err| {
                StoreError::Transfer(format!("uploading '{}': {err}", path.display()))
            })?;
            progress.advance(size);
            Ok(())
        })
        .await?;

    Ok(total)
}

/// Downloads every artifact file of a run into `output_dir`.
///
/// The listing transparently follows the store's pagination. Local paths are
/// rebuilt by stripping the leading key segments: with `output_job_dirs` the
/// `{run},{job}` directory is kept (3 segments stripped), without it files
/// of all jobs merge under their artifact names (4 segments stripped).
pub async fn download_run_artifacts(
    storage: &Storage,
    repo: &RepoAddress,
    run_name: &RunName,
    output_dir: &Path,
    output_job_dirs: bool,
    progress: &dyn Progress,
) -> Result<()> {
    let prefix = run_artifacts_prefix(repo, run_name);
    let objects = storage.list_objects(&prefix).await?;

    let strip = if output_job_dirs { 3 } else { 4 };
    let total: u64 = objects.iter().map(|(_, size)| size).sum();
    progress.start(total);

    stream::iter(objects.into_iter().map(Ok::<_, StoreError>))
        .try_for_each_concurrent(TRANSFER_CONCURRENCY, |(key, size)| async move {
            let relative: PathBuf = key.split('/').skip(strip).collect();
            if relative.as_os_str().is_empty() {
                return Ok(());
            }
            let target = output_dir.join(relative);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let data = storage
                .get_object(&key)
                .await
                .map_err(|err| StoreError::Transfer(format!("downloading '{key}': {err}")))?;
            tokio::fs::write(&target, data).await?;
            progress.advance(size);
            Ok(())
        })
        .await?;

    Ok(())
}

/// Enumerates every stored artifact file of a run.
pub async fn list_run_artifact_files(
    storage: &Storage,
    repo: &RepoAddress,
    run_name: &RunName,
) -> Result<Vec<Artifact>> {
    let prefix = run_artifacts_prefix(repo, run_name);
    let mut artifacts = Vec::new();
    for (key, size) in storage.list_objects(&prefix).await? {
        let file_ref = parse_artifact_key(repo, &key)?;
        artifacts.push(Artifact {
            job_id: file_ref.job_id,
            name: file_ref.artifact_name,
            file: file_ref.file,
            filesize_in_bytes: size,
        });
    }
    Ok(artifacts)
}

/// One-level listing inside a job's artifacts, for interactive browsing.
///
/// `path` is relative to the job directory and starts with the artifact
/// name. Returns `(name, is_folder)` pairs, folders first, with trailing
/// separators stripped.
pub async fn list_artifact_folder(
    storage: &Storage,
    repo: &RepoAddress,
    run_name: &RunName,
    job_id: &JobId,
    path: &str,
) -> Result<Vec<(String, bool)>> {
    let prefix = format!(
        "artifacts/{}/{},{}/{}/",
        repo.path(),
        run_name,
        job_id,
        path.trim_end_matches('/')
    );
    let (folders, files) = storage.list_shallow(&prefix).await?;
    let mut entries: Vec<(String, bool)> =
        folders.into_iter().map(|name| (name, true)).collect();
    entries.extend(files.into_iter().map(|name| (name, false)));
    Ok(entries)
}

/// Walks a directory tree collecting `(path, size)` for every regular file.
pub fn collect_files(dir: &Path) -> Result<Vec<(PathBuf, u64)>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if metadata.is_dir() {
                pending.push(entry.path());
            } else if metadata.is_file() {
                files.push((entry.path(), metadata.len()));
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Relative path below `base`, rendered with `/` separators for the key.
pub fn relative_key_path(base: &Path, file: &Path) -> Result<String> {
    let relative = file.strip_prefix(base).map_err(|_| {
        StoreError::InvalidInput(format!(
            "'{}' is outside the artifact directory",
            file.display()
        ))
    })?;
    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use object_store::memory::InMemory;
    use std::sync::Arc;

    fn repo() -> RepoAddress {
        RepoAddress::new("u", "r")
    }

    fn memory_storage() -> Storage {
        Storage::new(Arc::new(InMemory::new()))
    }

    #[test]
    fn test_artifact_key_layout_is_bit_exact() {
        let key = artifact_file_key(
            &repo(),
            &RunName::from("run1"),
            &JobId::from("j1"),
            "model",
            "weights/a.bin",
        );
        assert_eq!(key, "artifacts/u/r/run1,j1/model/weights/a.bin");
    }

    #[test]
    fn test_artifact_key_round_trip() {
        let key = "artifacts/u/r/run1,j1/model/weights/a.bin";
        let file_ref = parse_artifact_key(&repo(), key).unwrap();
        assert_eq!(file_ref.run_name, RunName::from("run1"));
        assert_eq!(file_ref.job_id, JobId::from("j1"));
        assert_eq!(file_ref.artifact_name, "model");
        assert_eq!(file_ref.file, "weights/a.bin");
        assert_eq!(
            artifact_file_key(
                &repo(),
                &file_ref.run_name,
                &file_ref.job_id,
                &file_ref.artifact_name,
                &file_ref.file
            ),
            key
        );
    }

    #[test]
    fn test_run_prefix_closes_the_run_segment() {
        let prefix = run_artifacts_prefix(&repo(), &RunName::from("run1"));
        assert!("artifacts/u/r/run1,j1/m/f".starts_with(&prefix));
        assert!(!"artifacts/u/r/run10,j1/m/f".starts_with(&prefix));
    }

    #[tokio::test]
    async fn test_upload_missing_directory_fails_before_any_store_call() {
        let storage = memory_storage();
        let err = upload_artifact_dir(
            &storage,
            &repo(),
            &RunName::from("run1"),
            &JobId::from("j1"),
            "model",
            Path::new("/definitely/not/here"),
            &NoProgress,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(msg) if msg.contains("/definitely/not/here")));
        assert!(storage.list_keys("artifacts/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_download_round_trip() {
        let storage = memory_storage();
        let src = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("weights")).unwrap();
        std::fs::write(src.path().join("weights/a.bin"), b"aaaa").unwrap();
        std::fs::write(src.path().join("config.json"), b"{}").unwrap();

        let total = upload_artifact_dir(
            &storage,
            &repo(),
            &RunName::from("run1"),
            &JobId::from("j1"),
            "model",
            src.path(),
            &NoProgress,
        )
        .await
        .unwrap();
        assert_eq!(total, 6);

        let keys = storage.list_keys("artifacts/u/r/run1,").await.unwrap();
        assert_eq!(
            keys,
            vec![
                "artifacts/u/r/run1,j1/model/config.json".to_string(),
                "artifacts/u/r/run1,j1/model/weights/a.bin".to_string(),
            ]
        );

        let out = tempfile::tempdir().unwrap();
        download_run_artifacts(
            &storage,
            &repo(),
            &RunName::from("run1"),
            out.path(),
            true,
            &NoProgress,
        )
        .await
        .unwrap();
        assert_eq!(
            std::fs::read(out.path().join("run1,j1/model/weights/a.bin")).unwrap(),
            b"aaaa"
        );

        let flat = tempfile::tempdir().unwrap();
        download_run_artifacts(
            &storage,
            &repo(),
            &RunName::from("run1"),
            flat.path(),
            false,
            &NoProgress,
        )
        .await
        .unwrap();
        assert_eq!(
            std::fs::read(flat.path().join("model/weights/a.bin")).unwrap(),
            b"aaaa"
        );
    }

    #[tokio::test]
    async fn test_list_run_artifact_files() {
        let storage = memory_storage();
        storage
            .put_object("artifacts/u/r/run1,j1/model/w.bin", bytes::Bytes::from("abc"))
            .await
            .unwrap();
        storage
            .put_object("artifacts/u/r/run1,j2/logs/out.txt", bytes::Bytes::from("z"))
            .await
            .unwrap();
        storage
            .put_object("artifacts/u/r/run2,j9/model/w.bin", bytes::Bytes::from("n"))
            .await
            .unwrap();

        let files =
            list_run_artifact_files(&storage, &repo(), &RunName::from("run1")).await.unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().any(|a| {
            a.job_id == JobId::from("j1")
                && a.name == "model"
                && a.file == "w.bin"
                && a.filesize_in_bytes == 3
        }));
        assert!(files.iter().any(|a| a.job_id == JobId::from("j2") && a.name == "logs"));
    }

    #[tokio::test]
    async fn test_list_artifact_folder_one_level() {
        let storage = memory_storage();
        for key in [
            "artifacts/u/r/run1,j1/model/weights/a.bin",
            "artifacts/u/r/run1,j1/model/weights/b.bin",
            "artifacts/u/r/run1,j1/model/config.json",
        ] {
            storage.put_object(key, bytes::Bytes::from("x")).await.unwrap();
        }

        let entries = list_artifact_folder(
            &storage,
            &repo(),
            &RunName::from("run1"),
            &JobId::from("j1"),
            "model",
        )
        .await
        .unwrap();
        assert_eq!(
            entries,
            vec![
                ("weights".to_string(), true),
                ("config.json".to_string(), false),
            ]
        );
    }

    #[tokio::test]
    async fn test_separator_in_artifact_name_is_rejected() {
        let storage = memory_storage();
        let src = tempfile::tempdir().unwrap();
        let err = upload_artifact_dir(
            &storage,
            &repo(),
            &RunName::from("run1"),
            &JobId::from("j1"),
            "model/extra",
            src.path(),
            &NoProgress,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
    }
}
