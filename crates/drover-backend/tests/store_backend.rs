//! End-to-end tests of the store-backed backend over an in-memory object
//! store: submission, stopping, tagging, dependency resolution and log
//! polling.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use object_store::memory::InMemory;

use drover_backend::{
    resolve_dep, submit_provider_jobs, Backend, BackendError, JobProvider, StoreBackend,
};
use drover_commons::{
    Artifact, ArtifactSpec, Job, JobId, JobSpec, JobStatus, LogEvent, LogSource, RepoAddress,
    RunName, TagName,
};
use drover_store::Storage;

fn repo() -> RepoAddress {
    RepoAddress::new("u", "r")
}

fn memory_backend() -> (StoreBackend, Storage) {
    let store: Arc<InMemory> = Arc::new(InMemory::new());
    let backend = StoreBackend::with_store("cloud", store.clone());
    (backend, Storage::new(store))
}

fn job(job_id: &str, run: &str, status: JobStatus, submitted_at: i64) -> Job {
    Job {
        job_id: JobId::from(job_id),
        repo_address: repo(),
        run_name: RunName::from(run),
        workflow_name: None,
        provider_name: Some("bash".to_string()),
        status,
        submitted_at,
        image_name: "ubuntu".to_string(),
        commands: vec!["echo ok".to_string()],
        env: HashMap::new(),
        working_dir: None,
        artifact_specs: vec![],
        port_count: None,
        ports: vec![],
        host_name: None,
        requirements: None,
        deps: vec![],
        app_specs: vec![],
        tag_name: None,
    }
}

fn workflow_job(job_id: &str, run: &str, workflow: &str, status: JobStatus, at: i64) -> Job {
    let mut job = job(job_id, run, status, at);
    job.workflow_name = Some(workflow.to_string());
    job
}

#[tokio::test]
async fn test_create_and_get_job_round_trip() {
    let (backend, _) = memory_backend();
    let submitted = job("j1", "run1", JobStatus::Submitted, 100);
    backend.create_job(&submitted).await.unwrap();

    let fetched = backend.get_job(&repo(), &JobId::from("j1")).await.unwrap();
    assert_eq!(fetched, Some(submitted));
    assert_eq!(
        backend.get_job(&repo(), &JobId::from("ghost")).await.unwrap(),
        None
    );

    let heads = backend.list_job_heads(&repo(), None).await.unwrap();
    assert_eq!(heads.len(), 1);
    assert_eq!(heads[0].job_id, JobId::from("j1"));
    assert_eq!(heads[0].status, JobStatus::Submitted);
}

#[tokio::test]
async fn test_list_job_heads_filters_by_run() {
    let (backend, _) = memory_backend();
    backend
        .create_job(&job("j1", "run1", JobStatus::Done, 1))
        .await
        .unwrap();
    backend
        .create_job(&job("j2", "run1", JobStatus::Done, 2))
        .await
        .unwrap();
    backend
        .create_job(&job("j3", "run2", JobStatus::Done, 3))
        .await
        .unwrap();

    let all = backend.list_job_heads(&repo(), None).await.unwrap();
    assert_eq!(all.len(), 3);

    let run1 = backend
        .list_job_heads(&repo(), Some(&RunName::from("run1")))
        .await
        .unwrap();
    assert_eq!(run1.len(), 2);
    assert!(run1.iter().all(|h| h.run_name == RunName::from("run1")));
}

#[tokio::test]
async fn test_stop_jobs_targets_only_unfinished_heads() {
    let (backend, _) = memory_backend();
    backend
        .create_job(&job("done", "run1", JobStatus::Done, 1))
        .await
        .unwrap();
    backend
        .create_job(&job("queued", "run1", JobStatus::Submitted, 2))
        .await
        .unwrap();
    backend
        .create_job(&job("active", "run1", JobStatus::Running, 3))
        .await
        .unwrap();

    backend
        .stop_jobs(&repo(), Some(&RunName::from("run1")), None, false)
        .await
        .unwrap();

    let by_id: HashMap<String, JobStatus> = backend
        .list_job_heads(&repo(), None)
        .await
        .unwrap()
        .into_iter()
        .map(|h| (h.job_id.as_str().to_string(), h.status))
        .collect();
    assert_eq!(by_id["done"], JobStatus::Done);
    assert_eq!(by_id["queued"], JobStatus::Stopping);
    assert_eq!(by_id["active"], JobStatus::Stopping);
}

#[tokio::test]
async fn test_stop_jobs_with_abort_flag_hard_kills() {
    let (backend, _) = memory_backend();
    backend
        .create_job(&job("active", "run1", JobStatus::Running, 1))
        .await
        .unwrap();

    backend
        .stop_jobs(&repo(), Some(&RunName::from("run1")), None, true)
        .await
        .unwrap();

    let heads = backend.list_job_heads(&repo(), None).await.unwrap();
    assert_eq!(heads[0].status, JobStatus::Aborting);
}

#[tokio::test]
async fn test_stop_jobs_honors_workflow_filter() {
    let (backend, _) = memory_backend();
    backend
        .create_job(&workflow_job("train", "run1", "train", JobStatus::Running, 1))
        .await
        .unwrap();
    backend
        .create_job(&workflow_job("serve", "run1", "serve", JobStatus::Running, 2))
        .await
        .unwrap();

    backend
        .stop_jobs(&repo(), Some(&RunName::from("run1")), Some("train"), false)
        .await
        .unwrap();

    let by_id: HashMap<String, JobStatus> = backend
        .list_job_heads(&repo(), None)
        .await
        .unwrap()
        .into_iter()
        .map(|h| (h.job_id.as_str().to_string(), h.status))
        .collect();
    assert_eq!(by_id["train"], JobStatus::Stopping);
    assert_eq!(by_id["serve"], JobStatus::Running);
}

#[tokio::test]
async fn test_run_heads_aggregate_job_heads() {
    let (backend, _) = memory_backend();
    let mut with_artifacts = job("j1", "run1", JobStatus::Done, 100);
    with_artifacts.artifact_specs = vec![
        ArtifactSpec {
            artifact_path: "model".to_string(),
            mount: false,
        },
        ArtifactSpec {
            artifact_path: "logs".to_string(),
            mount: false,
        },
    ];
    backend.create_job(&with_artifacts).await.unwrap();
    backend
        .create_job(&job("j2", "run1", JobStatus::Running, 50))
        .await
        .unwrap();

    let runs = backend.list_run_heads(&repo(), None).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].submitted_at, 50);
    assert_eq!(runs[0].status, JobStatus::Running);
    assert_eq!(runs[0].artifact_paths.len(), 2);
}

#[tokio::test]
async fn test_tag_dep_resolves_to_tagged_run() {
    let (backend, _) = memory_backend();
    let mut done = job("j1", "run1", JobStatus::Done, 10);
    done.artifact_specs = vec![ArtifactSpec {
        artifact_path: "model".to_string(),
        mount: false,
    }];
    backend.create_job(&done).await.unwrap();
    backend
        .add_tag_from_run(&repo(), &TagName::from("mytag"), &RunName::from("run1"))
        .await
        .unwrap();

    let dep = resolve_dep(&backend, &repo(), ":mytag").await.unwrap();
    assert_eq!(dep.run_name, RunName::from("run1"));
    assert_eq!(dep.repo_user_name, "u");

    let err = resolve_dep(&backend, &repo(), ":missing").await.unwrap_err();
    assert!(matches!(err, BackendError::NotFound(msg) if msg.contains("missing")));
}

#[tokio::test]
async fn test_workflow_dep_picks_latest_done_head() {
    let (backend, _) = memory_backend();
    // Only the earliest head belongs to "train" and is DONE.
    backend
        .create_job(&workflow_job("j1", "run1", "train", JobStatus::Done, 10))
        .await
        .unwrap();
    backend
        .create_job(&workflow_job("j2", "run2", "serve", JobStatus::Done, 20))
        .await
        .unwrap();
    backend
        .create_job(&workflow_job("j3", "run3", "train", JobStatus::Failed, 30))
        .await
        .unwrap();

    let dep = resolve_dep(&backend, &repo(), "train").await.unwrap();
    assert_eq!(dep.run_name, RunName::from("run1"));

    // A second, more recent DONE "train" head wins.
    backend
        .create_job(&workflow_job("j4", "run4", "train", JobStatus::Done, 40))
        .await
        .unwrap();
    let dep = resolve_dep(&backend, &repo(), "train").await.unwrap();
    assert_eq!(dep.run_name, RunName::from("run4"));

    let err = resolve_dep(&backend, &repo(), "nothing").await.unwrap_err();
    assert!(matches!(err, BackendError::NotFound(_)));
}

#[tokio::test]
async fn test_malformed_dep_token_is_rejected_without_backend_calls() {
    let (backend, storage) = memory_backend();
    let err = resolve_dep(&backend, &repo(), "a/b").await.unwrap_err();
    assert!(matches!(err, BackendError::InvalidInput(msg) if msg.contains("a/b")));
    // Nothing was written anywhere.
    assert!(storage.list_keys("").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_add_tag_from_local_dirs_writes_tag_head_last() {
    let (backend, storage) = memory_backend();
    let scratch = tempfile::tempdir().unwrap();
    let ckpt = scratch.path().join("ckpt");
    let logs = scratch.path().join("logs");
    std::fs::create_dir_all(&ckpt).unwrap();
    std::fs::create_dir_all(&logs).unwrap();
    std::fs::write(ckpt.join("weights.bin"), b"wwww").unwrap();
    std::fs::write(logs.join("out.txt"), b"log").unwrap();

    backend
        .add_tag_from_local_dirs(
            &repo(),
            &TagName::from("snapshot"),
            &[ckpt.clone(), logs.clone()],
        )
        .await
        .unwrap();

    // Exactly one job body, no job head (the anchor job is invisible).
    let job_bodies: Vec<String> = storage
        .list_keys("jobs/u/r/")
        .await
        .unwrap()
        .into_iter()
        .filter(|k| k.ends_with(".json"))
        .collect();
    assert_eq!(job_bodies.len(), 1);
    assert!(backend.list_job_heads(&repo(), None).await.unwrap().is_empty());

    // Exactly one tag head referencing both artifacts under that job.
    let tags = backend.list_tag_heads(&repo()).await.unwrap();
    assert_eq!(tags.len(), 1);
    let tag = &tags[0];
    let job_id = &tag.artifact_heads[0].job_id;
    let mut artifact_paths: Vec<&str> = tag
        .artifact_heads
        .iter()
        .map(|a| a.artifact_path.as_str())
        .collect();
    artifact_paths.sort();
    assert_eq!(artifact_paths, vec!["ckpt", "logs"]);
    assert!(tag.artifact_heads.iter().all(|a| &a.job_id == job_id));

    // The artifact files themselves are durable under the anchor job.
    let files: Vec<Artifact> = backend
        .list_run_artifact_files(&repo(), &tag.run_name)
        .await
        .unwrap();
    assert_eq!(files.len(), 2);
}

#[tokio::test]
async fn test_add_tag_from_missing_dir_creates_nothing() {
    let (backend, storage) = memory_backend();
    let scratch = tempfile::tempdir().unwrap();
    let ckpt = scratch.path().join("ckpt");
    std::fs::create_dir_all(&ckpt).unwrap();

    let err = backend
        .add_tag_from_local_dirs(
            &repo(),
            &TagName::from("snapshot"),
            &[scratch.path().join("nope"), ckpt],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::InvalidInput(msg) if msg.contains("nope")));

    assert!(storage.list_keys("").await.unwrap().is_empty());
    assert!(backend.list_tag_heads(&repo()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_tag_from_run_stamps_and_delete_clears() {
    let (backend, storage) = memory_backend();
    let mut done = job("j1", "run1", JobStatus::Done, 10);
    done.artifact_specs = vec![ArtifactSpec {
        artifact_path: "model".to_string(),
        mount: false,
    }];
    backend.create_job(&done).await.unwrap();
    storage
        .put_object(
            "artifacts/u/r/run1,j1/model/w.bin",
            bytes::Bytes::from("w"),
        )
        .await
        .unwrap();

    backend
        .add_tag_from_run(&repo(), &TagName::from("best"), &RunName::from("run1"))
        .await
        .unwrap();

    let heads = backend.list_job_heads(&repo(), None).await.unwrap();
    assert_eq!(heads[0].tag_name, Some(TagName::from("best")));

    // Duplicate tag names are rejected.
    let err = backend
        .add_tag_from_run(&repo(), &TagName::from("best"), &RunName::from("run1"))
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::AlreadyExists(_)));

    let tag = backend
        .get_tag_head(&repo(), &TagName::from("best"))
        .await
        .unwrap()
        .unwrap();
    backend.delete_tag_head(&repo(), &tag).await.unwrap();

    assert!(backend
        .get_tag_head(&repo(), &TagName::from("best"))
        .await
        .unwrap()
        .is_none());
    let heads = backend.list_job_heads(&repo(), None).await.unwrap();
    assert_eq!(heads[0].tag_name, None);
    // Artifacts are never reclaimed by tag deletion.
    assert!(!storage.list_keys("artifacts/").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_run_allocates_distinct_names() {
    let (backend, _) = memory_backend();
    let first = backend.create_run(&repo()).await.unwrap();
    let second = backend.create_run(&repo()).await.unwrap();
    assert_ne!(first, second);
    // Mnemonic shape: {adjective}-{noun}-{n}
    assert_eq!(first.as_str().split('-').count(), 3);
    assert!(first
        .as_str()
        .rsplit('-')
        .next()
        .unwrap()
        .parse::<u64>()
        .is_ok());
}

#[tokio::test]
async fn test_poll_logs_filters_and_orders() {
    let (backend, storage) = memory_backend();
    let event = |ts: i64, msg: &str| LogEvent {
        timestamp: ts,
        job_id: Some(JobId::from("j1")),
        log_message: msg.to_string(),
        log_source: LogSource::Stdout,
    };
    let chunk = |events: &[LogEvent]| {
        events
            .iter()
            .map(|e| serde_json::to_string(e).unwrap())
            .collect::<Vec<_>>()
            .join("\n")
    };
    storage
        .put_object(
            "logs/u/r/run1/0001.jsonl",
            bytes::Bytes::from(chunk(&[event(10, "old"), event(20, "first")])),
        )
        .await
        .unwrap();
    storage
        .put_object(
            "logs/u/r/run1/0002.jsonl",
            bytes::Bytes::from(chunk(&[event(30, "second")])),
        )
        .await
        .unwrap();

    let stream = backend
        .poll_logs(&repo(), &RunName::from("run1"), 15, false)
        .await
        .unwrap();
    let events: Vec<LogEvent> = stream.map(|e| e.unwrap()).collect().await;
    let messages: Vec<&str> = events.iter().map(|e| e.log_message.as_str()).collect();
    assert_eq!(messages, vec!["first", "second"]);
}

#[tokio::test]
async fn test_attached_poll_logs_sees_late_chunks_and_cancels_cleanly() {
    let (backend, storage) = memory_backend();
    let event = serde_json::to_string(&LogEvent {
        timestamp: 10,
        job_id: None,
        log_message: "hello".to_string(),
        log_source: LogSource::Stderr,
    })
    .unwrap();
    storage
        .put_object("logs/u/r/run1/0001.jsonl", bytes::Bytes::from(event))
        .await
        .unwrap();

    let mut stream = backend
        .poll_logs(&repo(), &RunName::from("run1"), 0, true)
        .await
        .unwrap();
    let first = tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("attached stream should yield the existing event")
        .unwrap()
        .unwrap();
    assert_eq!(first.log_message, "hello");
    // Dropping the attached stream is the supported cancellation path.
    drop(stream);
}

struct TwoStepProvider;

impl JobProvider for TwoStepProvider {
    fn provider_name(&self) -> &str {
        "bash"
    }

    fn workflow_name(&self) -> Option<&str> {
        Some("train")
    }

    fn dep_tokens(&self) -> Vec<String> {
        vec![":base-data".to_string()]
    }

    fn create_job_specs(&self) -> drover_backend::Result<Vec<JobSpec>> {
        let spec = |cmd: &str| JobSpec {
            image_name: "ubuntu".to_string(),
            commands: vec![cmd.to_string()],
            env: HashMap::new(),
            working_dir: None,
            artifact_specs: vec![],
            port_count: None,
            requirements: None,
            app_specs: vec![],
        };
        Ok(vec![spec("prepare"), spec("train")])
    }
}

#[tokio::test]
async fn test_submit_provider_jobs_resolves_deps_and_submits() {
    let (backend, storage) = memory_backend();
    // Seed the tagged run the provider depends on.
    let mut done = job("j0", "base-run", JobStatus::Done, 1);
    done.artifact_specs = vec![ArtifactSpec {
        artifact_path: "data".to_string(),
        mount: false,
    }];
    backend.create_job(&done).await.unwrap();
    backend
        .add_tag_from_run(&repo(), &TagName::from("base-data"), &RunName::from("base-run"))
        .await
        .unwrap();

    let jobs = submit_provider_jobs(
        &backend,
        &TwoStepProvider,
        &repo(),
        &RunName::from("fresh-run-1"),
    )
    .await
    .unwrap();

    assert_eq!(jobs.len(), 2);
    assert_ne!(jobs[0].job_id, jobs[1].job_id);
    for job in &jobs {
        assert_eq!(job.status, JobStatus::Submitted);
        assert_eq!(job.deps.len(), 1);
        assert_eq!(job.deps[0].run_name, RunName::from("base-run"));
        // A runner ticket was written for each submitted job.
        assert!(storage
            .exists(&format!("runners/u/r/{}.json", job.job_id))
            .await
            .unwrap());
    }

    let heads = backend
        .list_job_heads(&repo(), Some(&RunName::from("fresh-run-1")))
        .await
        .unwrap();
    assert_eq!(heads.len(), 2);
}

#[tokio::test]
async fn test_unconfigured_backend_reports_not_configured() {
    let backend = StoreBackend::unconfigured("cloud");
    assert!(!backend.is_loaded());
    let err = backend.list_job_heads(&repo(), None).await.unwrap_err();
    assert!(matches!(err, BackendError::NotConfigured(_)));
}
