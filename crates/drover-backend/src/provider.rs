//! The provider seam: turning workflow configuration into submitted jobs.
//!
//! Providers are external: they parse workflow definitions and produce
//! [`JobSpec`]s. The driver here owns everything around that: dependency
//! resolution (fail fast, before any submission), job-id assignment and
//! submission through the backend contract.

use drover_commons::{
    timestamp_millis, Job, JobSpec, JobStatus, RepoAddress, RunName, SnowflakeGenerator,
};

use crate::backend::Backend;
use crate::deps::resolve_dep;
use crate::error::{BackendError, Result};

/// Produces job specifications from a loaded workflow configuration.
pub trait JobProvider: Send + Sync {
    fn provider_name(&self) -> &str;

    /// The workflow this provider was loaded for; `None` when the provider
    /// runs standalone.
    fn workflow_name(&self) -> Option<&str> {
        None
    }

    /// Unresolved dependency tokens (`train`, `:best-model`,
    /// `acme/models/train`) declared by the workflow.
    fn dep_tokens(&self) -> Vec<String> {
        Vec::new()
    }

    fn create_job_specs(&self) -> Result<Vec<JobSpec>>;
}

/// Submits every job a provider produces under the given run name.
///
/// Dependencies resolve first: a malformed token or an unresolvable
/// reference aborts before anything is written. Each job gets a
/// collision-resistant id, the current timestamp and the resolved deps, then
/// goes through `submit_job` (create + hand to a runner).
pub async fn submit_provider_jobs(
    backend: &dyn Backend,
    provider: &dyn JobProvider,
    repo_address: &RepoAddress,
    run_name: &RunName,
) -> Result<Vec<Job>> {
    let mut deps = Vec::new();
    for token in provider.dep_tokens() {
        deps.push(resolve_dep(backend, repo_address, &token).await?);
    }
    let specs = provider.create_job_specs()?;

    let generator = SnowflakeGenerator::for_process();
    let mut jobs = Vec::with_capacity(specs.len());
    for spec in specs {
        let job = build_job(repo_address, run_name, provider, &deps, spec, &generator)?;
        backend.submit_job(&job).await?;
        jobs.push(job);
    }
    Ok(jobs)
}

fn build_job(
    repo_address: &RepoAddress,
    run_name: &RunName,
    provider: &dyn JobProvider,
    deps: &[drover_commons::Dep],
    spec: JobSpec,
    generator: &SnowflakeGenerator,
) -> Result<Job> {
    Ok(Job {
        job_id: generator.next_job_id().map_err(BackendError::Other)?,
        repo_address: repo_address.clone(),
        run_name: run_name.clone(),
        workflow_name: provider.workflow_name().map(str::to_string),
        provider_name: Some(provider.provider_name().to_string()),
        status: JobStatus::Submitted,
        submitted_at: timestamp_millis(),
        image_name: spec.image_name,
        commands: spec.commands,
        env: spec.env,
        working_dir: spec.working_dir,
        artifact_specs: spec.artifact_specs,
        port_count: spec.port_count,
        ports: Vec::new(),
        host_name: None,
        requirements: spec.requirements,
        deps: deps.to_vec(),
        app_specs: spec.app_specs,
        tag_name: None,
    })
}
