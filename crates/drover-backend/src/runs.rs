//! Run aggregation: folding job heads into run views.

use drover_commons::{JobHead, RepoAddress, RunHead};

/// Folds an unordered collection of job heads into the distinct runs they
/// belong to, grouped by `(run_name, workflow_name)`.
///
/// The first-seen head of a group seeds the run. Each further member lowers
/// `submitted_at` to the minimum and concatenates its artifact list without
/// de-duplication. The run status is the furthest-progressed unfinished
/// member status; a group with no unfinished member keeps the seed's status.
/// Output is sorted by `submitted_at` descending; ties preserve encounter
/// order (stable sort).
pub fn aggregate_run_heads(repo: &RepoAddress, job_heads: Vec<JobHead>) -> Vec<RunHead> {
    let mut runs: Vec<RunHead> = Vec::new();
    for head in job_heads {
        let existing = runs
            .iter_mut()
            .find(|run| run.run_name == head.run_name && run.workflow_name == head.workflow_name);
        match existing {
            None => runs.push(RunHead {
                repo_address: repo.clone(),
                run_name: head.run_name,
                workflow_name: head.workflow_name,
                provider_name: head.provider_name,
                status: head.status,
                submitted_at: head.submitted_at,
                artifact_paths: head.artifact_paths,
                tag_name: head.tag_name,
            }),
            Some(run) => {
                run.submitted_at = run.submitted_at.min(head.submitted_at);
                run.artifact_paths.extend(head.artifact_paths);
                if head.status.is_unfinished()
                    && (run.status.is_finished()
                        || head.status.progress_rank() > run.status.progress_rank())
                {
                    run.status = head.status;
                }
                if run.tag_name.is_none() {
                    run.tag_name = head.tag_name;
                }
            }
        }
    }
    runs.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use drover_commons::{JobId, JobStatus, RunName};

    fn repo() -> RepoAddress {
        RepoAddress::new("u", "r")
    }

    fn head(
        job_id: &str,
        run: &str,
        submitted_at: i64,
        status: JobStatus,
        artifacts: &[&str],
    ) -> JobHead {
        JobHead {
            job_id: JobId::from(job_id),
            run_name: RunName::from(run),
            workflow_name: None,
            provider_name: Some("bash".to_string()),
            status,
            submitted_at,
            artifact_paths: artifacts.iter().map(|a| a.to_string()).collect(),
            app_names: vec![],
            tag_name: None,
        }
    }

    #[test]
    fn test_submitted_at_folds_to_minimum() {
        let runs = aggregate_run_heads(
            &repo(),
            vec![
                head("j1", "r1", 100, JobStatus::Done, &[]),
                head("j2", "r1", 50, JobStatus::Done, &[]),
                head("j3", "r1", 75, JobStatus::Done, &[]),
            ],
        );
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].submitted_at, 50);
    }

    #[test]
    fn test_artifacts_concatenate_without_dedup() {
        let runs = aggregate_run_heads(
            &repo(),
            vec![
                head("j1", "r1", 1, JobStatus::Done, &["a", "b"]),
                head("j2", "r1", 2, JobStatus::Done, &["b", "c", "d"]),
            ],
        );
        assert_eq!(runs[0].artifact_paths.len(), 5);
    }

    #[test]
    fn test_unfinished_member_status_wins_deterministically() {
        // Whatever the encounter order, the furthest-progressed unfinished
        // status is the run status.
        let forward = aggregate_run_heads(
            &repo(),
            vec![
                head("j1", "r1", 1, JobStatus::Done, &[]),
                head("j2", "r1", 2, JobStatus::Submitted, &[]),
                head("j3", "r1", 3, JobStatus::Running, &[]),
            ],
        );
        let backward = aggregate_run_heads(
            &repo(),
            vec![
                head("j3", "r1", 3, JobStatus::Running, &[]),
                head("j2", "r1", 2, JobStatus::Submitted, &[]),
                head("j1", "r1", 1, JobStatus::Done, &[]),
            ],
        );
        assert_eq!(forward[0].status, JobStatus::Running);
        assert_eq!(backward[0].status, JobStatus::Running);
    }

    #[test]
    fn test_groups_split_on_workflow_name() {
        let mut with_workflow = head("j1", "r1", 1, JobStatus::Done, &[]);
        with_workflow.workflow_name = Some("train".to_string());
        let runs = aggregate_run_heads(
            &repo(),
            vec![with_workflow, head("j2", "r1", 2, JobStatus::Done, &[])],
        );
        assert_eq!(runs.len(), 2);
    }

    #[test]
    fn test_sorted_by_submitted_at_descending_with_stable_ties() {
        let runs = aggregate_run_heads(
            &repo(),
            vec![
                head("j1", "old", 10, JobStatus::Done, &[]),
                head("j2", "tie-first", 20, JobStatus::Done, &[]),
                head("j3", "tie-second", 20, JobStatus::Done, &[]),
                head("j4", "new", 30, JobStatus::Done, &[]),
            ],
        );
        let names: Vec<&str> = runs.iter().map(|r| r.run_name.as_str()).collect();
        assert_eq!(names, vec!["new", "tie-first", "tie-second", "old"]);
    }
}
