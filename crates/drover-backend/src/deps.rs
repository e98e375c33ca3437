//! Dependency resolution: mapping tag/workflow tokens to concrete runs.
//!
//! A dependency token names either a tag (`:best-model`) or a workflow
//! (`train`), optionally qualified with a repository
//! (`acme/models/train`). Resolution happens before submission and is fail
//! fast: a malformed token or an unresolvable name aborts the submission
//! with no remote side effect.

use drover_commons::{Dep, JobStatus, RepoAddress, TagName};

use crate::backend::Backend;
use crate::error::{BackendError, Result};

/// A parsed, not yet resolved dependency token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepToken {
    /// `true` for tag references (leading `:`), `false` for workflow
    /// references.
    pub is_tag: bool,
    /// Target repository; `None` means the current repository.
    pub repo: Option<(String, String)>,
    pub name: String,
}

/// Parses `[:]name` or `[:]user/repo/name`. Any other shape (2 segments, 4+
/// segments, empty segments) is a fatal input error.
pub fn parse_dep_token(token: &str) -> Result<DepToken> {
    let (is_tag, rest) = match token.strip_prefix(':') {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    let segments: Vec<&str> = rest.split('/').collect();
    match segments.as_slice() {
        [name] if !name.is_empty() => Ok(DepToken {
            is_tag,
            repo: None,
            name: name.to_string(),
        }),
        [user, repo, name] if !user.is_empty() && !repo.is_empty() && !name.is_empty() => {
            Ok(DepToken {
                is_tag,
                repo: Some((user.to_string(), repo.to_string())),
                name: name.to_string(),
            })
        }
        _ => Err(BackendError::InvalidInput(format!(
            "invalid dependency format: {token}"
        ))),
    }
}

/// Resolves a dependency token against a backend into a [`Dep`] pointing at
/// a concrete prior run.
pub async fn resolve_dep(
    backend: &dyn Backend,
    current_repo: &RepoAddress,
    token: &str,
) -> Result<Dep> {
    let parsed = parse_dep_token(token)?;
    let target_repo = match &parsed.repo {
        Some((user, name)) => RepoAddress::new(user.clone(), name.clone()),
        None => current_repo.clone(),
    };
    if parsed.is_tag {
        resolve_tag_dep(backend, &target_repo, &TagName::new(parsed.name)).await
    } else {
        resolve_workflow_dep(backend, &target_repo, &parsed.name).await
    }
}

/// Tag reference: the tag head names the run directly.
async fn resolve_tag_dep(
    backend: &dyn Backend,
    repo: &RepoAddress,
    tag_name: &TagName,
) -> Result<Dep> {
    match backend.get_tag_head(repo, tag_name).await? {
        Some(tag_head) => Ok(Dep {
            repo_user_name: repo.repo_user_name.clone(),
            repo_name: repo.repo_name.clone(),
            run_name: tag_head.run_name,
        }),
        None => Err(BackendError::NotFound(format!(
            "cannot find the tag '{tag_name}' in the '{repo}' repo"
        ))),
    }
}

/// Workflow reference: the most recently submitted job head of that workflow
/// that finished successfully names the run.
async fn resolve_workflow_dep(
    backend: &dyn Backend,
    repo: &RepoAddress,
    workflow_name: &str,
) -> Result<Dep> {
    let mut job_heads = backend.list_job_heads(repo, None).await?;
    job_heads.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
    let run_name = job_heads
        .into_iter()
        .find(|head| {
            head.workflow_name.as_deref() == Some(workflow_name)
                && head.status == JobStatus::Done
        })
        .map(|head| head.run_name);
    match run_name {
        Some(run_name) => Ok(Dep {
            repo_user_name: repo.repo_user_name.clone(),
            repo_name: repo.repo_name.clone(),
            run_name,
        }),
        None => Err(BackendError::NotFound(format!(
            "cannot find any successful workflow named '{workflow_name}' in the '{repo}' repo"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_workflow_token() {
        let token = parse_dep_token("train").unwrap();
        assert_eq!(
            token,
            DepToken {
                is_tag: false,
                repo: None,
                name: "train".to_string()
            }
        );
    }

    #[test]
    fn test_parse_tag_token() {
        let token = parse_dep_token(":best-model").unwrap();
        assert!(token.is_tag);
        assert_eq!(token.name, "best-model");
    }

    #[test]
    fn test_parse_qualified_tokens() {
        let token = parse_dep_token("acme/models/train").unwrap();
        assert_eq!(token.repo, Some(("acme".to_string(), "models".to_string())));
        assert_eq!(token.name, "train");

        let token = parse_dep_token(":acme/models/best").unwrap();
        assert!(token.is_tag);
        assert_eq!(token.repo, Some(("acme".to_string(), "models".to_string())));
    }

    #[test]
    fn test_malformed_tokens_are_fatal_input_errors() {
        for token in ["a/b", "a/b/c/d", "", ":", "a//c", "/b/c"] {
            let err = parse_dep_token(token).unwrap_err();
            assert!(
                matches!(err, BackendError::InvalidInput(msg) if msg.contains(token)),
                "expected InvalidInput for {token:?}"
            );
        }
    }
}
