//! Head encoding: job/run/tag existence and state as storage keys.
//!
//! A head is a marker object whose key carries every field of the record;
//! the body is empty, so a single prefix listing is enough to read existence
//! and state. Keys follow the layout
//!
//! ```text
//! jobs/{repo}/l;{run};{job_id};{workflow};{provider};{submitted_at};{status};{artifacts};{apps};{tag}
//! tags/{repo}/l;{tag};{run};{workflow};{provider};{created_at};{artifact_heads}
//! runs/{repo}/l;{run};{created_at}
//! ```
//!
//! Fields are joined by `;`, list elements by `,`, artifact heads as
//! `job_id=artifact_path`. Optional fields serialize as empty segments,
//! never omitted positions, so `decode(encode(x)) == x` for every valid
//! head. Values are escaped so a name containing a separator can never be
//! misparsed as a hierarchy or field boundary.

use std::str::FromStr;

use drover_commons::{
    ArtifactHead, JobHead, JobId, JobStatus, RepoAddress, RunName, TagHead, TagName,
};

use crate::error::{Result, StoreError};

/// Marker that distinguishes head keys from body objects in the same
/// directory (`l;...` vs `{job_id}.json`).
const HEAD_MARKER: &str = "l;";

const FIELD_SEP: char = ';';
const LIST_SEP: char = ',';
const PAIR_SEP: char = '=';

// ---------------------------------------------------------------------------
// Segment escaping
// ---------------------------------------------------------------------------

/// Bytes that pass through a stored key untouched. Everything else is
/// escaped, which keeps the field separators (`;`, `,`, `=`) and the
/// hierarchy separator (`/`) unambiguous AND keeps the key identical to
/// what the store reports back on listing (stores canonicalize keys by
/// percent-encoding characters like `%`, so the escape lead must be a
/// character they leave alone; `!` is in the S3 safe set).
fn is_plain(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.')
}

/// Escapes every byte outside `[A-Za-z0-9._-]` as `!XX` so field values
/// survive embedding in a head key.
pub fn escape_segment(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        if is_plain(byte) {
            out.push(byte as char);
        } else {
            out.push('!');
            out.push_str(&format!("{byte:02X}"));
        }
    }
    out
}

/// Exact inverse of [`escape_segment`].
pub fn unescape_segment(value: &str) -> Result<String> {
    let mut out = Vec::with_capacity(value.len());
    let mut bytes = value.bytes();
    while let Some(byte) = bytes.next() {
        if byte != b'!' {
            out.push(byte);
            continue;
        }
        match (bytes.next(), bytes.next()) {
            (Some(hi), Some(lo)) => {
                let hex = [hi, lo];
                let code = std::str::from_utf8(&hex)
                    .ok()
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                    .ok_or_else(|| {
                        StoreError::InvalidKey(format!("bad escape in '{value}'"))
                    })?;
                out.push(code);
            }
            _ => {
                return Err(StoreError::InvalidKey(format!(
                    "truncated escape in '{value}'"
                )))
            }
        }
    }
    String::from_utf8(out).map_err(|_| StoreError::InvalidKey(format!("bad escape in '{value}'")))
}

fn escape_opt(value: Option<&str>) -> String {
    value.map(escape_segment).unwrap_or_default()
}

fn unescape_opt(segment: &str) -> Result<Option<String>> {
    if segment.is_empty() {
        Ok(None)
    } else {
        Ok(Some(unescape_segment(segment)?))
    }
}

/// Rejects values that cannot appear raw inside the fixed artifact/log key
/// layouts (those layouts are positional and unescaped for interoperability).
pub fn validate_key_component(value: &str, what: &str) -> Result<()> {
    if value.is_empty() {
        return Err(StoreError::InvalidInput(format!("{what} cannot be empty")));
    }
    if value.contains(['/', ';', ',']) {
        return Err(StoreError::InvalidInput(format!(
            "{what} contains a reserved separator: {value}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Job heads
// ---------------------------------------------------------------------------

/// Prefix under which all job heads of a repository live.
pub fn job_heads_prefix(repo: &RepoAddress, run_name: Option<&RunName>) -> String {
    match run_name {
        Some(run) => format!(
            "jobs/{}/{}{};",
            repo.path(),
            HEAD_MARKER,
            escape_segment(run.as_str())
        ),
        None => format!("jobs/{}/{}", repo.path(), HEAD_MARKER),
    }
}

/// Encodes a job head into its storage key.
pub fn job_head_key(repo: &RepoAddress, head: &JobHead) -> String {
    let fields = [
        escape_segment(head.run_name.as_str()),
        escape_segment(head.job_id.as_str()),
        escape_opt(head.workflow_name.as_deref()),
        escape_opt(head.provider_name.as_deref()),
        head.submitted_at.to_string(),
        head.status.as_str().to_string(),
        join_list(&head.artifact_paths),
        join_list(&head.app_names),
        escape_opt(head.tag_name.as_ref().map(TagName::as_str)),
    ];
    format!("jobs/{}/{}{}", repo.path(), HEAD_MARKER, fields.join(";"))
}

/// Decodes a job head from its storage key; the exact inverse of
/// [`job_head_key`].
pub fn parse_job_head_key(repo: &RepoAddress, key: &str) -> Result<JobHead> {
    let fields = head_fields(repo, "jobs", key, 9)?;
    Ok(JobHead {
        run_name: RunName::new(unescape_segment(fields[0])?),
        job_id: JobId::new(unescape_segment(fields[1])?),
        workflow_name: unescape_opt(fields[2])?,
        provider_name: unescape_opt(fields[3])?,
        submitted_at: parse_millis(fields[4], key)?,
        status: parse_status(fields[5], key)?,
        artifact_paths: split_list(fields[6])?,
        app_names: split_list(fields[7])?,
        tag_name: unescape_opt(fields[8])?.map(TagName::new),
    })
}

/// Key of the full job body object (JSON), next to the head markers.
pub fn job_file_key(repo: &RepoAddress, job_id: &JobId) -> String {
    format!("jobs/{}/{}.json", repo.path(), job_id)
}

/// Key of the runner ticket consumed by the external runner fleet.
pub fn runner_key(repo: &RepoAddress, job_id: &JobId) -> String {
    format!("runners/{}/{}.json", repo.path(), job_id)
}

/// Resolves concurrently observable duplicate heads of the same job.
///
/// During a not-yet-completed replace-on-transition both the old and the new
/// head key exist. Readers keep, per job id, the head with the greatest
/// `submitted_at`; equal timestamps (the usual case for a status transition)
/// resolve to the further-progressed status.
pub fn dedup_job_heads(heads: Vec<JobHead>) -> Vec<JobHead> {
    let mut deduped: Vec<JobHead> = Vec::with_capacity(heads.len());
    for head in heads {
        match deduped.iter_mut().find(|kept| kept.job_id == head.job_id) {
            None => deduped.push(head),
            Some(kept) => {
                let newer = (head.submitted_at, head.status.progress_rank())
                    > (kept.submitted_at, kept.status.progress_rank());
                if newer {
                    *kept = head;
                }
            }
        }
    }
    deduped
}

// ---------------------------------------------------------------------------
// Tag heads
// ---------------------------------------------------------------------------

/// Prefix under which all tag heads of a repository live.
pub fn tag_heads_prefix(repo: &RepoAddress, tag_name: Option<&TagName>) -> String {
    match tag_name {
        Some(tag) => format!(
            "tags/{}/{}{};",
            repo.path(),
            HEAD_MARKER,
            escape_segment(tag.as_str())
        ),
        None => format!("tags/{}/{}", repo.path(), HEAD_MARKER),
    }
}

/// Encodes a tag head into its storage key.
pub fn tag_head_key(repo: &RepoAddress, head: &TagHead) -> String {
    let artifact_heads = head
        .artifact_heads
        .iter()
        .map(|a| {
            format!(
                "{}{}{}",
                escape_segment(a.job_id.as_str()),
                PAIR_SEP,
                escape_segment(&a.artifact_path)
            )
        })
        .collect::<Vec<_>>()
        .join(&LIST_SEP.to_string());
    let fields = [
        escape_segment(head.tag_name.as_str()),
        escape_segment(head.run_name.as_str()),
        escape_opt(head.workflow_name.as_deref()),
        escape_opt(head.provider_name.as_deref()),
        head.created_at.to_string(),
        artifact_heads,
    ];
    format!("tags/{}/{}{}", repo.path(), HEAD_MARKER, fields.join(";"))
}

/// Decodes a tag head from its storage key; the exact inverse of
/// [`tag_head_key`].
pub fn parse_tag_head_key(repo: &RepoAddress, key: &str) -> Result<TagHead> {
    let fields = head_fields(repo, "tags", key, 6)?;
    let mut artifact_heads = Vec::new();
    if !fields[5].is_empty() {
        for pair in fields[5].split(LIST_SEP) {
            let (job_id, artifact_path) = pair.split_once(PAIR_SEP).ok_or_else(|| {
                StoreError::InvalidKey(format!("bad artifact head '{pair}' in '{key}'"))
            })?;
            artifact_heads.push(ArtifactHead {
                job_id: JobId::new(unescape_segment(job_id)?),
                artifact_path: unescape_segment(artifact_path)?,
            });
        }
    }
    Ok(TagHead {
        repo_address: repo.clone(),
        tag_name: TagName::new(unescape_segment(fields[0])?),
        run_name: RunName::new(unescape_segment(fields[1])?),
        workflow_name: unescape_opt(fields[2])?,
        provider_name: unescape_opt(fields[3])?,
        created_at: parse_millis(fields[4], key)?,
        artifact_heads,
    })
}

// ---------------------------------------------------------------------------
// Run markers
// ---------------------------------------------------------------------------

/// Prefix under which run-name markers live; `name_prefix` narrows the
/// listing to one mnemonic family during allocation.
pub fn run_markers_prefix(repo: &RepoAddress, name_prefix: Option<&str>) -> String {
    match name_prefix {
        Some(p) => format!("runs/{}/{}{}", repo.path(), HEAD_MARKER, escape_segment(p)),
        None => format!("runs/{}/{}", repo.path(), HEAD_MARKER),
    }
}

/// Encodes a run-name reservation marker.
pub fn run_marker_key(repo: &RepoAddress, run_name: &RunName, created_at: i64) -> String {
    format!(
        "runs/{}/{}{};{}",
        repo.path(),
        HEAD_MARKER,
        escape_segment(run_name.as_str()),
        created_at
    )
}

/// Decodes a run-name reservation marker.
pub fn parse_run_marker_key(repo: &RepoAddress, key: &str) -> Result<(RunName, i64)> {
    let fields = head_fields(repo, "runs", key, 2)?;
    Ok((
        RunName::new(unescape_segment(fields[0])?),
        parse_millis(fields[1], key)?,
    ))
}

// ---------------------------------------------------------------------------
// Secrets, credentials, logs
// ---------------------------------------------------------------------------

pub fn secrets_prefix(repo: &RepoAddress) -> String {
    format!("secrets/{}/", repo.path())
}

pub fn secret_key(repo: &RepoAddress, secret_name: &str) -> String {
    format!("secrets/{}/{}", repo.path(), secret_name)
}

pub fn repo_credentials_key(repo: &RepoAddress) -> String {
    format!("repos/{}/credentials.json", repo.path())
}

/// Prefix of the JSONL log chunks runners append for one run.
pub fn logs_prefix(repo: &RepoAddress, run_name: &RunName) -> String {
    format!("logs/{}/{}/", repo.path(), run_name)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn join_list(values: &[String]) -> String {
    values
        .iter()
        .map(|v| escape_segment(v))
        .collect::<Vec<_>>()
        .join(&LIST_SEP.to_string())
}

fn split_list(segment: &str) -> Result<Vec<String>> {
    if segment.is_empty() {
        return Ok(Vec::new());
    }
    segment
        .split(LIST_SEP)
        .map(unescape_segment)
        .collect::<Result<Vec<_>>>()
}

/// Strips `{namespace}/{repo}/l;` and splits the remainder into exactly
/// `expected` `;`-separated fields.
fn head_fields<'a>(
    repo: &RepoAddress,
    namespace: &str,
    key: &'a str,
    expected: usize,
) -> Result<Vec<&'a str>> {
    let prefix = format!("{}/{}/{}", namespace, repo.path(), HEAD_MARKER);
    let rest = key
        .strip_prefix(&prefix)
        .ok_or_else(|| StoreError::InvalidKey(format!("not a {namespace} head key: {key}")))?;
    let fields: Vec<&str> = rest.split(FIELD_SEP).collect();
    if fields.len() != expected {
        return Err(StoreError::InvalidKey(format!(
            "expected {expected} fields in head key, got {}: {key}",
            fields.len()
        )));
    }
    Ok(fields)
}

fn parse_millis(segment: &str, key: &str) -> Result<i64> {
    i64::from_str(segment)
        .map_err(|_| StoreError::InvalidKey(format!("bad timestamp '{segment}' in '{key}'")))
}

fn parse_status(segment: &str, key: &str) -> Result<JobStatus> {
    segment
        .parse::<JobStatus>()
        .map_err(|_| StoreError::InvalidKey(format!("bad status '{segment}' in '{key}'")))
}
