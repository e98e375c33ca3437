//! Log polling over runner-written JSONL chunks.
//!
//! Runners append chunk objects under `logs/{repo}/{run}/` in key order;
//! each chunk is JSON-lines of [`LogEvent`]. Polling reads chunks the
//! consumer has not seen yet, orders events by timestamp within each batch
//! and, in attached mode, keeps re-listing for new chunks until the caller
//! drops the stream. Dropping the stream at any point cancels cleanly; the
//! only held resource is the storage handle.

use std::collections::VecDeque;
use std::time::Duration;

use futures_util::stream;

use drover_commons::{LogEvent, RepoAddress, RunName};
use drover_store::{keys, Storage};

use crate::backend::LogEventStream;
use crate::error::Result;

/// Delay between listings when an attached stream has drained everything.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

struct PollState {
    storage: Storage,
    prefix: String,
    /// Last chunk key already consumed; listings only read keys beyond it.
    seen: Option<String>,
    pending: VecDeque<LogEvent>,
    start_time: i64,
    attached: bool,
}

/// Builds the lazy log-event stream for one run.
pub fn poll_log_events(
    storage: Storage,
    repo: &RepoAddress,
    run_name: &RunName,
    start_time: i64,
    attached: bool,
) -> LogEventStream {
    let state = PollState {
        storage,
        prefix: keys::logs_prefix(repo, run_name),
        seen: None,
        pending: VecDeque::new(),
        start_time,
        attached,
    };
    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((Ok(event), state));
            }
            match fetch_next_batch(&mut state).await {
                Ok(true) => continue,
                Ok(false) => {
                    if !state.attached {
                        return None;
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                Err(err) => return Some((Err(err), state)),
            }
        }
    }))
}

/// Reads every not-yet-seen chunk into `state.pending`; `Ok(false)` when no
/// new chunk exists.
async fn fetch_next_batch(state: &mut PollState) -> Result<bool> {
    let chunk_keys: Vec<String> = state
        .storage
        .list_keys(&state.prefix)
        .await?
        .into_iter()
        .filter(|key| state.seen.as_ref().map_or(true, |seen| key > seen))
        .collect();
    if chunk_keys.is_empty() {
        return Ok(false);
    }

    let mut batch = Vec::new();
    for key in chunk_keys {
        let bytes = state.storage.get_object(&key).await?;
        let text = String::from_utf8_lossy(&bytes);
        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LogEvent>(line) {
                Ok(event) if event.timestamp >= state.start_time => batch.push(event),
                Ok(_) => {}
                Err(err) => log::warn!("skipping malformed log line in '{key}': {err}"),
            }
        }
        state.seen = Some(key);
    }
    batch.sort_by_key(|event| event.timestamp);
    state.pending.extend(batch);
    Ok(true)
}
