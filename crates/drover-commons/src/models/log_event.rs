//! Log events polled from a run.

use serde::{Deserialize, Serialize};

use crate::ids::JobId;

/// Which stream of the job process produced the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSource {
    Stdout,
    Stderr,
}

/// One log line emitted by a job, stamped with a millisecond timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub timestamp: i64,
    pub job_id: Option<JobId>,
    pub log_message: String,
    pub log_source: LogSource,
}
