//! Applications exposed by a running job.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ids::JobId;

/// Declared at submission time: an application served on one of the job's
/// allocated ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSpec {
    pub port_index: u16,
    pub app_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_query_params: Option<HashMap<String, String>>,
}

/// Listable marker for a running application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppHead {
    pub job_id: JobId,
    pub app_name: String,
}
