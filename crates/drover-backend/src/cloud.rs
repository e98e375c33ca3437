//! The cloud backend: the head/artifact scheme over an S3 bucket.
//!
//! Credentials come from the environment (the standard AWS variable set);
//! the configuration section only names the bucket and its location.

use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use serde::{Deserialize, Serialize};

use crate::store_backend::StoreBackend;

pub const CLOUD_BACKEND_NAME: &str = "cloud";

/// `[cloud]` section of the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    pub bucket: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub allow_http: bool,
}

/// Builds the cloud backend; an absent section or an unbuildable client
/// yields the unconfigured state rather than an error.
pub fn cloud_backend(config: Option<&CloudConfig>) -> StoreBackend {
    let Some(config) = config else {
        return StoreBackend::unconfigured(CLOUD_BACKEND_NAME);
    };
    let mut builder = AmazonS3Builder::from_env().with_bucket_name(&config.bucket);
    if let Some(region) = &config.region {
        builder = builder.with_region(region);
    }
    if let Some(endpoint) = &config.endpoint {
        builder = builder.with_endpoint(endpoint);
    }
    if config.allow_http {
        builder = builder.with_allow_http(true);
    }
    match builder.build() {
        Ok(store) => StoreBackend::with_store(CLOUD_BACKEND_NAME, Arc::new(store)),
        Err(err) => {
            log::warn!("cloud backend: cannot build store for '{}': {err}", config.bucket);
            StoreBackend::unconfigured(CLOUD_BACKEND_NAME)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;

    #[test]
    fn test_absent_section_is_unconfigured() {
        let backend = cloud_backend(None);
        assert!(!backend.is_loaded());
        assert_eq!(backend.name(), "cloud");
    }
}
