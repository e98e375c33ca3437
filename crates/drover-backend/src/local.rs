//! The local backend: the head/artifact scheme over a directory on this
//! machine. No network is involved; runner tickets are picked up by a local
//! runner process.

use std::path::PathBuf;
use std::sync::Arc;

use object_store::local::LocalFileSystem;
use serde::{Deserialize, Serialize};

use crate::store_backend::StoreBackend;

pub const LOCAL_BACKEND_NAME: &str = "local";

/// `[local]` section of the configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Data directory; defaults to `~/.drover/local`.
    pub root: Option<PathBuf>,
}

impl LocalConfig {
    fn resolved_root(&self) -> Option<PathBuf> {
        match &self.root {
            Some(root) => Some(root.clone()),
            None => dirs::home_dir().map(|home| home.join(".drover").join("local")),
        }
    }
}

/// Builds the local backend; an absent section or an unusable root yields
/// the unconfigured state rather than an error.
pub fn local_backend(config: Option<&LocalConfig>) -> StoreBackend {
    let Some(config) = config else {
        return StoreBackend::unconfigured(LOCAL_BACKEND_NAME);
    };
    let Some(root) = config.resolved_root() else {
        log::warn!("local backend: no home directory and no explicit root");
        return StoreBackend::unconfigured(LOCAL_BACKEND_NAME);
    };
    if let Err(err) = std::fs::create_dir_all(&root) {
        log::warn!("local backend: cannot create '{}': {err}", root.display());
        return StoreBackend::unconfigured(LOCAL_BACKEND_NAME);
    }
    match LocalFileSystem::new_with_prefix(&root) {
        Ok(store) => StoreBackend::with_store(LOCAL_BACKEND_NAME, Arc::new(store)),
        Err(err) => {
            log::warn!("local backend: cannot open '{}': {err}", root.display());
            StoreBackend::unconfigured(LOCAL_BACKEND_NAME)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;

    #[test]
    fn test_absent_section_is_unconfigured() {
        let backend = local_backend(None);
        assert!(!backend.is_loaded());
        assert_eq!(backend.name(), "local");
    }

    #[test]
    fn test_explicit_root_loads() {
        let dir = tempfile::tempdir().unwrap();
        let backend = local_backend(Some(&LocalConfig {
            root: Some(dir.path().to_path_buf()),
        }));
        assert!(backend.is_loaded());
    }
}
