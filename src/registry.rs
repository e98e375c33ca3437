//! The backend registry: construction and selection.
//!
//! Built once at startup from the loaded configuration and passed to
//! consumers; there is no module-level mutable state. Candidates sit in a
//! fixed order; a backend whose configuration section is absent or
//! unloadable reports itself unavailable and is skipped during selection.

use drover_backend::{cloud_backend, local_backend, Backend, BackendError, HubBackend, Result};

use crate::config::DroverConfig;

/// All known backends, loaded or not.
pub struct BackendRegistry {
    backends: Vec<Box<dyn Backend>>,
}

impl BackendRegistry {
    /// Builds every known backend from the configuration. Candidate order
    /// is fixed (cloud, hub, local) and decides which backend
    /// [`current`](Self::current) selects when several are configured.
    pub fn from_config(config: &DroverConfig) -> Self {
        let backends: Vec<Box<dyn Backend>> = vec![
            Box::new(cloud_backend(config.cloud.as_ref())),
            Box::new(HubBackend::from_config(config.hub.as_ref())),
            Box::new(local_backend(config.local.as_ref())),
        ];
        Self { backends }
    }

    /// The first backend that loaded its configuration.
    pub fn current(&self) -> Result<&dyn Backend> {
        self.backends
            .iter()
            .map(|backend| backend.as_ref())
            .find(|backend| backend.is_loaded())
            .ok_or_else(|| {
                BackendError::NotConfigured("no backend is configured".to_string())
            })
    }

    /// Looks a backend up by name; unknown names and unloaded backends are
    /// both absent from the usable set.
    pub fn get(&self, name: &str) -> Result<&dyn Backend> {
        self.backends
            .iter()
            .map(|backend| backend.as_ref())
            .find(|backend| backend.name() == name && backend.is_loaded())
            .ok_or_else(|| BackendError::BackendNotFound(name.to_string()))
    }

    /// Every loaded backend, in candidate order.
    pub fn list(&self) -> Vec<&dyn Backend> {
        self.backends
            .iter()
            .map(|backend| backend.as_ref())
            .filter(|backend| backend.is_loaded())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drover_backend::LocalConfig;

    #[test]
    fn test_empty_config_has_no_current_backend() {
        let registry = BackendRegistry::from_config(&DroverConfig::default());
        assert!(matches!(
            registry.current(),
            Err(BackendError::NotConfigured(_))
        ));
        assert!(registry.list().is_empty());
    }

    #[test]
    fn test_local_only_config_selects_local() {
        let dir = tempfile::tempdir().unwrap();
        let config = DroverConfig {
            local: Some(LocalConfig {
                root: Some(dir.path().to_path_buf()),
            }),
            ..Default::default()
        };
        let registry = BackendRegistry::from_config(&config);
        assert_eq!(registry.current().unwrap().name(), "local");
        assert_eq!(registry.get("local").unwrap().name(), "local");
        // Known name, but unconfigured: absent from the usable set.
        assert!(matches!(
            registry.get("cloud"),
            Err(BackendError::BackendNotFound(name)) if name == "cloud"
        ));
        assert!(matches!(
            registry.get("nonsense"),
            Err(BackendError::BackendNotFound(_))
        ));
    }

    #[test]
    fn test_hub_outranks_local_in_selection() {
        let dir = tempfile::tempdir().unwrap();
        let config = DroverConfig {
            hub: Some(drover_backend::HubConfig {
                url: "http://localhost:3000".to_string(),
                token: "t".to_string(),
                hub_name: "main".to_string(),
                timeout_seconds: None,
            }),
            local: Some(LocalConfig {
                root: Some(dir.path().to_path_buf()),
            }),
            ..Default::default()
        };
        let registry = BackendRegistry::from_config(&config);
        assert_eq!(registry.current().unwrap().name(), "hub");
        assert_eq!(registry.list().len(), 2);
    }
}
