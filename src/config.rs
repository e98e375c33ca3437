// Configuration module
//
// One TOML file at ~/.drover/config.toml with an optional section per
// backend. A missing file or a missing section is not an error: the
// corresponding backend simply reports itself unconfigured and the registry
// skips it during selection.

use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use drover_backend::{CloudConfig, HubConfig, LocalConfig};

/// Environment variable overriding the configuration file path.
pub const CONFIG_PATH_ENV: &str = "DROVER_CONFIG";

/// Client configuration loaded from the TOML file.
///
/// ```toml
/// [cloud]
/// bucket = "acme-runs"
/// region = "eu-west-1"
///
/// [hub]
/// url = "http://hub.internal:3000"
/// token = "hub-token"
/// hub_name = "main"
///
/// [local]
/// # root = "/var/lib/drover"   # defaults to ~/.drover/local
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DroverConfig {
    pub cloud: Option<CloudConfig>,
    pub hub: Option<HubConfig>,
    pub local: Option<LocalConfig>,
}

impl DroverConfig {
    /// Default configuration file location: `~/.drover/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".drover").join("config.toml"))
    }

    /// Loads the configuration from `DROVER_CONFIG` or the default path. A
    /// missing file yields the empty configuration; an unreadable or
    /// unparsable file is an error.
    pub fn load() -> anyhow::Result<Self> {
        let path = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => PathBuf::from(path),
            None => match Self::default_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };
        Self::load_from(&path)
    }

    /// Loads the configuration from an explicit path.
    pub fn load_from(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            log::debug!("no configuration file at '{}'", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        let config: DroverConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse '{}'", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_empty_config() {
        let config = DroverConfig::load_from(std::path::Path::new("/no/such/config.toml")).unwrap();
        assert!(config.cloud.is_none());
        assert!(config.hub.is_none());
        assert!(config.local.is_none());
    }

    #[test]
    fn test_partial_file_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[local]\nroot = \"/tmp/drover-test\"\n\n[hub]\nurl = \"http://h:1\"\ntoken = \"t\"\nhub_name = \"main\"\n",
        )
        .unwrap();
        let config = DroverConfig::load_from(&path).unwrap();
        assert!(config.cloud.is_none());
        assert!(config.local.is_some());
        assert_eq!(config.hub.unwrap().hub_name, "main");
    }

    #[test]
    fn test_garbage_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not toml at all [[[").unwrap();
        assert!(DroverConfig::load_from(&path).is_err());
    }
}
