//! Configuration management for RAX Share
//!
//! Values come from built-in defaults, an optional `config.toml`, and
//! `RAX_SHARE_*` environment variables, in increasing priority.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_STORAGE_ROOT: &str = "uploads";

/// Candidate config files, tried in order. Both are optional.
const CONFIG_PATHS: [&str; 2] = [
    "rax-share/config", // Docker production: /app/rax-share/config.toml
    "config",           // Local development: ./config.toml
];

/// Storage manager configuration
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ShareConfig {
    /// Root of the shared directory tree. Created at startup if absent.
    /// Environment: RAX_SHARE_STORAGE_ROOT
    pub storage_root: String,

    /// Where folder archives are staged before download. Defaults to the
    /// system temporary directory.
    /// Environment: RAX_SHARE_STAGING_DIR
    #[serde(default)]
    pub staging_dir: Option<String>,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            storage_root: DEFAULT_STORAGE_ROOT.to_string(),
            staging_dir: None,
        }
    }
}

/// `RAX_SHARE_STORAGE_ROOT` maps to `storage_root`; `__` separates nested keys.
fn share_environment() -> Environment {
    Environment::with_prefix("RAX_SHARE")
        .prefix_separator("_")
        .separator("__")
}

impl ShareConfig {
    /// Load configuration from config.toml with environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(share_environment())
    }

    fn load_with(environment: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().set_default("storage_root", DEFAULT_STORAGE_ROOT)?;

        for config_path in CONFIG_PATHS {
            builder = builder.add_source(File::with_name(config_path).required(false));
        }

        let settings = builder.add_source(environment).build()?;

        Self::from_settings(settings)
    }

    /// Load configuration from a single file, without environment overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("storage_root", DEFAULT_STORAGE_ROOT)?
            .add_source(File::from(path.as_ref()))
            .build()?;

        Self::from_settings(settings)
    }

    fn from_settings(settings: Config) -> Result<Self, ConfigError> {
        let config: ShareConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_root.trim().is_empty() {
            return Err(ConfigError::Message("storage_root cannot be empty".into()));
        }

        Ok(())
    }

    /// Get storage root as PathBuf
    pub fn storage_root_path(&self) -> PathBuf {
        PathBuf::from(&self.storage_root)
    }

    /// Get the archive staging directory
    pub fn staging_dir_path(&self) -> PathBuf {
        self.staging_dir
            .as_deref()
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir)
    }
}
