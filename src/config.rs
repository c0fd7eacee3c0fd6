//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/ipam/ipam.toml`
//! 3. Explicit config file (`--config FILE` / `IPAM_CONFIG`)
//! 4. Environment variables: `IPAM_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;
use crate::domain::DEFAULT_AVAILABLE_LIMIT;

/// Raw settings for intermediate parsing (`None` means "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub store_dir: Option<PathBuf>,
    pub schema_key: Option<String>,
    pub domain_prefix: Option<String>,
    pub available_limit: Option<usize>,
}

/// Unified configuration for ipam.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Directory of the file-backed store
    pub store_dir: PathBuf,
    /// Store key of the schema registry record
    pub schema_key: String,
    /// Store key prefix of domain documents
    pub domain_prefix: String,
    /// Default number of blocks listed by `node available --prefix`
    pub available_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            schema_key: "ipam:schema".into(),
            domain_prefix: "ipam:domain:".into(),
            available_limit: DEFAULT_AVAILABLE_LIMIT,
        }
    }
}

/// Get the default store directory (`$XDG_DATA_HOME/ipam/store`).
fn default_store_dir() -> PathBuf {
    ProjectDirs::from("", "", "ipam")
        .map(|dirs| dirs.data_dir().join("store"))
        .unwrap_or_else(|| PathBuf::from("~/.ipam/store"))
}

/// Get the XDG config directory for ipam.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "ipam").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("ipam.toml"))
}

/// Expand `~`, `$VAR` and `${VAR}`, leaving the input as is on failure.
fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        let expanded = expand_env_vars(self.store_dir.to_string_lossy().as_ref());
        self.store_dir = PathBuf::from(expanded);
    }

    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            store_dir: overlay
                .store_dir
                .clone()
                .unwrap_or_else(|| self.store_dir.clone()),
            schema_key: overlay
                .schema_key
                .clone()
                .unwrap_or_else(|| self.schema_key.clone()),
            domain_prefix: overlay
                .domain_prefix
                .clone()
                .unwrap_or_else(|| self.domain_prefix.clone()),
            available_limit: overlay.available_limit.unwrap_or(self.available_limit),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `config_file` - Optional explicit config file; it must exist
    pub fn load(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!("Loading global config {}", global_path.display());
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(path) = config_file {
            debug!("Loading config {}", path.display());
            current = current.merge_with(&load_raw_settings(path)?);
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();
        current.check()?;

        Ok(current)
    }

    /// Apply IPAM_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("IPAM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("store_dir") {
            settings.store_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("schema_key") {
            settings.schema_key = val;
        }
        if let Ok(val) = config.get_string("domain_prefix") {
            settings.domain_prefix = val;
        }
        match config.get::<usize>("available_limit") {
            Ok(val) => settings.available_limit = val,
            Err(ConfigError::NotFound(_)) => {}
            Err(e) => return Err(config_err(e)),
        }

        Ok(settings)
    }

    /// Domain keys must not be able to shadow the schema record.
    fn check(&self) -> Result<(), ApplicationError> {
        if self.schema_key.is_empty() {
            return Err(ApplicationError::Config {
                message: "schema_key must not be empty".into(),
            });
        }
        if self.schema_key.starts_with(&self.domain_prefix) {
            return Err(ApplicationError::Config {
                message: format!(
                    "schema_key '{}' lies inside domain_prefix '{}'",
                    self.schema_key, self.domain_prefix
                ),
            });
        }
        Ok(())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# ipam configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/ipam/ipam.toml
#   File:   --config FILE or IPAM_CONFIG
#   Env:    IPAM_* environment variables (e.g. IPAM_STORE_DIR)

# Directory of the file-backed key-value store
# store_dir = "~/.local/share/ipam/store"

# Store key holding the schema registry
# schema_key = "ipam:schema"

# Store key prefix for domain documents
# domain_prefix = "ipam:domain:"

# Blocks listed by `ipam node available --prefix P` unless --limit is given
# available_limit = 10
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
