//! Hierarchical configuration loader with precedence
//!
//! Loads restart configuration from multiple sources with the following
//! precedence (low to high):
//! 1. Built-in defaults
//! 2. Global config (~/.crashloop/crashloop.yaml)
//! 3. Explicit config file (passed by the caller)
//! 4. Environment variables (CRASHLOOP_* prefix)
//! 5. CLI flags (handled by caller)
//!
//! File layers merge field by field: a layer only overrides the keys it
//! actually sets, so an explicit file that lists `operations` alone keeps the
//! global file's `default` policy.

use crate::error::{Error, Result};
use crate::types::{RestartConfig, RetryPolicy};
use camino::{Utf8Path, Utf8PathBuf};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::time::Duration;

/// File name looked up inside the config directory
pub const CONFIG_FILE_NAME: &str = "crashloop.yaml";

/// Environment variable overriding the default policy's delay
pub const ENV_DELAY_MS: &str = "CRASHLOOP_DELAY_MS";

/// Environment variable overriding the default policy's attempt count
pub const ENV_MAX_ATTEMPTS: &str = "CRASHLOOP_MAX_ATTEMPTS";

/// One config file as written, before it is merged into the hierarchy
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ConfigLayer {
    #[serde(default)]
    default: Option<PolicyLayer>,

    #[serde(default)]
    operations: HashMap<String, RetryPolicy>,
}

/// Default-policy fields a file layer may override
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct PolicyLayer {
    delay_ms: Option<u64>,
    max_attempts: Option<i64>,
}

impl ConfigLayer {
    /// Overlay the keys this layer sets onto `config`
    fn apply(self, mut config: RestartConfig) -> RestartConfig {
        if let Some(default) = self.default {
            if let Some(delay_ms) = default.delay_ms {
                config.default = config.default.with_delay(Duration::from_millis(delay_ms));
            }
            if let Some(max_attempts) = default.max_attempts {
                config.default = config.default.with_max_attempts(max_attempts);
            }
        }
        config.operations.extend(self.operations);
        config
    }
}

/// Configuration hierarchy loader
pub struct ConfigLoader {
    /// Base directory for configuration files
    config_dir: Utf8PathBuf,
}

impl ConfigLoader {
    /// Create a loader rooted at the standard config directory (~/.crashloop)
    pub fn new() -> Result<Self> {
        let config_dir = Self::default_config_dir()?;
        Ok(Self { config_dir })
    }

    /// Create a loader with a custom config directory
    pub fn with_dir(config_dir: Utf8PathBuf) -> Self {
        Self { config_dir }
    }

    fn default_config_dir() -> Result<Utf8PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::invalid_config("Could not determine home directory"))?;
        let home = Utf8PathBuf::from_path_buf(home)
            .map_err(|_| Error::invalid_config("Home directory is not valid UTF-8"))?;
        Ok(home.join(".crashloop"))
    }

    /// Load configuration without an explicit file
    pub fn load(&self) -> Result<RestartConfig> {
        self.load_with_file(None)
    }

    /// Load configuration, layering an explicit file over the global one
    ///
    /// A missing global file is skipped silently; a missing explicit file is
    /// an error.
    pub fn load_with_file(&self, explicit: Option<&Utf8Path>) -> Result<RestartConfig> {
        let mut config = RestartConfig::default();

        let global_path = self.config_dir.join(CONFIG_FILE_NAME);
        if global_path.exists() {
            let layer = self.load_yaml_file::<ConfigLayer>(&global_path)?;
            config = layer.apply(config);
        }

        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Error::config_not_found(path.as_str()));
            }
            let layer = self.load_yaml_file::<ConfigLayer>(path)?;
            config = layer.apply(config);
        }

        let config = self.apply_env_overrides(config)?;

        tracing::debug!(
            config_dir = %self.config_dir,
            operations = config.operations.len(),
            "loaded restart configuration"
        );

        Ok(config)
    }

    fn load_yaml_file<T: DeserializeOwned>(&self, path: &Utf8Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        let config: T =
            serde_yaml_ng::from_str(&content).map_err(|e| Error::yaml_parse(path.as_str(), e))?;
        Ok(config)
    }

    /// Apply environment variable overrides to the default policy
    fn apply_env_overrides(&self, mut config: RestartConfig) -> Result<RestartConfig> {
        if let Ok(val) = env::var(ENV_DELAY_MS) {
            let delay_ms: u64 = val.trim().parse().map_err(|_| {
                Error::invalid_config(format!("{} must be a valid number", ENV_DELAY_MS))
            })?;
            config.default = config.default.with_delay(Duration::from_millis(delay_ms));
        }

        if let Ok(val) = env::var(ENV_MAX_ATTEMPTS) {
            let max_attempts: i64 = val.trim().parse().map_err(|_| {
                Error::invalid_config(format!("{} must be a valid integer", ENV_MAX_ATTEMPTS))
            })?;
            config.default = config.default.with_max_attempts(max_attempts);
        }

        Ok(config)
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}
