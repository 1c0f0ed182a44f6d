#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for imgkit
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/imgkit/config.toml)
//! - Environment variables
//! - CLI flags (applied by the binary)

use imgkit_errors::{ConfigError, Error};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub paths: PathConfig,

    #[serde(default)]
    pub process: ProcessConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PathConfig {
    /// Root of the tree whose os-release is inspected
    pub root: Option<PathBuf>,
    /// Lock file taken around `imgkit run`
    pub lock_file: Option<PathBuf>,
}

/// Defaults for commands run under scoped process state
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProcessConfig {
    /// File-creation mask for `imgkit run`; `None` keeps the caller's mask
    #[serde(default)]
    pub umask: Option<u32>,
    /// Extra environment variables for `imgkit run`
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// Default value functions for serde
fn default_log_level() -> String {
    "warn".to_string()
}

/// Parse an octal mode such as `022` or `0o077`
///
/// # Errors
///
/// Returns an error if `value` is not octal or exceeds `0o777`.
pub fn parse_umask(field: &str, value: &str) -> Result<u32, ConfigError> {
    let digits = value.trim_start_matches("0o");
    u32::from_str_radix(digits, 8)
        .ok()
        .filter(|mask| *mask <= 0o777)
        .ok_or_else(|| ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        })
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("imgkit").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            tracing::debug!("loading config from {}", config_path.display());
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // IMGKIT_LOG_LEVEL
        if let Ok(level) = std::env::var("IMGKIT_LOG_LEVEL") {
            self.general.log_level = match level.as_str() {
                "off" | "error" | "warn" | "info" | "debug" | "trace" => level,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "IMGKIT_LOG_LEVEL".to_string(),
                        value: level,
                    }
                    .into())
                }
            };
        }

        // IMGKIT_ROOT
        if let Some(root) = std::env::var_os("IMGKIT_ROOT").filter(|r| !r.is_empty()) {
            self.paths.root = Some(PathBuf::from(root));
        }

        // IMGKIT_LOCK_FILE
        if let Some(lock) = std::env::var_os("IMGKIT_LOCK_FILE").filter(|l| !l.is_empty()) {
            self.paths.lock_file = Some(PathBuf::from(lock));
        }

        // IMGKIT_UMASK
        if let Ok(mask) = std::env::var("IMGKIT_UMASK") {
            self.process.umask = Some(parse_umask("IMGKIT_UMASK", &mask)?);
        }

        Ok(())
    }

    /// Get the root path (with default)
    #[must_use]
    pub fn root_path(&self) -> PathBuf {
        self.paths
            .root
            .clone()
            .unwrap_or_else(|| PathBuf::from("/"))
    }
}
