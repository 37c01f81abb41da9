#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for upkeep
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/upkeep/config.toml)
//! - Environment variables
//! - CLI flags

mod repository;

pub use repository::{ChannelConfig, RepositoryConfig};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use upkeep_errors::{ConfigError, Error};
use upkeep_types::{ColorChoice, OutputFormat};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub packages: PackageConfig,

    #[serde(default)]
    pub repositories: RepositoryConfig,

    #[serde(default)]
    pub refresh: RefreshConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_output_format")]
    pub default_output: OutputFormat,
    #[serde(default = "default_color_choice")]
    pub color: ColorChoice,
    /// Hints sent to the backend whenever it becomes available
    #[serde(default = "default_hints")]
    pub hints: Vec<String>,
    /// Distribution codename used to render channel sources
    #[serde(default)]
    pub distro_codename: Option<String>,
}

/// Which packages belong to the managed product family
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PackageConfig {
    /// Substring a package name must contain to be tracked (empty = all)
    #[serde(default)]
    pub filter: String,
}

impl PackageConfig {
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        name.contains(&self.filter)
    }
}

/// Periodic cache refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_refresh_enabled")]
    pub enabled: bool,
    #[serde(default = "default_refresh_interval")]
    pub interval_secs: u64,
}

impl RefreshConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

// Default implementations

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: OutputFormat::Tty,
            color: ColorChoice::Auto,
            hints: default_hints(),
            distro_codename: None,
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_refresh_interval(),
        }
    }
}

// Default value functions for serde
fn default_output_format() -> OutputFormat {
    OutputFormat::Tty
}

fn default_color_choice() -> ColorChoice {
    ColorChoice::Auto
}

fn default_hints() -> Vec<String> {
    vec!["interactive=false".to_string()]
}

fn default_refresh_enabled() -> bool {
    true
}

fn default_refresh_interval() -> u64 {
    6 * 60 * 60 // 6 hours
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
        Ok(config_dir.join("upkeep").join("config.toml"))
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

        Self::from_toml(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid TOML or does not match
    /// the configuration schema.
    pub fn from_toml(contents: &str) -> Result<Self, Error> {
        toml::from_str(contents)
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
            Self::load_from_file(&config_path).await
        } else {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
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

    /// Save configuration to a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized
    /// or if the file cannot be written.
    pub async fn save_to(&self, path: &Path) -> Result<(), Error> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ConfigError::WriteError {
                    path: parent.display().to_string(),
                    error: e.to_string(),
                })?;
        }

        let toml_string =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
                error: e.to_string(),
            })?;

        fs::write(path, toml_string)
            .await
            .map_err(|e| ConfigError::WriteError {
                path: path.display().to_string(),
                error: e.to_string(),
            })?;

        Ok(())
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // UPKEEP_PACKAGE_FILTER
        if let Ok(filter) = std::env::var("UPKEEP_PACKAGE_FILTER") {
            self.packages.filter = filter;
        }

        // UPKEEP_REFRESH_INTERVAL
        if let Ok(interval) = std::env::var("UPKEEP_REFRESH_INTERVAL") {
            self.refresh.interval_secs =
                interval.parse().map_err(|_| ConfigError::InvalidValue {
                    field: "UPKEEP_REFRESH_INTERVAL".to_string(),
                    value: interval,
                })?;
        }

        // UPKEEP_CODENAME
        if let Ok(codename) = std::env::var("UPKEEP_CODENAME") {
            if codename.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "UPKEEP_CODENAME".to_string(),
                    value: codename,
                }
                .into());
            }
            self.general.distro_codename = Some(codename);
        }

        Ok(())
    }

    /// Check cross-field constraints serde cannot express
    ///
    /// # Errors
    ///
    /// Returns an error for a zero refresh interval or duplicate channel roles.
    pub fn validate(&self) -> Result<(), Error> {
        if self.refresh.interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "refresh.interval_secs".to_string(),
                value: "0".to_string(),
            }
            .into());
        }

        let mut roles = HashSet::new();
        for channel in &self.repositories.channels {
            if !roles.insert(channel.role.as_str()) {
                return Err(ConfigError::Invalid {
                    message: format!("duplicate channel role '{}'", channel.role),
                }
                .into());
            }
        }

        Ok(())
    }
}
