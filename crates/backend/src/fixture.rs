//! TOML description of a simulated host
//!
//! ```toml
//! arch = "amd64"
//!
//! [[packages]]
//! name = "acme-daemon"
//! installed = "1.0"
//! available = "1.1"
//!
//! [[repositories]]
//! id = "http://repo.example.org/ stable/main"
//! enabled = true
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use upkeep_errors::{BackendError, Error};

/// Initial state of a [`MemoryBackend`](crate::MemoryBackend)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostFixture {
    #[serde(default = "default_running")]
    pub running: bool,
    #[serde(default = "default_arch")]
    pub arch: String,
    #[serde(default)]
    pub packages: Vec<FixturePackage>,
    #[serde(default)]
    pub repositories: Vec<FixtureRepository>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixturePackage {
    pub name: String,
    /// Installed version, absent when not installed
    #[serde(default)]
    pub installed: Option<String>,
    /// Newest version offered by the repositories; defaults to `installed`
    #[serde(default)]
    pub available: Option<String>,
    #[serde(default)]
    pub summary: String,
    /// Repository tag carried in the data field of package ids
    #[serde(default = "default_origin")]
    pub origin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureRepository {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_running() -> bool {
    true
}

fn default_arch() -> String {
    "amd64".to_string()
}

fn default_origin() -> String {
    "main".to_string()
}

fn default_enabled() -> bool {
    true
}

impl Default for HostFixture {
    fn default() -> Self {
        Self {
            running: default_running(),
            arch: default_arch(),
            packages: Vec::new(),
            repositories: Vec::new(),
        }
    }
}

impl HostFixture {
    /// Parse a fixture from TOML
    ///
    /// # Errors
    ///
    /// Returns `BackendError::InvalidFixture` if the TOML is malformed or the
    /// fixture is inconsistent.
    pub fn from_toml(contents: &str) -> Result<Self, Error> {
        let fixture: Self = toml::from_str(contents).map_err(|e| BackendError::InvalidFixture {
            message: e.to_string(),
        })?;
        fixture.validate()?;
        Ok(fixture)
    }

    /// Load a fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self, Error> {
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            BackendError::InvalidFixture {
                message: format!("{}: {e}", path.display()),
            }
        })?;
        Self::from_toml(&contents)
    }

    fn validate(&self) -> Result<(), Error> {
        let mut names = HashSet::new();
        for package in &self.packages {
            if package.name.trim().is_empty() || package.name.contains(';') {
                return Err(BackendError::InvalidFixture {
                    message: format!("invalid package name '{}'", package.name),
                }
                .into());
            }
            if package.installed.is_none() && package.available.is_none() {
                return Err(BackendError::InvalidFixture {
                    message: format!("package {} has no version", package.name),
                }
                .into());
            }
            if !names.insert(package.name.as_str()) {
                return Err(BackendError::InvalidFixture {
                    message: format!("package {} listed twice", package.name),
                }
                .into());
            }
        }

        let mut ids = HashSet::new();
        for repository in &self.repositories {
            if !ids.insert(repository.id.as_str()) {
                return Err(BackendError::InvalidFixture {
                    message: format!("repository {} listed twice", repository.id),
                }
                .into());
            }
        }
        Ok(())
    }
}
