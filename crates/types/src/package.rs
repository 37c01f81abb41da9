//! Package-related type definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use upkeep_errors::BackendError;

/// Snapshot record for one package, keyed by name.
///
/// The backend reports packages per version; the snapshot deliberately
/// collapses those into a single record per name so that a version bump
/// updates the record instead of duplicating it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub display_name: String,
    /// Empty when the package is not installed.
    pub installed_version: String,
    /// Empty when no newer version is known.
    pub candidate_version: String,
    pub update_available: bool,
    pub can_remove: bool,
    pub summary: String,
}

impl Package {
    /// Create an empty record for `name`
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            installed_version: String::new(),
            candidate_version: String::new(),
            update_available: false,
            can_remove: false,
            summary: String::new(),
        }
    }

    #[must_use]
    pub fn is_installed(&self) -> bool {
        !self.installed_version.is_empty()
    }

    /// Mark the package as installed at `version`.
    pub fn set_installed(&mut self, version: impl Into<String>) {
        self.installed_version = version.into();
        self.can_remove = !self.installed_version.is_empty();
    }

    /// Mark the package as no longer installed.
    pub fn clear_installed(&mut self) {
        self.installed_version.clear();
        self.can_remove = false;
    }
}

/// Backend package identifier: `name;version;arch;data`.
///
/// Unlike [`Package`], a `PackageId` names one concrete version and is what
/// the backend needs for actions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageId {
    name: String,
    version: String,
    arch: String,
    data: String,
}

impl PackageId {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        arch: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            arch: arch.into(),
            data: data.into(),
        }
    }

    /// Parse a backend identifier.
    ///
    /// Trailing fields may be missing; the name may not be empty.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::InvalidPackageId` when the name part is empty.
    pub fn parse(s: &str) -> Result<Self, BackendError> {
        let mut parts = s.splitn(4, ';');
        let name = parts.next().unwrap_or_default().trim();
        if name.is_empty() {
            return Err(BackendError::InvalidPackageId { id: s.to_string() });
        }
        Ok(Self {
            name: name.to_string(),
            version: parts.next().unwrap_or_default().to_string(),
            arch: parts.next().unwrap_or_default().to_string(),
            data: parts.next().unwrap_or_default().to_string(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn arch(&self) -> &str {
        &self.arch
    }

    #[must_use]
    pub fn data(&self) -> &str {
        &self.data
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{};{};{}", self.name, self.version, self.arch, self.data)
    }
}

impl FromStr for PackageId {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PackageId {
    type Error = BackendError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PackageId> for String {
    fn from(id: PackageId) -> Self {
        id.to_string()
    }
}

/// Status attached to a package item reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageInfo {
    /// Currently installed on the host
    Installed,
    /// Known to a repository but not installed
    Available,
    /// A newer version is available
    Normal,
    Downloading,
    Installing,
    Updating,
    Removing,
    /// Terminal per-item status reported while an action runs
    Finished,
    Unknown,
}

impl PackageInfo {
    #[must_use]
    pub fn is_installed(self) -> bool {
        matches!(self, Self::Installed)
    }

    #[must_use]
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl fmt::Display for PackageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Installed => "installed",
            Self::Available => "available",
            Self::Normal => "normal",
            Self::Downloading => "downloading",
            Self::Installing => "installing",
            Self::Updating => "updating",
            Self::Removing => "removing",
            Self::Finished => "finished",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Scope of a package listing request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageFilter {
    /// Every known package, installed or not
    All,
    /// Only installed packages
    Installed,
    /// Packages for the native architecture, newest version only
    Arch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_id_parse_full() {
        let id = PackageId::parse("nano;7.2-1;amd64;installed:debian-main").unwrap();
        assert_eq!(id.name(), "nano");
        assert_eq!(id.version(), "7.2-1");
        assert_eq!(id.arch(), "amd64");
        assert_eq!(id.data(), "installed:debian-main");
        assert_eq!(id.to_string(), "nano;7.2-1;amd64;installed:debian-main");
    }

    #[test]
    fn test_package_id_parse_partial() {
        let id = PackageId::parse("A;1.1").unwrap();
        assert_eq!(id.name(), "A");
        assert_eq!(id.version(), "1.1");
        assert_eq!(id.arch(), "");
        assert_eq!(id.to_string(), "A;1.1;;");
    }

    #[test]
    fn test_package_id_rejects_empty_name() {
        assert!(matches!(
            PackageId::parse(";1.0;amd64;"),
            Err(BackendError::InvalidPackageId { .. })
        ));
        assert!(PackageId::parse("").is_err());
    }

    #[test]
    fn test_package_install_state_keeps_invariant() {
        let mut pkg = Package::new("A");
        assert!(!pkg.is_installed());
        assert!(!pkg.can_remove);

        pkg.set_installed("1.0");
        assert!(pkg.is_installed());
        assert!(pkg.can_remove);

        pkg.clear_installed();
        assert!(!pkg.is_installed());
        assert!(!pkg.can_remove);
    }

    #[test]
    fn test_package_display_name_defaults_to_name() {
        let pkg = Package::new("libfoo");
        assert_eq!(pkg.display_name, "libfoo");
    }
}
