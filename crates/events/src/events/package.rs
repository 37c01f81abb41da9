use serde::{Deserialize, Serialize};
use upkeep_types::Package;

/// Package snapshot deltas
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PackageEvent {
    /// A package name was observed for the first time
    Added { package: Package },

    /// A known package's record changed
    Changed { package: Package },

    /// A package is no longer reported by the backend
    Removed { name: String },
}

impl PackageEvent {
    /// Name of the package this event refers to
    #[must_use]
    pub fn package_name(&self) -> &str {
        match self {
            Self::Added { package } | Self::Changed { package } => &package.name,
            Self::Removed { name } => name,
        }
    }
}
