//! Repository type definitions

use serde::{Deserialize, Serialize};

/// Snapshot record for one repository, keyed by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: String,
    pub description: String,
    pub enabled: bool,
    /// Synthesized locally as a stand-in for a channel the backend has not
    /// reported yet.
    #[serde(rename = "virtual")]
    pub is_virtual: bool,
}

impl Repository {
    #[must_use]
    pub fn new(id: impl Into<String>, description: impl Into<String>, enabled: bool) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            enabled,
            is_virtual: false,
        }
    }

    /// Disabled placeholder for a channel that is not configured on the host.
    #[must_use]
    pub fn placeholder(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            enabled: false,
            is_virtual: true,
        }
    }
}

/// Scope of a repository listing request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoFilter {
    All,
}
