use serde::{Deserialize, Serialize};
use upkeep_types::Repository;

/// Repository snapshot deltas
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RepoEvent {
    /// Repository discovered or synthesized
    Added { repository: Repository },

    /// Repository enabled state changed
    Changed { repository: Repository },

    /// Repository dropped (virtual placeholders when the real channel shows up)
    Removed { id: String },
}

impl RepoEvent {
    /// Id of the repository this event refers to
    #[must_use]
    pub fn repository_id(&self) -> &str {
        match self {
            Self::Added { repository } | Self::Changed { repository } => &repository.id,
            Self::Removed { id } => id,
        }
    }
}
