//! Reconciliation and orchestration error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum EngineError {
    #[error("transaction {transaction} is already tracked")]
    AlreadyTracked { transaction: uuid::Uuid },

    #[error("repository not found: {id}")]
    UnknownRepository { id: String },

    #[error("unknown channel role: {role}")]
    UnknownChannelRole { role: String },

    #[error("channel {role} has no source template")]
    MissingSourceTemplate { role: String },

    #[error("distribution codename is unknown")]
    UnknownDistribution,

    #[error("controller service stopped")]
    ServiceStopped,
}

impl UserFacingError for EngineError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::UnknownDistribution => {
                Some("Set general.distro_codename in the configuration or UPKEEP_CODENAME.")
            }
            Self::MissingSourceTemplate { .. } => {
                Some("Add a `source` line to the channel in the configuration file.")
            }
            Self::UnknownRepository { .. } => Some("List repositories to see the known ids."),
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::AlreadyTracked { .. } => "engine.already_tracked",
            Self::UnknownRepository { .. } => "engine.unknown_repository",
            Self::UnknownChannelRole { .. } => "engine.unknown_channel_role",
            Self::MissingSourceTemplate { .. } => "engine.missing_source_template",
            Self::UnknownDistribution => "engine.unknown_distribution",
            Self::ServiceStopped => "engine.service_stopped",
        };
        Some(code)
    }
}
