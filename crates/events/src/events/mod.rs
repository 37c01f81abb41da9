use serde::{Deserialize, Serialize};

use crate::EventSource;
use upkeep_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    /// Optional stable error code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Construct a new failure context.
    #[must_use]
    pub fn new(
        code: Option<impl Into<String>>,
        message: impl Into<String>,
        hint: Option<impl Into<String>>,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.map(Into::into),
            message: message.into(),
            hint: hint.map(Into::into),
            retryable,
        }
    }

    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self::new(
            error.user_code(),
            error.user_message().into_owned(),
            error.user_hint(),
            error.is_retryable(),
        )
    }
}

pub mod controller;
pub mod general;
pub mod package;
pub mod repo;
pub mod transaction;

pub use controller::*;
pub use general::*;
pub use package::*;
pub use repo::*;
pub use transaction::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// General utility events (warnings and errors)
    General(GeneralEvent),

    /// Package snapshot deltas
    Package(PackageEvent),

    /// Repository snapshot deltas
    Repo(RepoEvent),

    /// Controller-level state (availability, pool levels)
    Controller(ControllerEvent),

    /// Backend transaction outcomes
    Transaction(TransactionEvent),
}

impl AppEvent {
    /// Identify the source domain for this event (used for metadata/logging).
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::General(_) => EventSource::GENERAL,
            Self::Package(_) => EventSource::PACKAGE,
            Self::Repo(_) => EventSource::REPO,
            Self::Controller(_) => EventSource::CONTROLLER,
            Self::Transaction(_) => EventSource::TRANSACTION,
        }
    }

    /// Transaction id shared by every event of one backend transaction
    #[must_use]
    pub fn correlation_id(&self) -> Option<String> {
        match self {
            Self::Transaction(
                TransactionEvent::ActionSubmitted { transaction, .. }
                | TransactionEvent::ItemProgress { transaction, .. }
                | TransactionEvent::Failed { transaction, .. }
                | TransactionEvent::Completed { transaction, .. },
            ) => Some(transaction.to_string()),
            _ => None,
        }
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            Self::General(GeneralEvent::Error { .. })
            | Self::Transaction(TransactionEvent::Failed { .. }) => Level::ERROR,

            Self::General(GeneralEvent::Warning { .. })
            | Self::Controller(ControllerEvent::AvailabilityChanged { available: false }) => {
                Level::WARN
            }

            Self::Controller(ControllerEvent::PoolChanged { .. })
            | Self::Transaction(TransactionEvent::ItemProgress { .. }) => Level::DEBUG,

            _ => Level::INFO,
        }
    }

    /// Get the log target for this event (for structured logging)
    #[must_use]
    pub fn log_target(&self) -> &'static str {
        match self {
            Self::General(_) => "upkeep::events::general",
            Self::Package(_) => "upkeep::events::package",
            Self::Repo(_) => "upkeep::events::repo",
            Self::Controller(_) => "upkeep::events::controller",
            Self::Transaction(_) => "upkeep::events::transaction",
        }
    }
}
