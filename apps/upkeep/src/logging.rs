//! Structured logging integration for events
//!
//! Every event the controller emits is mirrored into tracing with the event
//! metadata as structured fields, so a `--debug` log file carries the same
//! history a consumer saw.

use tracing::{debug, error, info, trace, warn};
use upkeep_events::{
    AppEvent, ControllerEvent, EventMessage, GeneralEvent, PackageEvent, RepoEvent,
    TransactionEvent,
};

/// Log an `AppEvent` using the tracing infrastructure with structured fields
pub fn log_event_with_tracing(message: &EventMessage) {
    let event = &message.event;
    let meta = &message.meta;

    match event {
        AppEvent::Package(package_event) => match package_event {
            PackageEvent::Added { package } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    package = %package.name,
                    installed = %package.installed_version,
                    candidate = %package.candidate_version,
                    "Package added"
                );
            }
            PackageEvent::Changed { package } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    package = %package.name,
                    installed = %package.installed_version,
                    candidate = %package.candidate_version,
                    update_available = package.update_available,
                    "Package changed"
                );
            }
            PackageEvent::Removed { name } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    package = %name,
                    "Package removed"
                );
            }
        },

        AppEvent::Repo(repo_event) => match repo_event {
            RepoEvent::Added { repository } | RepoEvent::Changed { repository } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    repo = %repository.id,
                    enabled = repository.enabled,
                    is_virtual = repository.is_virtual,
                    "Repository updated"
                );
            }
            RepoEvent::Removed { id } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    repo = %id,
                    "Repository removed"
                );
            }
        },

        AppEvent::Controller(ControllerEvent::AvailabilityChanged { available }) => {
            if *available {
                info!(source = meta.source.as_str(), event_id = %meta.event_id, "Backend available");
            } else {
                warn!(source = meta.source.as_str(), event_id = %meta.event_id, "Backend unavailable");
            }
        }

        AppEvent::Transaction(TransactionEvent::Failed {
            transaction,
            request,
            kind,
            failure,
        }) => {
            if failure.retryable {
                warn!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    transaction = %transaction,
                    request = %request,
                    kind = %kind,
                    retryable = failure.retryable,
                    code = ?failure.code,
                    message = %failure.message,
                    "Transaction failed"
                );
            } else {
                error!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    transaction = %transaction,
                    request = %request,
                    kind = %kind,
                    retryable = failure.retryable,
                    code = ?failure.code,
                    message = %failure.message,
                    "Transaction failed"
                );
            }
        }

        AppEvent::Transaction(TransactionEvent::Completed {
            transaction,
            request,
            success,
        }) => {
            info!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                transaction = %transaction,
                request = %request,
                success = success,
                "Transaction completed"
            );
        }

        AppEvent::General(GeneralEvent::Warning { message, context }) => {
            warn!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                message = %message,
                context = ?context,
                "Warning"
            );
        }

        AppEvent::General(GeneralEvent::Error { message, details }) => {
            error!(
                source = meta.source.as_str(),
                event_id = %meta.event_id,
                message = %message,
                details = ?details,
                "Error"
            );
        }

        // Fallback for the remaining events
        _ => match meta.tracing_level() {
            tracing::Level::ERROR => {
                error!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "Application event");
            }
            tracing::Level::WARN => {
                warn!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "Application event");
            }
            tracing::Level::INFO => {
                info!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "Application event");
            }
            tracing::Level::DEBUG => {
                debug!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "Application event");
            }
            _ => {
                trace!(source = meta.source.as_str(), event_id = %meta.event_id, correlation = ?meta.correlation_id, event = ?event, "Application event");
            }
        },
    }
}
