#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for async communication in upkeep
//!
//! Every observable change of the engine (snapshot deltas, pool level
//! changes, backend availability, transaction failures) is an [`AppEvent`].
//! Events travel as [`EventMessage`]s so consumers get metadata alongside
//! the payload and can route them to tracing.
//!
//! ## Architecture
//!
//! - **Domain-driven events**: Events grouped by functional domain (Package, Repo, ...)
//! - **Unified `EventEmitter` trait**: Single, consistent API for all event emissions
//! - **Tracing integration**: Each event knows its log level and target

pub mod meta;
pub use meta::{EventLevel, EventMeta, EventSource};

pub mod events;
pub use events::{
    AppEvent, ControllerEvent, FailureContext, GeneralEvent, PackageEvent, RepoEvent,
    TransactionEvent,
};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

/// An event together with the metadata captured at emission time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub meta: EventMeta,
    pub event: AppEvent,
}

impl EventMessage {
    /// Wrap an event, deriving level and source from the event itself
    #[must_use]
    pub fn from_event(event: AppEvent) -> Self {
        let mut meta = EventMeta::new(event.log_level(), event.event_source());
        if let Some(correlation_id) = event.correlation_id() {
            meta = meta.with_correlation_id(correlation_id);
        }
        Self { meta, event }
    }
}

/// Type alias for event sender
pub type EventSender = UnboundedSender<EventMessage>;

/// Type alias for event receiver
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<EventMessage>;

/// Create a new event channel
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events throughout upkeep
///
/// This trait provides a single, consistent API for emitting events regardless of
/// whether you have a raw `EventSender` or a struct that contains one.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            // Ignore send errors - if receiver is dropped, we just continue
            let _ = sender.send(EventMessage::from_event(event));
        }
    }

    /// Emit a warning event with context
    fn emit_warning_with_context(&self, message: impl Into<String>, context: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning_with_context(
            message, context,
        )));
    }

    /// Emit an error event
    fn emit_error(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::error(message)));
    }

    /// Emit a package added event
    fn emit_package_added(&self, package: upkeep_types::Package) {
        self.emit(AppEvent::Package(PackageEvent::Added { package }));
    }

    /// Emit a package changed event
    fn emit_package_changed(&self, package: upkeep_types::Package) {
        self.emit(AppEvent::Package(PackageEvent::Changed { package }));
    }

    /// Emit a package removed event
    fn emit_package_removed(&self, name: impl Into<String>) {
        self.emit(AppEvent::Package(PackageEvent::Removed { name: name.into() }));
    }

    /// Emit a repository added event
    fn emit_repository_added(&self, repository: upkeep_types::Repository) {
        self.emit(AppEvent::Repo(RepoEvent::Added { repository }));
    }

    /// Emit a repository changed event
    fn emit_repository_changed(&self, repository: upkeep_types::Repository) {
        self.emit(AppEvent::Repo(RepoEvent::Changed { repository }));
    }

    /// Emit a repository removed event
    fn emit_repository_removed(&self, id: impl Into<String>) {
        self.emit(AppEvent::Repo(RepoEvent::Removed { id: id.into() }));
    }
}

/// Implementation of `EventEmitter` for the raw `EventSender`
/// This allows `EventSender` to be used directly where `EventEmitter` is expected
impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}
