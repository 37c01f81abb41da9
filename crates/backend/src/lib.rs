#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Boundary between the engine and the package-management service
//!
//! The service is an opaque asynchronous peer: every request returns a
//! [`TransactionId`] immediately and its results stream back later as
//! [`BackendEvent`]s on an unbounded channel, ending with a terminal
//! [`TransactionSignal::Finished`]. Nothing here blocks.
//!
//! [`MemoryBackend`] is a deterministic in-process implementation used by
//! the CLI (driven from a [`HostFixture`]) and by tests.

pub mod fixture;
pub mod memory;

pub use fixture::{FixturePackage, FixtureRepository, HostFixture};
pub use memory::MemoryBackend;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use upkeep_errors::Result;
use upkeep_types::{
    Action, ExitStatus, PackageFilter, PackageInfo, RepoFilter, TransactionErrorKind,
    TransactionId,
};

/// Requests the engine issues against the package-management service.
///
/// Implementations must return quickly; results are delivered through the
/// event channel handed out when the backend was created.
pub trait Backend: Send + Sync {
    /// Whether the service is currently reachable
    fn is_running(&self) -> bool;

    /// Send session hints (e.g. `interactive=false`)
    ///
    /// # Errors
    ///
    /// Returns an error if the service rejects the hints or is unreachable.
    fn set_hints(&self, hints: &[String]) -> Result<()>;

    /// List packages in the given scope
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be submitted.
    fn get_packages(&self, filter: PackageFilter) -> Result<TransactionId>;

    /// List packages with a newer version available
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be submitted.
    fn get_updates(&self) -> Result<TransactionId>;

    /// List configured repositories
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be submitted.
    fn get_repo_list(&self, filter: RepoFilter) -> Result<TransactionId>;

    /// Submit a mutating action
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be submitted.
    fn submit(&self, action: Action) -> Result<TransactionId>;
}

/// Source line for a channel that should be added to the host for real
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSource {
    pub role: String,
    /// File the line belongs in, relative to the host's sources directory
    pub file_name: String,
    pub line: String,
}

/// Writes repository-source configuration on the host
pub trait ChannelWriter: Send + Sync {
    /// Make `source` part of the host's repository configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the source could not be written.
    fn add_channel(&self, source: &ChannelSource) -> Result<()>;
}

/// Notification from the package-management service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    /// Service-wide notification
    Daemon(DaemonEvent),
    /// Progress of one transaction
    Transaction {
        id: TransactionId,
        signal: TransactionSignal,
    },
}

/// Service-wide notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonEvent {
    /// Service became reachable or went away
    RunningChanged { running: bool },
    /// The set of installed or available packages changed
    UpdatesChanged,
    /// Service shut down
    Quit,
}

/// Items and terminal notifications for a single transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionSignal {
    Package {
        info: PackageInfo,
        package_id: String,
        summary: String,
    },
    RepoDetail {
        repo_id: String,
        description: String,
        enabled: bool,
    },
    Error {
        kind: TransactionErrorKind,
        details: String,
    },
    Finished {
        exit: ExitStatus,
    },
}

/// Sender half of the backend event channel
pub type BackendEventSender = UnboundedSender<BackendEvent>;

/// Receiver half of the backend event channel
pub type BackendEventReceiver = UnboundedReceiver<BackendEvent>;

/// Create a new backend event channel
#[must_use]
pub fn channel() -> (BackendEventSender, BackendEventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}
