//! Backend transaction vocabulary

use crate::PackageId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque handle for one outstanding backend operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TransactionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tracker pool a transaction is registered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pool {
    /// Background queries and maintenance
    General,
    /// Install/remove actions and the queries resolving them
    Update,
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::General => f.write_str("general"),
            Self::Update => f.write_str("update"),
        }
    }
}

/// User-level package action handled by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Update,
    Remove,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Update => f.write_str("update"),
            Self::Remove => f.write_str("remove"),
        }
    }
}

/// Mutating request submitted to the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    Update { packages: Vec<PackageId> },
    Remove { packages: Vec<PackageId> },
    RefreshCache { force: bool },
    SetRepoEnabled { repo_id: String, enabled: bool },
}

impl Action {
    /// Short name used in logs and error reports
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Update { .. } => "update-packages",
            Self::Remove { .. } => "remove-packages",
            Self::RefreshCache { .. } => "refresh-cache",
            Self::SetRepoEnabled { .. } => "repo-enable",
        }
    }
}

/// Error kind reported by the backend for a failed transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionErrorKind {
    PackageDownloadFailed,
    NoNetwork,
    PermissionDenied,
    PackageNotFound,
    DependencyResolutionFailed,
    NotSupported,
    TransactionCancelled,
    Internal,
    Unknown,
}

impl TransactionErrorKind {
    /// Whether the failure came from fetching package payloads
    #[must_use]
    pub fn is_download_failure(self) -> bool {
        matches!(self, Self::PackageDownloadFailed)
    }
}

impl fmt::Display for TransactionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PackageDownloadFailed => "package-download-failed",
            Self::NoNetwork => "no-network",
            Self::PermissionDenied => "permission-denied",
            Self::PackageNotFound => "package-not-found",
            Self::DependencyResolutionFailed => "dependency-resolution-failed",
            Self::NotSupported => "not-supported",
            Self::TransactionCancelled => "transaction-cancelled",
            Self::Internal => "internal",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Terminal outcome of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitStatus {
    Success,
    Failed,
    Cancelled,
}

impl ExitStatus {
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}
