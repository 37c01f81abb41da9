use serde::{Deserialize, Serialize};
use upkeep_types::{ActionKind, PackageInfo, TransactionErrorKind, TransactionId};

use super::FailureContext;

/// Backend transaction outcomes worth surfacing to consumers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TransactionEvent {
    /// Package action submitted to the backend
    ActionSubmitted {
        transaction: TransactionId,
        action: ActionKind,
        packages: Vec<String>,
    },

    /// Per-package progress reported during an action
    ItemProgress {
        transaction: TransactionId,
        package_id: String,
        info: PackageInfo,
    },

    /// Transaction reported an error
    Failed {
        transaction: TransactionId,
        request: String,
        kind: TransactionErrorKind,
        failure: FailureContext,
    },

    /// Transaction reached its terminal state
    Completed {
        transaction: TransactionId,
        request: String,
        success: bool,
    },
}
