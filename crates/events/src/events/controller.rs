use serde::{Deserialize, Serialize};
use upkeep_types::Pool;

/// Controller-level state notifications
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControllerEvent {
    /// Backend reachability changed
    AvailabilityChanged { available: bool },

    /// A tracker pool crossed the empty/non-empty boundary
    PoolChanged { pool: Pool, active: bool },
}
