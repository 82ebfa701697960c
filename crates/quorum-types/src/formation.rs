//! Formations: desired process counts for one release

use crate::{AppId, ReleaseId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Process type to instance count, ordered by process type
pub type ProcessCounts = BTreeMap<String, u32>;

/// Desired-state document sent to the control API
///
/// A formation is a command, not a cache: the control API converges on it
/// asynchronously and convergence is observed through the event streams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formation {
    pub app_id: AppId,
    pub release_id: ReleaseId,
    pub processes: ProcessCounts,
}

impl Formation {
    pub fn new(app_id: AppId, release_id: ReleaseId, processes: ProcessCounts) -> Self {
        Self {
            app_id,
            release_id,
            processes,
        }
    }

    /// Desired count for a process type, zero when absent
    pub fn count(&self, process_type: &str) -> u32 {
        self.processes.get(process_type).copied().unwrap_or(0)
    }
}
