//! Deployment record
//!
//! A Deployment moves an application from one release to another.

use crate::{AppId, DeploymentId, ProcessCounts, ReleaseId};
use serde::{Deserialize, Serialize};

/// An application deployment from `old_release_id` to `new_release_id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    /// Unique deployment identifier
    pub id: DeploymentId,

    /// Application being deployed
    pub app_id: AppId,

    /// Release currently running
    pub old_release_id: ReleaseId,

    /// Release being rolled out
    pub new_release_id: ReleaseId,

    /// Name of the strategy to run
    pub strategy: String,

    /// Expected instance count per process type
    pub processes: ProcessCounts,

    /// Created timestamp
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Deployment {
    pub fn new(
        app_id: AppId,
        old_release_id: ReleaseId,
        new_release_id: ReleaseId,
        strategy: impl Into<String>,
        processes: ProcessCounts,
    ) -> Self {
        Self {
            id: DeploymentId::generate(),
            app_id,
            old_release_id,
            new_release_id,
            strategy: strategy.into(),
            processes,
            created_at: chrono::Utc::now(),
        }
    }

    /// Expected instance count for a process type, zero when absent
    pub fn expected(&self, process_type: &str) -> u32 {
        self.processes.get(process_type).copied().unwrap_or(0)
    }
}
