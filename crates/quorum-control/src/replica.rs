//! Replica management trait

use crate::error::Result;
use async_trait::async_trait;
use quorum_types::Instance;

/// Client for the management endpoint of a stateful instance
#[async_trait]
pub trait ReplicaManager: Send + Sync {
    /// Ask the service at `instance.addr` to shut down
    ///
    /// Completion is observed later as a registry `down` event.
    async fn stop(&self, instance: &Instance) -> Result<()>;
}
