//! Deployment executor trait

use crate::context::DeploymentContext;
use crate::error::Result;
use async_trait::async_trait;

/// Trait for deployment strategy executors
#[async_trait]
pub trait DeploymentExecutor: Send + Sync {
    /// Execute the deployment strategy
    ///
    /// Progress is reported through the context's deployment events; the
    /// context's release states reflect whatever was requested before an
    /// error.
    async fn execute(&self, ctx: &mut DeploymentContext) -> Result<()>;

    /// Strategy name for logging
    fn name(&self) -> &str;
}
