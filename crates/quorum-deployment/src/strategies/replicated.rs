//! Replicated stateful service deployment strategy
//!
//! Replaces the members of a primary/sync/async cluster one at a time while
//! keeping a writable primary and a synchronous standby, then retires the
//! old release's role and hands the remaining process types to a delegate.

use super::executor::DeploymentExecutor;
use crate::config::{StatefulRoleConfig, TimeoutConfig};
use crate::context::DeploymentContext;
use crate::error::Result;
use crate::{finalizer, sequencer, topology};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Replicated deployment executor
pub struct ReplicatedDeploymentExecutor {
    stateful: StatefulRoleConfig,
    timeouts: TimeoutConfig,
    /// Deploys every other process type once the stateful role is done
    delegate: Arc<dyn DeploymentExecutor>,
}

impl ReplicatedDeploymentExecutor {
    /// Create a new replicated deployment executor
    pub fn new(
        stateful: StatefulRoleConfig,
        timeouts: TimeoutConfig,
        delegate: Arc<dyn DeploymentExecutor>,
    ) -> Self {
        Self {
            stateful,
            timeouts,
            delegate,
        }
    }
}

#[async_trait]
impl DeploymentExecutor for ReplicatedDeploymentExecutor {
    async fn execute(&self, ctx: &mut DeploymentContext) -> Result<()> {
        let process_type = self.stateful.process_type.as_str();
        let expected = ctx.deployment().expected(process_type);

        info!(
            deployment_id = %ctx.deployment().id,
            process_type,
            expected,
            "Starting replicated deployment"
        );

        let topology = topology::decode(ctx.service_meta())?;
        topology::validate(&topology, expected, ctx.started(process_type))?;

        let replaced =
            sequencer::replace_all(ctx, &topology, &self.stateful, &self.timeouts).await?;
        info!(replaced, "All members replaced");

        finalizer::scale_down_old_release(ctx, process_type, self.timeouts.drain_timeout())
            .await?;

        info!(delegate = self.delegate.name(), "Deploying remaining processes");
        self.delegate.execute(ctx).await
    }

    fn name(&self) -> &str {
        super::REPLICATED
    }
}

impl std::fmt::Debug for ReplicatedDeploymentExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicatedDeploymentExecutor")
            .field("stateful", &self.stateful)
            .field("timeouts", &self.timeouts)
            .field("delegate", &self.delegate.name())
            .finish()
    }
}
