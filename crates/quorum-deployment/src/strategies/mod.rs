//! Deployment strategy implementations

pub mod executor;
pub mod one_by_one;
pub mod replicated;

pub use executor::DeploymentExecutor;
pub use one_by_one::OneByOneDeploymentExecutor;
pub use replicated::ReplicatedDeploymentExecutor;

use crate::config::DeployerConfig;
use crate::error::{DeploymentError, Result};
use std::sync::Arc;

/// Strategy name of [`ReplicatedDeploymentExecutor`]
pub const REPLICATED: &str = "replicated";

/// Strategy name of [`OneByOneDeploymentExecutor`]
pub const ONE_BY_ONE: &str = "one-by-one";

/// Factory for creating deployment executors
pub fn create_executor(name: &str, config: &DeployerConfig) -> Result<Arc<dyn DeploymentExecutor>> {
    let one_by_one = Arc::new(OneByOneDeploymentExecutor::new(
        config.timeouts.job_event_timeout(),
    ));

    match name {
        REPLICATED => Ok(Arc::new(ReplicatedDeploymentExecutor::new(
            config.stateful.clone(),
            config.timeouts.clone(),
            one_by_one,
        ))),
        ONE_BY_ONE => Ok(one_by_one),
        other => Err(DeploymentError::UnknownStrategy(other.to_string())),
    }
}
