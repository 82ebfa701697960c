//! Deployment Manager - Entry point for running a deployment
//!
//! The DeploymentManager picks the executor named by the deployment's
//! strategy and runs it against a prepared DeploymentContext. It holds no
//! per-deployment state, so one manager can serve deployments of many
//! applications concurrently, each with its own context.

use crate::config::DeployerConfig;
use crate::context::DeploymentContext;
use crate::error::Result;
use crate::strategies::{self, DeploymentExecutor};
use quorum_types::{DeploymentId, ProcessCounts};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, instrument};

/// Outcome of a successful deployment
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentSummary {
    pub deployment_id: DeploymentId,
    pub strategy: String,
    /// Formation of the new release at the end of the deployment
    pub new_release_state: ProcessCounts,
    /// Formation of the old release at the end of the deployment
    pub old_release_state: ProcessCounts,
    pub elapsed: Duration,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// Runs deployments with the configured strategies
#[derive(Debug, Clone, Default)]
pub struct DeploymentManager {
    config: DeployerConfig,
}

impl DeploymentManager {
    /// Create a new deployment manager
    pub fn new(config: DeployerConfig) -> Self {
        Self { config }
    }

    /// Resolve the executor for a strategy name
    pub fn executor_for(&self, strategy: &str) -> Result<Arc<dyn DeploymentExecutor>> {
        strategies::create_executor(strategy, &self.config)
    }

    /// Run the deployment held by `ctx` to completion
    ///
    /// On failure nothing is rolled back; `ctx` keeps the release states
    /// that were requested before the error.
    #[instrument(
        skip(self, ctx),
        fields(
            deployment_id = %ctx.deployment().id,
            app_id = %ctx.deployment().app_id,
            strategy = %ctx.deployment().strategy,
        )
    )]
    pub async fn execute(&self, ctx: &mut DeploymentContext) -> Result<DeploymentSummary> {
        let executor = self.executor_for(&ctx.deployment().strategy)?;
        let start = Instant::now();

        info!(
            old_release_id = %ctx.deployment().old_release_id,
            new_release_id = %ctx.deployment().new_release_id,
            processes = ?ctx.deployment().processes,
            "Starting deployment"
        );

        if let Err(e) = executor.execute(ctx).await {
            error!(
                error = %e,
                new_release_state = ?ctx.new_release_state(),
                old_release_state = ?ctx.old_release_state(),
                "Deployment failed"
            );
            return Err(e);
        }

        let summary = DeploymentSummary {
            deployment_id: ctx.deployment().id.clone(),
            strategy: executor.name().to_string(),
            new_release_state: ctx.new_release_state().clone(),
            old_release_state: ctx.old_release_state().clone(),
            elapsed: start.elapsed(),
            completed_at: chrono::Utc::now(),
        };

        info!(elapsed_ms = summary.elapsed.as_millis() as u64, "Deployment complete");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeploymentError;
    use quorum_control::{InMemoryFormationClient, InMemoryReplicaManager};
    use quorum_types::{
        AppId, Deployment, JobEvent, JobId, JobState, RegistryEvent, ReleaseId, ServiceMeta,
    };
    use tokio::sync::mpsc;

    struct Streams {
        formations: Arc<InMemoryFormationClient>,
        replicas: Arc<InMemoryReplicaManager>,
        _service_tx: mpsc::Sender<RegistryEvent>,
        _job_tx: mpsc::Sender<JobEvent>,
    }

    fn context(strategy: &str, job_events: Vec<JobEvent>) -> (DeploymentContext, Streams) {
        let mut processes = ProcessCounts::new();
        processes.insert("web".into(), 1);
        let deployment = Deployment::new(
            AppId::new("app"),
            ReleaseId::new("old"),
            ReleaseId::new("new"),
            strategy,
            processes,
        );

        let (deploy_tx, _) = mpsc::unbounded_channel();
        let (service_tx, service_rx) = mpsc::channel(16);
        let (job_tx, job_rx) = mpsc::channel(16);
        for event in job_events {
            job_tx.try_send(event).unwrap();
        }

        let formations = Arc::new(InMemoryFormationClient::new());
        let replicas = Arc::new(InMemoryReplicaManager::new());
        let ctx = DeploymentContext::builder(deployment)
            .with_service_meta(ServiceMeta::new(b"{}".to_vec()))
            .with_formation_client(formations.clone())
            .with_replica_manager(replicas.clone())
            .with_deploy_events(deploy_tx)
            .with_service_events(service_rx)
            .with_job_events(job_rx)
            .build()
            .unwrap();

        (
            ctx,
            Streams {
                formations,
                replicas,
                _service_tx: service_tx,
                _job_tx: job_tx,
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_one_by_one() {
        let (mut ctx, _streams) = context(
            strategies::ONE_BY_ONE,
            vec![
                JobEvent::new(JobId::new("n1"), ReleaseId::new("new"), "web", JobState::Up),
                JobEvent::new(JobId::new("o1"), ReleaseId::new("old"), "web", JobState::Down),
            ],
        );

        let summary = DeploymentManager::default().execute(&mut ctx).await.unwrap();
        assert_eq!(summary.strategy, strategies::ONE_BY_ONE);
        assert_eq!(summary.new_release_state.get("web"), Some(&1));
        assert_eq!(summary.old_release_state.get("web"), Some(&0));
    }

    #[tokio::test]
    async fn test_execute_unknown_strategy() {
        let (mut ctx, _streams) = context("recreate", Vec::new());
        let err = DeploymentManager::default()
            .execute(&mut ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, DeploymentError::UnknownStrategy(_)));
    }

    #[tokio::test]
    async fn test_execute_replicated_without_primary() {
        let (mut ctx, streams) = context(strategies::REPLICATED, Vec::new());
        let err = DeploymentManager::default()
            .execute(&mut ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, DeploymentError::NoPrimary));
        assert!(streams.replicas.stopped().await.is_empty());
        assert!(streams.formations.history().await.is_empty());
    }
}
