//! One-at-a-time deployment strategy
//!
//! Starts one new-release job, waits for it to come up, then stops one
//! old-release job, per process type until the new release runs the
//! expected count. Used on its own for stateless applications and as the
//! delegate of the replicated strategy.

use super::executor::DeploymentExecutor;
use crate::context::DeploymentContext;
use crate::error::{DeploymentError, Result};
use async_trait::async_trait;
use quorum_types::{JobState, ReleaseId};
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info};

/// One-at-a-time deployment executor
#[derive(Debug, Clone)]
pub struct OneByOneDeploymentExecutor {
    /// Bound on every wait for a job event
    job_event_timeout: Duration,
}

impl OneByOneDeploymentExecutor {
    /// Create a new one-at-a-time deployment executor
    pub fn new(job_event_timeout: Duration) -> Self {
        Self { job_event_timeout }
    }

    async fn start_one(&self, ctx: &mut DeploymentContext, process_type: &str) -> Result<()> {
        let release = ctx.deployment().new_release_id.clone();

        ctx.emit(&release, process_type, JobState::Starting);
        let started = ctx.increment_new(process_type);
        info!(release_id = %release, process_type, started, "Starting new job");
        ctx.put_new_formation().await?;

        self.wait_for_state(ctx, &release, process_type, JobState::Up)
            .await?;
        ctx.emit(&release, process_type, JobState::Up);
        Ok(())
    }

    async fn stop_one(&self, ctx: &mut DeploymentContext, process_type: &str) -> Result<()> {
        let release = ctx.deployment().old_release_id.clone();

        ctx.emit(&release, process_type, JobState::Stopping);
        let remaining = ctx.decrement_old(process_type);
        info!(release_id = %release, process_type, remaining, "Stopping old job");
        ctx.put_old_formation().await?;

        self.wait_for_state(ctx, &release, process_type, JobState::Down)
            .await?;
        ctx.emit(&release, process_type, JobState::Down);
        Ok(())
    }

    /// Wait for one job of `process_type` from `release` to reach `target`
    async fn wait_for_state(
        &self,
        ctx: &mut DeploymentContext,
        release: &ReleaseId,
        process_type: &str,
        target: JobState,
    ) -> Result<()> {
        let deadline = Instant::now() + self.job_event_timeout;
        let event = ctx
            .wait_for_job_event(deadline, |event| {
                event.is_for(release, process_type)
                    && (event.state == target || event.state.is_failure())
            })
            .await?;

        match event {
            Some(event) if event.state.is_failure() => {
                error!(job_id = %event.job_id, state = %event.state, "Job failed");
                Err(DeploymentError::JobFailed {
                    job_id: event.job_id,
                    state: event.state,
                })
            }
            Some(_) => Ok(()),
            None => {
                error!(
                    release_id = %release,
                    process_type,
                    state = %target,
                    "Timed out waiting for job event"
                );
                Err(DeploymentError::JobEventTimeout {
                    release_id: release.clone(),
                    process_type: process_type.to_string(),
                })
            }
        }
    }
}

#[async_trait]
impl DeploymentExecutor for OneByOneDeploymentExecutor {
    async fn execute(&self, ctx: &mut DeploymentContext) -> Result<()> {
        let process_types: BTreeSet<String> = ctx
            .deployment()
            .processes
            .keys()
            .chain(ctx.old_release_state().keys())
            .cloned()
            .collect();

        info!(
            deployment_id = %ctx.deployment().id,
            process_types = ?process_types,
            "Starting one-by-one deployment"
        );

        for process_type in &process_types {
            let expected = ctx.deployment().expected(process_type);

            while ctx.started(process_type) < expected {
                self.start_one(ctx, process_type).await?;
                if ctx.remaining(process_type) > 0 {
                    self.stop_one(ctx, process_type).await?;
                }
            }

            while ctx.remaining(process_type) > 0 {
                self.stop_one(ctx, process_type).await?;
            }
        }

        info!("One-by-one deployment complete");
        Ok(())
    }

    fn name(&self) -> &str {
        super::ONE_BY_ONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_control::{InMemoryFormationClient, InMemoryReplicaManager};
    use quorum_types::{AppId, Deployment, DeploymentEvent, JobEvent, JobId, ProcessCounts};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    struct Harness {
        ctx: DeploymentContext,
        formations: Arc<InMemoryFormationClient>,
        job_tx: mpsc::Sender<JobEvent>,
        events: mpsc::UnboundedReceiver<DeploymentEvent>,
        _service_tx: mpsc::Sender<quorum_types::RegistryEvent>,
    }

    fn harness(web: u32) -> Harness {
        let mut processes = ProcessCounts::new();
        processes.insert("web".into(), web);
        let deployment = Deployment::new(
            AppId::new("app"),
            ReleaseId::new("old"),
            ReleaseId::new("new"),
            "one-by-one",
            processes,
        );

        let formations = Arc::new(InMemoryFormationClient::new());
        let (deploy_tx, events) = mpsc::unbounded_channel();
        let (service_tx, service_rx) = mpsc::channel(16);
        let (job_tx, job_rx) = mpsc::channel(16);

        let ctx = DeploymentContext::builder(deployment)
            .with_formation_client(formations.clone())
            .with_replica_manager(Arc::new(InMemoryReplicaManager::new()))
            .with_deploy_events(deploy_tx)
            .with_service_events(service_rx)
            .with_job_events(job_rx)
            .build()
            .unwrap();

        Harness {
            ctx,
            formations,
            job_tx,
            events,
            _service_tx: service_tx,
        }
    }

    fn job(id: &str, release: &str, state: JobState) -> JobEvent {
        JobEvent::new(JobId::new(id), ReleaseId::new(release), "web", state)
    }

    #[tokio::test(start_paused = true)]
    async fn test_alternates_start_and_stop() {
        let mut h = harness(2);
        for event in [
            job("n1", "new", JobState::Up),
            job("o1", "old", JobState::Down),
            job("n2", "new", JobState::Up),
            job("o2", "old", JobState::Down),
        ] {
            h.job_tx.send(event).await.unwrap();
        }

        let executor = OneByOneDeploymentExecutor::new(Duration::from_secs(60));
        executor.execute(&mut h.ctx).await.unwrap();

        assert_eq!(h.ctx.started("web"), 2);
        assert_eq!(h.ctx.remaining("web"), 0);

        let mut states = Vec::new();
        while let Ok(event) = h.events.try_recv() {
            states.push((event.release_id.to_string(), event.job_state));
        }
        assert_eq!(
            states,
            vec![
                ("new".to_string(), JobState::Starting),
                ("new".to_string(), JobState::Up),
                ("old".to_string(), JobState::Stopping),
                ("old".to_string(), JobState::Down),
                ("new".to_string(), JobState::Starting),
                ("new".to_string(), JobState::Up),
                ("old".to_string(), JobState::Stopping),
                ("old".to_string(), JobState::Down),
            ]
        );

        // one formation document per step
        assert_eq!(h.formations.history().await.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_crashed_job_fails_deployment() {
        let mut h = harness(1);
        h.job_tx
            .send(job("n1", "new", JobState::Crashed))
            .await
            .unwrap();

        let executor = OneByOneDeploymentExecutor::new(Duration::from_secs(60));
        let err = executor.execute(&mut h.ctx).await.unwrap_err();
        assert!(matches!(
            err,
            DeploymentError::JobFailed {
                state: JobState::Crashed,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_job_event_times_out() {
        let mut h = harness(1);
        let start = Instant::now();

        let executor = OneByOneDeploymentExecutor::new(Duration::from_secs(60));
        let err = executor.execute(&mut h.ctx).await.unwrap_err();
        assert!(matches!(err, DeploymentError::JobEventTimeout { .. }));
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_nothing_to_do() {
        let mut h = harness(0);
        h.ctx.set_old("web", 0);

        let executor = OneByOneDeploymentExecutor::new(Duration::from_secs(60));
        executor.execute(&mut h.ctx).await.unwrap();
        assert!(h.formations.history().await.is_empty());
    }
}
