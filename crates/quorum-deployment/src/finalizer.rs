//! Scale-down of the old release's stateful role
//!
//! Once every member runs the new release the old formation is scaled to
//! zero for the role, and the job stream is drained until every old job has
//! reported `down`.

use crate::context::DeploymentContext;
use crate::error::{DeploymentError, Result};
use quorum_types::JobState;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info};

/// Scale the old release's `process_type` to zero and wait for its jobs to exit
pub async fn scale_down_old_release(
    ctx: &mut DeploymentContext,
    process_type: &str,
    timeout: Duration,
) -> Result<()> {
    let old_release = ctx.deployment().old_release_id.clone();
    let expected = ctx.deployment().expected(process_type);

    info!(release_id = %old_release, process_type, "Stopping old jobs");
    ctx.set_old(process_type, 0);
    ctx.put_old_formation().await?;

    info!(expected, "Waiting for job down events");
    let deadline = Instant::now() + timeout;
    let mut observed = 0;

    while observed < expected {
        let event = ctx
            .wait_for_job_event(deadline, |event| {
                event.state == JobState::Down && event.is_for(&old_release, process_type)
            })
            .await?;

        match event {
            Some(event) => {
                observed += 1;
                debug!(job_id = %event.job_id, observed, expected, "Old job down");
            }
            None => {
                error!(expected, observed, "Timed out waiting for job events");
                return Err(DeploymentError::FinalizationTimeout { expected, observed });
            }
        }
    }

    info!(observed, "Old jobs stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_control::{ControlError, InMemoryFormationClient, InMemoryReplicaManager};
    use quorum_types::{AppId, Deployment, JobEvent, JobId, ProcessCounts, ReleaseId};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    struct Harness {
        ctx: DeploymentContext,
        formations: Arc<InMemoryFormationClient>,
        job_tx: mpsc::Sender<JobEvent>,
        _service_tx: mpsc::Sender<quorum_types::RegistryEvent>,
    }

    fn harness() -> Harness {
        let mut processes = ProcessCounts::new();
        processes.insert("postgres".into(), 3);
        processes.insert("web".into(), 2);
        let deployment = Deployment::new(
            AppId::new("app"),
            ReleaseId::new("old"),
            ReleaseId::new("new"),
            "replicated",
            processes,
        );

        let formations = Arc::new(InMemoryFormationClient::new());
        let (deploy_tx, _) = mpsc::unbounded_channel();
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
            _service_tx: service_tx,
        }
    }

    fn job(id: &str, release: &str, process_type: &str, state: JobState) -> JobEvent {
        JobEvent::new(JobId::new(id), ReleaseId::new(release), process_type, state)
    }

    #[tokio::test(start_paused = true)]
    async fn test_drains_all_old_jobs() {
        let mut h = harness();
        for id in ["o1", "o2", "o3"] {
            h.job_tx
                .send(job(id, "old", "postgres", JobState::Down))
                .await
                .unwrap();
        }

        scale_down_old_release(&mut h.ctx, "postgres", Duration::from_secs(60))
            .await
            .unwrap();

        let old = h
            .formations
            .current(&AppId::new("app"), &ReleaseId::new("old"))
            .unwrap();
        assert_eq!(old.count("postgres"), 0);
        assert_eq!(old.count("web"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_only_old_role_jobs() {
        let mut h = harness();
        for event in [
            job("o1", "old", "postgres", JobState::Down),
            job("n1", "new", "postgres", JobState::Down),
            job("w1", "old", "web", JobState::Down),
            job("o2", "old", "postgres", JobState::Stopping),
        ] {
            h.job_tx.send(event).await.unwrap();
        }
        let start = Instant::now();

        let err = scale_down_old_release(&mut h.ctx, "postgres", Duration::from_secs(60))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DeploymentError::FinalizationTimeout {
                expected: 3,
                observed: 1
            }
        ));
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scale_down_failure_names_old_release() {
        let mut h = harness();
        h.formations
            .fail_with(ControlError::Rejected {
                status: 503,
                message: "unavailable".into(),
            })
            .await;

        let err = scale_down_old_release(&mut h.ctx, "postgres", Duration::from_secs(60))
            .await
            .unwrap_err();

        match err {
            DeploymentError::Scale { release_id, .. } => {
                assert_eq!(release_id, ReleaseId::new("old"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
