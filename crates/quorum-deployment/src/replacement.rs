//! Instance replacement protocol
//!
//! Retires one old-release instance of the stateful role and admits one
//! new-release instance in its place:
//!
//! ```text
//! Idle -> Stopping -> WaitingDown -> Starting -> WaitingUp -> Done
//! ```
//!
//! The new instance only counts as admitted once the registry reports it
//! with the service's readiness flag set. A process that is merely alive may
//! not have joined the replica set yet.

use crate::config::{StatefulRoleConfig, TimeoutConfig};
use crate::context::DeploymentContext;
use crate::error::{DeploymentError, ReplacementStage, Result};
use quorum_types::{
    Instance, JobState, RegistryEvent, RegistryEventKind, ReleaseId, ReplicaRole, JOB_ID_KEY,
    RELEASE_ID_KEY,
};
use tokio::time::Instant;
use tracing::{debug, error, info, instrument};

/// Phase of a single instance replacement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplacementPhase {
    Idle,
    Stopping,
    WaitingDown,
    Starting,
    WaitingUp,
    Done,
}

/// One run of the replacement protocol for one instance
pub struct InstanceReplacement<'a> {
    instance: &'a Instance,
    role: ReplicaRole,
    stateful: &'a StatefulRoleConfig,
    timeouts: &'a TimeoutConfig,
    phase: ReplacementPhase,
}

impl<'a> InstanceReplacement<'a> {
    pub fn new(
        instance: &'a Instance,
        role: ReplicaRole,
        stateful: &'a StatefulRoleConfig,
        timeouts: &'a TimeoutConfig,
    ) -> Self {
        Self {
            instance,
            role,
            stateful,
            timeouts,
            phase: ReplacementPhase::Idle,
        }
    }

    fn advance(&mut self, next: ReplacementPhase) {
        debug!(from = ?self.phase, to = ?next, "Replacement phase");
        self.phase = next;
    }

    /// Drive the protocol to completion
    #[instrument(
        skip(self, ctx),
        fields(
            instance_id = %self.instance.id,
            job_id = self.instance.meta_value(JOB_ID_KEY).unwrap_or(""),
            role = %self.role,
        )
    )]
    pub async fn run(mut self, ctx: &mut DeploymentContext) -> Result<()> {
        let result = self.drive(ctx).await;
        if let Err(e) = &result {
            error!(phase = ?self.phase, error = %e, "Replacement failed");
        }
        result
    }

    async fn drive(&mut self, ctx: &mut DeploymentContext) -> Result<()> {
        let old_release = ctx.deployment().old_release_id.clone();
        let new_release = ctx.deployment().new_release_id.clone();
        let (instance, stateful, timeouts) = (self.instance, self.stateful, self.timeouts);
        let process_type = stateful.process_type.as_str();

        // Idle -> Stopping
        self.advance(ReplacementPhase::Stopping);
        ctx.emit(&old_release, process_type, JobState::Stopping);
        info!(addr = %instance.addr, "Stopping instance");
        ctx.stop_instance(instance).await?;

        // Stopping -> WaitingDown
        self.advance(ReplacementPhase::WaitingDown);
        info!("Waiting for instance to stop");
        let deadline = Instant::now() + timeouts.stop_timeout();
        let down = ctx
            .wait_for_service_event(deadline, |event| {
                event.kind == RegistryEventKind::Down
                    && event.instance.as_ref().is_some_and(|i| i.id == instance.id)
            })
            .await?;
        if down.is_none() {
            error!(
                timeout_secs = timeouts.stop_timeout_secs,
                "Timed out waiting for instance to stop"
            );
            return Err(DeploymentError::ReplacementTimeout {
                stage: ReplacementStage::Stop,
            });
        }
        ctx.emit(&old_release, process_type, JobState::Down);

        // WaitingDown -> Starting
        self.advance(ReplacementPhase::Starting);
        let started = ctx.increment_new(process_type);
        ctx.emit(&new_release, process_type, JobState::Starting);
        info!(started, "Starting new instance");
        ctx.put_new_formation().await?;

        // Starting -> WaitingUp
        self.advance(ReplacementPhase::WaitingUp);
        info!("Waiting for new instance to come up");
        let readiness_key = stateful.readiness_key.as_str();
        let deadline = Instant::now() + timeouts.start_timeout();
        let up = ctx
            .wait_for_service_event(deadline, |event| {
                is_ready(event, &new_release, process_type, readiness_key)
            })
            .await?;
        let Some(up) = up else {
            error!(
                timeout_secs = timeouts.start_timeout_secs,
                "Timed out waiting for new instance to come up"
            );
            return Err(DeploymentError::ReplacementTimeout {
                stage: ReplacementStage::Start,
            });
        };
        ctx.emit(&new_release, process_type, JobState::Up);

        self.advance(ReplacementPhase::Done);
        info!(
            new_instance_id = up.instance.as_ref().map(|i| i.id.as_str()).unwrap_or(""),
            "Instance replaced"
        );

        Ok(())
    }
}

/// Whether `event` announces a ready instance of `process_type` from `release_id`
pub fn is_ready(
    event: &RegistryEvent,
    release_id: &ReleaseId,
    process_type: &str,
    readiness_key: &str,
) -> bool {
    if !event
        .kind
        .is_any(&[RegistryEventKind::Up, RegistryEventKind::Update])
    {
        return false;
    }

    event.instance.as_ref().is_some_and(|instance| {
        instance.meta_value(RELEASE_ID_KEY) == Some(release_id.as_str())
            && instance.process_type() == Some(process_type)
            && instance.flag(readiness_key)
    })
}
