//! Deployment Context - Execution environment for deployment strategies
//!
//! The context owns everything one deployment mutates: the current
//! formations of both releases and the receiving ends of the registry and
//! job event streams. Strategies borrow it mutably for the whole run, so two
//! strategies can never drive the same deployment at once.

use crate::error::{DeploymentError, EventStream, Result};
use quorum_control::{FormationClient, ReplicaManager};
use quorum_types::{
    Deployment, DeploymentEvent, Formation, Instance, JobEvent, JobState, ProcessCounts,
    RegistryEvent, ReleaseId, ServiceMeta,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error};

/// Context provided to deployment executors
pub struct DeploymentContext {
    /// The deployment being executed
    deployment: Deployment,
    /// Current formation of the old release
    old_release_state: ProcessCounts,
    /// Current formation of the new release
    new_release_state: ProcessCounts,
    /// Last known cluster-state snapshot of the stateful service
    service_meta: Option<ServiceMeta>,
    /// Formation control API
    formations: Arc<dyn FormationClient>,
    /// Management client for stateful instances
    replicas: Arc<dyn ReplicaManager>,
    /// Outbound progress events
    deploy_events: mpsc::UnboundedSender<DeploymentEvent>,
    /// Service registry events
    service_events: mpsc::Receiver<RegistryEvent>,
    /// Job lifecycle events
    job_events: mpsc::Receiver<JobEvent>,
}

impl DeploymentContext {
    /// Start building a context for `deployment`
    pub fn builder(deployment: Deployment) -> DeploymentContextBuilder {
        DeploymentContextBuilder::new(deployment)
    }

    /// Get the deployment
    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    pub fn service_meta(&self) -> Option<&ServiceMeta> {
        self.service_meta.as_ref()
    }

    pub fn old_release_state(&self) -> &ProcessCounts {
        &self.old_release_state
    }

    pub fn new_release_state(&self) -> &ProcessCounts {
        &self.new_release_state
    }

    /// Number of new-release instances already requested for a process type
    ///
    /// After a failed deployment this is what an operator has to reconcile:
    /// started instances are left running.
    pub fn started(&self, process_type: &str) -> u32 {
        self.new_release_state.get(process_type).copied().unwrap_or(0)
    }

    /// Number of old-release instances still requested for a process type
    pub fn remaining(&self, process_type: &str) -> u32 {
        self.old_release_state.get(process_type).copied().unwrap_or(0)
    }

    /// Bump the new release's count for a process type, returning the new count
    pub fn increment_new(&mut self, process_type: &str) -> u32 {
        let count = self
            .new_release_state
            .entry(process_type.to_string())
            .or_insert(0);
        *count += 1;
        *count
    }

    /// Lower the old release's count for a process type, returning the new count
    pub fn decrement_old(&mut self, process_type: &str) -> u32 {
        let count = self
            .old_release_state
            .entry(process_type.to_string())
            .or_insert(0);
        *count = count.saturating_sub(1);
        *count
    }

    pub fn set_old(&mut self, process_type: &str, count: u32) {
        self.old_release_state
            .insert(process_type.to_string(), count);
    }

    /// Push a progress event to the caller
    ///
    /// A caller that stopped listening does not stop the deployment.
    pub fn emit(&self, release_id: &ReleaseId, job_type: &str, job_state: JobState) {
        let event = DeploymentEvent::new(release_id.clone(), job_type, job_state);
        debug!(event = %event, "Deployment event");
        let _ = self.deploy_events.send(event);
    }

    /// Ask the management endpoint of `instance` to stop the service
    pub async fn stop_instance(&self, instance: &Instance) -> Result<()> {
        self.replicas.stop(instance).await.map_err(|e| {
            error!(instance_id = %instance.id, addr = %instance.addr, error = %e, "Error stopping instance");
            DeploymentError::Stop {
                instance_id: instance.id.clone(),
                source: e,
            }
        })
    }

    /// Submit the new release's current formation
    pub async fn put_new_formation(&self) -> Result<()> {
        self.put_formation(
            self.deployment.new_release_id.clone(),
            self.new_release_state.clone(),
        )
        .await
    }

    /// Submit the old release's current formation
    pub async fn put_old_formation(&self) -> Result<()> {
        self.put_formation(
            self.deployment.old_release_id.clone(),
            self.old_release_state.clone(),
        )
        .await
    }

    async fn put_formation(&self, release_id: ReleaseId, processes: ProcessCounts) -> Result<()> {
        let formation = Formation::new(self.deployment.app_id.clone(), release_id, processes);

        self.formations
            .put_formation(&formation)
            .await
            .map_err(|e| {
                error!(
                    release_id = %formation.release_id,
                    processes = ?formation.processes,
                    error = %e,
                    "Error scaling formation"
                );
                DeploymentError::Scale {
                    release_id: formation.release_id.clone(),
                    source: e,
                }
            })
    }

    /// Wait for a registry event accepted by `accept`, or for `deadline`
    ///
    /// Events rejected by `accept` are dropped. Returns `Ok(None)` when the
    /// deadline passes first.
    pub async fn wait_for_service_event<F>(
        &mut self,
        deadline: Instant,
        mut accept: F,
    ) -> Result<Option<RegistryEvent>>
    where
        F: FnMut(&RegistryEvent) -> bool,
    {
        loop {
            tokio::select! {
                event = self.service_events.recv() => match event {
                    Some(event) if accept(&event) => return Ok(Some(event)),
                    Some(_) => {}
                    None => return Err(stream_closed(EventStream::Service)),
                },
                _ = tokio::time::sleep_until(deadline) => return Ok(None),
            }
        }
    }

    /// Wait for a job event accepted by `accept`, or for `deadline`
    pub async fn wait_for_job_event<F>(
        &mut self,
        deadline: Instant,
        mut accept: F,
    ) -> Result<Option<JobEvent>>
    where
        F: FnMut(&JobEvent) -> bool,
    {
        loop {
            tokio::select! {
                event = self.job_events.recv() => match event {
                    Some(event) => {
                        debug!(
                            job_id = %event.job_id,
                            process_type = %event.process_type,
                            state = %event.state,
                            "Got job event"
                        );
                        if accept(&event) {
                            return Ok(Some(event));
                        }
                    }
                    None => return Err(stream_closed(EventStream::Job)),
                },
                _ = tokio::time::sleep_until(deadline) => return Ok(None),
            }
        }
    }
}

fn stream_closed(stream: EventStream) -> DeploymentError {
    error!(stream = %stream, "Unexpected close of event stream");
    DeploymentError::UnexpectedStreamClose { stream }
}

/// Builder for constructing a DeploymentContext with all dependencies
pub struct DeploymentContextBuilder {
    deployment: Deployment,
    old_release_state: Option<ProcessCounts>,
    new_release_state: Option<ProcessCounts>,
    service_meta: Option<ServiceMeta>,
    formations: Option<Arc<dyn FormationClient>>,
    replicas: Option<Arc<dyn ReplicaManager>>,
    deploy_events: Option<mpsc::UnboundedSender<DeploymentEvent>>,
    service_events: Option<mpsc::Receiver<RegistryEvent>>,
    job_events: Option<mpsc::Receiver<JobEvent>>,
}

impl DeploymentContextBuilder {
    /// Create a new builder for the given deployment
    pub fn new(deployment: Deployment) -> Self {
        Self {
            deployment,
            old_release_state: None,
            new_release_state: None,
            service_meta: None,
            formations: None,
            replicas: None,
            deploy_events: None,
            service_events: None,
            job_events: None,
        }
    }

    /// Set the old release's current formation (defaults to the expected counts)
    pub fn with_old_release_state(mut self, state: ProcessCounts) -> Self {
        self.old_release_state = Some(state);
        self
    }

    /// Set the new release's current formation (defaults to empty)
    pub fn with_new_release_state(mut self, state: ProcessCounts) -> Self {
        self.new_release_state = Some(state);
        self
    }

    /// Set the cluster-state snapshot of the stateful service
    pub fn with_service_meta(mut self, meta: ServiceMeta) -> Self {
        self.service_meta = Some(meta);
        self
    }

    /// Set the formation control client
    pub fn with_formation_client(mut self, client: Arc<dyn FormationClient>) -> Self {
        self.formations = Some(client);
        self
    }

    /// Set the replica management client
    pub fn with_replica_manager(mut self, manager: Arc<dyn ReplicaManager>) -> Self {
        self.replicas = Some(manager);
        self
    }

    /// Set the channel progress events are pushed to
    pub fn with_deploy_events(mut self, tx: mpsc::UnboundedSender<DeploymentEvent>) -> Self {
        self.deploy_events = Some(tx);
        self
    }

    /// Set the registry event stream
    pub fn with_service_events(mut self, rx: mpsc::Receiver<RegistryEvent>) -> Self {
        self.service_events = Some(rx);
        self
    }

    /// Set the job event stream
    pub fn with_job_events(mut self, rx: mpsc::Receiver<JobEvent>) -> Self {
        self.job_events = Some(rx);
        self
    }

    /// Build the context
    pub fn build(self) -> Result<DeploymentContext> {
        let old_release_state = self
            .old_release_state
            .unwrap_or_else(|| self.deployment.processes.clone());

        Ok(DeploymentContext {
            old_release_state,
            new_release_state: self.new_release_state.unwrap_or_default(),
            service_meta: self.service_meta,
            formations: self
                .formations
                .ok_or(DeploymentError::MissingComponent("formation client"))?,
            replicas: self
                .replicas
                .ok_or(DeploymentError::MissingComponent("replica manager"))?,
            deploy_events: self
                .deploy_events
                .ok_or(DeploymentError::MissingComponent("deploy event channel"))?,
            service_events: self
                .service_events
                .ok_or(DeploymentError::MissingComponent("service event stream"))?,
            job_events: self
                .job_events
                .ok_or(DeploymentError::MissingComponent("job event stream"))?,
            deployment: self.deployment,
        })
    }
}
