//! In-memory implementations of control-plane traits
//!
//! These are suitable for development and testing. They record every call
//! and can be told to fail so callers can exercise their error paths.

use crate::error::{ControlError, Result};
use crate::formation::FormationClient;
use crate::replica::ReplicaManager;
use async_trait::async_trait;
use dashmap::DashMap;
use quorum_types::{AppId, Formation, Instance, InstanceId, ReleaseId};
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory formation store
pub struct InMemoryFormationClient {
    current: DashMap<(AppId, ReleaseId), Formation>,
    history: RwLock<Vec<Formation>>,
    failure: RwLock<Option<ControlError>>,
}

impl InMemoryFormationClient {
    pub fn new() -> Self {
        Self {
            current: DashMap::new(),
            history: RwLock::new(Vec::new()),
            failure: RwLock::new(None),
        }
    }

    /// Make every subsequent `put_formation` fail with `error`
    pub async fn fail_with(&self, error: ControlError) {
        *self.failure.write().await = Some(error);
    }

    /// Latest accepted formation for a release
    pub fn current(&self, app_id: &AppId, release_id: &ReleaseId) -> Option<Formation> {
        self.current
            .get(&(app_id.clone(), release_id.clone()))
            .map(|f| f.clone())
    }

    /// Every accepted formation, in submission order
    pub async fn history(&self) -> Vec<Formation> {
        self.history.read().await.clone()
    }
}

impl Default for InMemoryFormationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FormationClient for InMemoryFormationClient {
    async fn put_formation(&self, formation: &Formation) -> Result<()> {
        if let Some(error) = self.failure.read().await.clone() {
            return Err(error);
        }

        self.current.insert(
            (formation.app_id.clone(), formation.release_id.clone()),
            formation.clone(),
        );
        self.history.write().await.push(formation.clone());

        debug!(
            app_id = %formation.app_id,
            release_id = %formation.release_id,
            processes = ?formation.processes,
            "Formation accepted"
        );

        Ok(())
    }
}

/// In-memory replica manager that records stop requests
pub struct InMemoryReplicaManager {
    stopped: RwLock<Vec<InstanceId>>,
    failure: RwLock<Option<ControlError>>,
}

impl InMemoryReplicaManager {
    pub fn new() -> Self {
        Self {
            stopped: RwLock::new(Vec::new()),
            failure: RwLock::new(None),
        }
    }

    /// Make every subsequent `stop` fail with `error`
    pub async fn fail_with(&self, error: ControlError) {
        *self.failure.write().await = Some(error);
    }

    /// Instances a stop was requested for, in request order
    pub async fn stopped(&self) -> Vec<InstanceId> {
        self.stopped.read().await.clone()
    }
}

impl Default for InMemoryReplicaManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReplicaManager for InMemoryReplicaManager {
    async fn stop(&self, instance: &Instance) -> Result<()> {
        if let Some(error) = self.failure.read().await.clone() {
            return Err(error);
        }

        self.stopped.write().await.push(instance.id.clone());
        debug!(instance_id = %instance.id, addr = %instance.addr, "Stop requested");
        Ok(())
    }
}
