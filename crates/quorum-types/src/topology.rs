//! Replica topology of a stateful service
//!
//! The topology is decoded from the cluster-state snapshot the service
//! publishes to the registry. Asyncs are kept in registration order, which
//! is also the order they get replaced in.

use crate::Instance;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Current primary/sync/async arrangement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    /// Topology generation, bumped by the service on every change
    #[serde(default)]
    pub sequence: u64,

    /// Writable head of the replication chain
    #[serde(default)]
    pub primary: Option<Instance>,

    /// Synchronous standby
    #[serde(default)]
    pub sync: Option<Instance>,

    /// Asynchronous replicas, oldest registration first
    #[serde(default, rename = "async")]
    pub asyncs: Vec<Instance>,

    /// Former primaries that were fenced off
    #[serde(default)]
    pub deposed: Vec<Instance>,
}

impl Topology {
    /// Number of live members (primary, sync and asyncs)
    pub fn size(&self) -> usize {
        usize::from(self.primary.is_some()) + usize::from(self.sync.is_some()) + self.asyncs.len()
    }

    /// Members in the order they must be replaced: asyncs, sync, primary
    pub fn replacement_order(&self) -> Vec<(ReplicaRole, &Instance)> {
        let mut order: Vec<(ReplicaRole, &Instance)> = self
            .asyncs
            .iter()
            .enumerate()
            .map(|(i, inst)| (ReplicaRole::Async(i), inst))
            .collect();

        if let Some(sync) = &self.sync {
            order.push((ReplicaRole::Sync, sync));
        }
        if let Some(primary) = &self.primary {
            order.push((ReplicaRole::Primary, primary));
        }

        order
    }
}

/// Role of a member within the topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicaRole {
    Primary,
    Sync,
    /// Async replica at the given position
    Async(usize),
}

impl fmt::Display for ReplicaRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplicaRole::Primary => f.write_str("primary"),
            ReplicaRole::Sync => f.write_str("sync"),
            ReplicaRole::Async(i) => write!(f, "async[{}]", i),
        }
    }
}
