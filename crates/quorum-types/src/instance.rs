//! Registry instance references
//!
//! An Instance is what the service registry publishes for one running
//! process: an id, the address of its management endpoint and free-form
//! metadata. The orchestrator only ever reads it.

use crate::{InstanceId, JobId, ReleaseId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata key carrying the job id of the process behind an instance
pub const JOB_ID_KEY: &str = "JOB_ID";

/// Metadata key carrying the release the process was started from
pub const RELEASE_ID_KEY: &str = "RELEASE_ID";

/// Metadata key carrying the process type of the process
pub const PROCESS_TYPE_KEY: &str = "PROCESS_TYPE";

/// A registered service instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Registry-assigned identifier
    pub id: InstanceId,

    /// Management address (`host:port`)
    pub addr: String,

    /// Protocol advertised by the instance
    #[serde(default)]
    pub proto: String,

    /// Instance metadata
    #[serde(default)]
    pub meta: HashMap<String, String>,

    /// Registration index, increasing in registration order
    #[serde(default)]
    pub index: u64,
}

impl Instance {
    pub fn new(id: impl Into<String>, addr: impl Into<String>) -> Self {
        Self {
            id: InstanceId::new(id),
            addr: addr.into(),
            proto: "tcp".into(),
            meta: HashMap::new(),
            index: 0,
        }
    }

    /// Attach a metadata entry
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn with_index(mut self, index: u64) -> Self {
        self.index = index;
        self
    }

    pub fn meta_value(&self, key: &str) -> Option<&str> {
        self.meta.get(key).map(String::as_str)
    }

    pub fn job_id(&self) -> Option<JobId> {
        self.meta_value(JOB_ID_KEY).map(JobId::new)
    }

    pub fn release_id(&self) -> Option<ReleaseId> {
        self.meta_value(RELEASE_ID_KEY).map(ReleaseId::new)
    }

    pub fn process_type(&self) -> Option<&str> {
        self.meta_value(PROCESS_TYPE_KEY)
    }

    /// Whether the flag stored under `key` is set to `"true"`
    pub fn flag(&self, key: &str) -> bool {
        self.meta_value(key) == Some("true")
    }
}

/// Service-level metadata published alongside the instances of a service
///
/// For a replicated service this is the cluster-state snapshot written by
/// the service's own coordination layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMeta {
    /// Opaque payload
    pub data: Vec<u8>,

    /// Registry index of the last write
    #[serde(default)]
    pub index: u64,
}

impl ServiceMeta {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            index: 0,
        }
    }
}
