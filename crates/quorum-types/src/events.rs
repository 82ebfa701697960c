//! Event types flowing through a deployment
//!
//! Two streams flow in (registry events and job lifecycle events) and one
//! flows out (deployment progress events).

use crate::{Instance, JobId, ReleaseId, ServiceMeta};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ═══════════════════════════════════════════════════════════════════
// REGISTRY EVENTS
// ═══════════════════════════════════════════════════════════════════

/// Kind of change reported by the service registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryEventKind {
    /// Instance registered
    Up,
    /// Instance deregistered or expired
    Down,
    /// Instance metadata changed
    Update,
    /// Service leader changed
    Leader,
    /// Service-level metadata changed
    ServiceMeta,
    /// Initial listing delivered
    Current,
}

impl RegistryEventKind {
    pub fn is_any(&self, kinds: &[RegistryEventKind]) -> bool {
        kinds.contains(self)
    }
}

impl fmt::Display for RegistryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RegistryEventKind::Up => "up",
            RegistryEventKind::Down => "down",
            RegistryEventKind::Update => "update",
            RegistryEventKind::Leader => "leader",
            RegistryEventKind::ServiceMeta => "service_meta",
            RegistryEventKind::Current => "current",
        };
        f.write_str(s)
    }
}

/// Event published by the service registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEvent {
    pub kind: RegistryEventKind,

    /// Instance the event refers to, absent for service-level events
    #[serde(default)]
    pub instance: Option<Instance>,

    /// New service metadata for `ServiceMeta` events
    #[serde(default)]
    pub service_meta: Option<ServiceMeta>,
}

impl RegistryEvent {
    pub fn instance(kind: RegistryEventKind, instance: Instance) -> Self {
        Self {
            kind,
            instance: Some(instance),
            service_meta: None,
        }
    }

    pub fn up(instance: Instance) -> Self {
        Self::instance(RegistryEventKind::Up, instance)
    }

    pub fn down(instance: Instance) -> Self {
        Self::instance(RegistryEventKind::Down, instance)
    }

    pub fn update(instance: Instance) -> Self {
        Self::instance(RegistryEventKind::Update, instance)
    }

    pub fn service_meta(meta: ServiceMeta) -> Self {
        Self {
            kind: RegistryEventKind::ServiceMeta,
            instance: None,
            service_meta: Some(meta),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// JOB EVENTS
// ═══════════════════════════════════════════════════════════════════

/// Lifecycle state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Starting,
    Up,
    Stopping,
    Down,
    Crashed,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Starting => "starting",
            JobState::Up => "up",
            JobState::Stopping => "stopping",
            JobState::Down => "down",
            JobState::Crashed => "crashed",
            JobState::Failed => "failed",
        }
    }

    /// Whether the job exited abnormally
    pub fn is_failure(&self) -> bool {
        matches!(self, JobState::Crashed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown job state
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown job state: {0}")]
pub struct ParseJobStateError(String);

impl FromStr for JobState {
    type Err = ParseJobStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "starting" => Ok(JobState::Starting),
            "up" => Ok(JobState::Up),
            "stopping" => Ok(JobState::Stopping),
            "down" => Ok(JobState::Down),
            "crashed" => Ok(JobState::Crashed),
            "failed" => Ok(JobState::Failed),
            other => Err(ParseJobStateError(other.to_string())),
        }
    }
}

/// The job a lifecycle event refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub release_id: ReleaseId,
}

/// Job lifecycle event published by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEvent {
    pub job_id: JobId,

    /// Process type of the job
    #[serde(rename = "type")]
    pub process_type: String,

    pub state: JobState,

    pub job: Job,
}

impl JobEvent {
    pub fn new(
        job_id: JobId,
        release_id: ReleaseId,
        process_type: impl Into<String>,
        state: JobState,
    ) -> Self {
        Self {
            job_id,
            process_type: process_type.into(),
            state,
            job: Job { release_id },
        }
    }

    /// Whether this event is about a job of `process_type` from `release_id`
    pub fn is_for(&self, release_id: &ReleaseId, process_type: &str) -> bool {
        &self.job.release_id == release_id && self.process_type == process_type
    }
}

// ═══════════════════════════════════════════════════════════════════
// DEPLOYMENT EVENTS
// ═══════════════════════════════════════════════════════════════════

/// Progress record emitted while a deployment runs
///
/// Append-only: once emitted an event is never retracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentEvent {
    pub release_id: ReleaseId,
    pub job_type: String,
    pub job_state: JobState,
}

impl DeploymentEvent {
    pub fn new(release_id: ReleaseId, job_type: impl Into<String>, job_state: JobState) -> Self {
        Self {
            release_id,
            job_type: job_type.into(),
            job_state,
        }
    }
}

impl fmt::Display for DeploymentEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.release_id, self.job_type, self.job_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_state_parse() {
        assert_eq!("down".parse::<JobState>().unwrap(), JobState::Down);
        assert!("exploded".parse::<JobState>().is_err());
        assert!(JobState::Crashed.is_failure());
        assert!(!JobState::Up.is_failure());
    }

    #[test]
    fn test_job_event_wire_format() {
        let event: JobEvent = serde_json::from_str(
            r#"{"job_id":"j1","type":"postgres","state":"down","job":{"release_id":"r1"}}"#,
        )
        .unwrap();
        assert_eq!(event.state, JobState::Down);
        assert!(event.is_for(&ReleaseId::new("r1"), "postgres"));
        assert!(!event.is_for(&ReleaseId::new("r2"), "postgres"));
        assert!(!event.is_for(&ReleaseId::new("r1"), "web"));
    }

    #[test]
    fn test_registry_event_kind_any() {
        let kind = RegistryEventKind::Update;
        assert!(kind.is_any(&[RegistryEventKind::Up, RegistryEventKind::Update]));
        assert!(!kind.is_any(&[RegistryEventKind::Down]));
    }
}
