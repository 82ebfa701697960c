//! Deployment error types
//!
//! Every error is terminal for the deployment that raised it: nothing is
//! retried and nothing already started is rolled back.

use quorum_control::ControlError;
use quorum_types::{InstanceId, JobId, JobState, ReleaseId};
use std::fmt;
use thiserror::Error;

/// Stage of an instance replacement that can time out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplacementStage {
    /// Waiting for the old instance to leave the registry
    Stop,
    /// Waiting for the new instance to report ready
    Start,
}

impl fmt::Display for ReplacementStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplacementStage::Stop => f.write_str("stop"),
            ReplacementStage::Start => f.write_str("start"),
        }
    }
}

/// Event stream a deployment consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStream {
    /// Service registry events
    Service,
    /// Job lifecycle events
    Job,
}

impl fmt::Display for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventStream::Service => f.write_str("service"),
            EventStream::Job => f.write_str("job"),
        }
    }
}

/// Deployment errors
#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error("Error decoding cluster state: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Missing cluster state")]
    MissingState,

    #[error("Cluster state has no primary")]
    NoPrimary,

    #[error("Cluster state does not match expected processes: expected {expected}, found {actual}")]
    ProcessCountMismatch { expected: u32, actual: u32 },

    #[error("Cluster in unexpected state: {running} instances of the new release already running")]
    AlreadyDeploying { running: u32 },

    #[error("Error stopping instance {instance_id}: {source}")]
    Stop {
        instance_id: InstanceId,
        #[source]
        source: ControlError,
    },

    #[error("Error scaling formation of release {release_id}: {source}")]
    Scale {
        release_id: ReleaseId,
        #[source]
        source: ControlError,
    },

    #[error("Timed out waiting for instance to {stage}")]
    ReplacementTimeout { stage: ReplacementStage },

    #[error("Timed out waiting for job down events: expected {expected}, observed {observed}")]
    FinalizationTimeout { expected: u32, observed: u32 },

    #[error("Unexpected close of {stream} event stream")]
    UnexpectedStreamClose { stream: EventStream },

    #[error("Timed out waiting for {process_type} job event of release {release_id}")]
    JobEventTimeout {
        release_id: ReleaseId,
        process_type: String,
    },

    #[error("Job {job_id} entered state {state}")]
    JobFailed { job_id: JobId, state: JobState },

    #[error("Unknown deployment strategy: {0}")]
    UnknownStrategy(String),

    #[error("Missing deployment component: {0}")]
    MissingComponent(&'static str),
}

/// Result type for deployment operations
pub type Result<T> = std::result::Result<T, DeploymentError>;
