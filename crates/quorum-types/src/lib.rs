//! Quorum Types - Core types for replicated service deployments
//!
//! Quorum rolls a replicated, role-based stateful service (one primary, an
//! optional sync replica and any number of async replicas) from one release
//! to the next without ever leaving the cluster without a primary.
//!
//! ## Key Concepts
//!
//! - **Instance**: A registered process as published by the service registry
//! - **Topology**: The primary/sync/async arrangement of the stateful role
//! - **Formation**: Desired process counts for one release of an application
//! - **Deployment**: The old release, the new release and the expected counts
//! - **Events**: Registry events and job events flow in, deployment events flow out

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod deployment;
pub mod events;
pub mod formation;
pub mod ids;
pub mod instance;
pub mod topology;

// Re-export main types
pub use deployment::Deployment;
pub use events::{
    DeploymentEvent, Job, JobEvent, JobState, ParseJobStateError, RegistryEvent,
    RegistryEventKind,
};
pub use formation::{Formation, ProcessCounts};
pub use ids::{AppId, DeploymentId, InstanceId, JobId, ReleaseId};
pub use instance::{Instance, ServiceMeta, JOB_ID_KEY, PROCESS_TYPE_KEY, RELEASE_ID_KEY};
pub use topology::{ReplicaRole, Topology};
