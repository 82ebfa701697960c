//! Quorum Deployment Engine
//!
//! Rolls an application from one release to another without losing write
//! availability of its replicated stateful service.
//!
//! The stateful role runs as a primary, a synchronous standby and zero or
//! more asynchronous replicas. The `replicated` strategy replaces those
//! members one at a time (asyncs, then the sync, then the primary), waiting
//! for each old instance to leave the registry and for each new instance to
//! report that it joined the replica set. It then scales the old release's
//! role to zero and deploys every other process type one at a time.
//!
//! ## Collaborators
//!
//! A deployment is driven entirely through its [`DeploymentContext`]:
//!
//! - formation updates go to a `quorum_control::FormationClient`
//! - clean shutdowns go to a `quorum_control::ReplicaManager`
//! - progress is observed on the registry and job event streams
//! - progress is reported as `DeploymentEvent`s on an unbounded channel
//!
//! ## Usage
//!
//! ```no_run
//! use quorum_control::{InMemoryFormationClient, InMemoryReplicaManager};
//! use quorum_deployment::{DeployerConfig, DeploymentContext, DeploymentManager};
//! use quorum_types::{AppId, Deployment, ProcessCounts, ReleaseId, ServiceMeta};
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut processes = ProcessCounts::new();
//! processes.insert("postgres".into(), 3);
//! processes.insert("web".into(), 2);
//!
//! let deployment = Deployment::new(
//!     AppId::new("app"),
//!     ReleaseId::new("r1"),
//!     ReleaseId::new("r2"),
//!     "replicated",
//!     processes,
//! );
//!
//! let (deploy_tx, _deploy_rx) = mpsc::unbounded_channel();
//! let (_service_tx, service_rx) = mpsc::channel(64);
//! let (_job_tx, job_rx) = mpsc::channel(64);
//!
//! let mut ctx = DeploymentContext::builder(deployment)
//!     .with_service_meta(ServiceMeta::new(b"{}".to_vec()))
//!     .with_formation_client(Arc::new(InMemoryFormationClient::new()))
//!     .with_replica_manager(Arc::new(InMemoryReplicaManager::new()))
//!     .with_deploy_events(deploy_tx)
//!     .with_service_events(service_rx)
//!     .with_job_events(job_rx)
//!     .build()?;
//!
//! let manager = DeploymentManager::new(DeployerConfig::load(None)?);
//! let summary = manager.execute(&mut ctx).await?;
//! println!("deployed in {:?}", summary.elapsed);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod config;
pub mod context;
pub mod error;
pub mod finalizer;
pub mod manager;
pub mod replacement;
pub mod sequencer;
pub mod strategies;
pub mod topology;

// Re-exports
pub use config::{DeployerConfig, StatefulRoleConfig, TimeoutConfig};
pub use context::{DeploymentContext, DeploymentContextBuilder};
pub use error::{DeploymentError, EventStream, ReplacementStage, Result};
pub use manager::{DeploymentManager, DeploymentSummary};
pub use replacement::InstanceReplacement;
pub use strategies::{
    create_executor, DeploymentExecutor, OneByOneDeploymentExecutor, ReplicatedDeploymentExecutor,
};
