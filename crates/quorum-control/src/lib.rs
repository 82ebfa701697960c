//! Quorum Control - Control-plane client traits and implementations
//!
//! A deployment talks to two external systems besides the event streams:
//!
//! - **FormationClient**: The release/formation control API, which accepts
//!   desired process counts for a release
//! - **ReplicaManager**: The management endpoint of a stateful instance,
//!   used to stop the service cleanly before its job goes away
//!
//! ## In-Memory vs Remote
//!
//! The crate provides in-memory implementations suitable for development and
//! testing. Production hosts wrap their control API and management clients
//! behind the same traits.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod formation;
pub mod memory;
pub mod replica;

// Re-exports
pub use error::{ControlError, Result};
pub use formation::FormationClient;
pub use memory::{InMemoryFormationClient, InMemoryReplicaManager};
pub use replica::ReplicaManager;
