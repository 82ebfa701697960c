//! Cluster-state decoding and deploy preconditions
//!
//! A replicated deployment only starts from a converged cluster: the
//! snapshot must name a primary, account for every expected process, and
//! no instance of the new release may be running yet.

use crate::error::{DeploymentError, Result};
use quorum_types::{ServiceMeta, Topology};
use tracing::{error, info};

/// Decode the cluster-state snapshot published by the stateful service
pub fn decode(meta: Option<&ServiceMeta>) -> Result<Topology> {
    let meta = meta.ok_or_else(|| {
        error!("Missing cluster state");
        DeploymentError::MissingState
    })?;

    info!(index = meta.index, "Decoding cluster state");
    let topology: Topology = serde_json::from_slice(&meta.data).map_err(|e| {
        error!(error = %e, "Error decoding cluster state");
        DeploymentError::Decode(e)
    })?;

    info!(
        sequence = topology.sequence,
        primary = topology.primary.as_ref().map(|i| i.addr.as_str()).unwrap_or(""),
        sync = topology.sync.as_ref().map(|i| i.addr.as_str()).unwrap_or(""),
        asyncs = topology.asyncs.len(),
        "Decoded cluster state"
    );

    Ok(topology)
}

/// Check that a deployment may start from `topology`
///
/// `expected` is the expected instance count of the stateful role and
/// `running_new` the number of new-release instances already requested.
pub fn validate(topology: &Topology, expected: u32, running_new: u32) -> Result<()> {
    if topology.primary.is_none() {
        error!("Cluster state has no primary");
        return Err(DeploymentError::NoPrimary);
    }

    let actual = topology.size() as u32;
    if actual != expected {
        error!(expected, actual, "Cluster state does not match expected processes");
        return Err(DeploymentError::ProcessCountMismatch { expected, actual });
    }

    if running_new > 0 {
        error!(running = running_new, "Cluster in unexpected state");
        return Err(DeploymentError::AlreadyDeploying {
            running: running_new,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_types::Instance;

    fn snapshot(json: &str) -> ServiceMeta {
        ServiceMeta::new(json.as_bytes().to_vec())
    }

    fn converged() -> Topology {
        decode(Some(&snapshot(
            r#"{
                "sequence": 12,
                "primary": {"id": "p", "addr": "10.0.0.1:5433"},
                "sync": {"id": "s", "addr": "10.0.0.2:5433"},
                "async": [
                    {"id": "a0", "addr": "10.0.0.3:5433", "index": 3},
                    {"id": "a1", "addr": "10.0.0.4:5433", "index": 4}
                ],
                "initWAL": "0/3000060"
            }"#,
        )))
        .unwrap()
    }

    #[test]
    fn test_decode_snapshot() {
        let topology = converged();
        assert_eq!(topology.sequence, 12);
        assert_eq!(topology.primary.as_ref().unwrap().id.as_str(), "p");
        assert_eq!(topology.asyncs.len(), 2);
        assert_eq!(topology.asyncs[1].index, 4);
        assert!(topology.deposed.is_empty());
    }

    #[test]
    fn test_decode_missing_state() {
        assert!(matches!(decode(None), Err(DeploymentError::MissingState)));
    }

    #[test]
    fn test_decode_garbage() {
        let result = decode(Some(&snapshot("not json")));
        assert!(matches!(result, Err(DeploymentError::Decode(_))));
    }

    #[test]
    fn test_validate_clean_topology() {
        assert!(validate(&converged(), 4, 0).is_ok());
    }

    #[test]
    fn test_validate_no_primary() {
        let mut topology = converged();
        topology.primary = None;
        assert!(matches!(
            validate(&topology, 3, 0),
            Err(DeploymentError::NoPrimary)
        ));
    }

    #[test]
    fn test_validate_count_mismatch() {
        let mut topology = converged();
        topology
            .asyncs
            .push(Instance::new("a2", "10.0.0.5:5433"));
        assert!(matches!(
            validate(&topology, 4, 0),
            Err(DeploymentError::ProcessCountMismatch {
                expected: 4,
                actual: 5
            })
        ));
    }

    #[test]
    fn test_validate_already_deploying() {
        assert!(matches!(
            validate(&converged(), 4, 1),
            Err(DeploymentError::AlreadyDeploying { running: 1 })
        ));
    }
}
