//! Replacement sequencing
//!
//! Asyncs go first (oldest registration first), then the sync, then the
//! primary. Replacing asyncs never removes the synchronous standby, and the
//! primary is only cut over once a new-release sync and async set backs it.

use crate::config::{StatefulRoleConfig, TimeoutConfig};
use crate::context::DeploymentContext;
use crate::error::Result;
use crate::replacement::InstanceReplacement;
use quorum_types::Topology;
use tracing::info;

/// Replace every member of `topology`, one at a time
///
/// Stops at the first failure; members already replaced stay replaced.
/// Returns the number of replaced members.
pub async fn replace_all(
    ctx: &mut DeploymentContext,
    topology: &Topology,
    stateful: &StatefulRoleConfig,
    timeouts: &TimeoutConfig,
) -> Result<u32> {
    let mut replaced = 0;

    for (role, instance) in topology.replacement_order() {
        info!(role = %role, instance_id = %instance.id, "Replacing member");
        InstanceReplacement::new(instance, role, stateful, timeouts)
            .run(ctx)
            .await?;
        replaced += 1;
    }

    Ok(replaced)
}
