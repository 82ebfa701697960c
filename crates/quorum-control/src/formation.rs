//! Formation control trait
//!
//! The FormationClient submits desired process counts to the control API.

use crate::error::Result;
use async_trait::async_trait;
use quorum_types::Formation;

/// Client for the release/formation control API
#[async_trait]
pub trait FormationClient: Send + Sync {
    /// Replace the desired counts for `formation.release_id`
    ///
    /// Returns once the API accepted the document; it does not wait for the
    /// scheduler to converge.
    async fn put_formation(&self, formation: &Formation) -> Result<()>;
}
