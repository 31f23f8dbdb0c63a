//! Downstream parsing-engine handoff boundary.
//!
//! Replay decoding lives outside this system. The orchestrator only
//! guarantees the bytes are durably stored and registered before handing
//! off; it performs no validation of replay content.

use async_trait::async_trait;

use crate::domain::ReplayId;
use crate::error::CollectResult;

/// Port for the external parsing engine.
///
/// Invoked (when wired) after a replay is marked completed. Failures here
/// are soft: the download remains completed and registered either way.
#[async_trait]
pub trait ReplayParserPort: Send + Sync {
    /// Hand off a completed replay by its storage location.
    async fn ingest_completed(&self, id: &ReplayId, location: &str) -> CollectResult<()>;
}
