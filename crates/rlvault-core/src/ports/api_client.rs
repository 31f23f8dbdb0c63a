//! Remote API client port.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::Stream;
use std::pin::Pin;

use crate::domain::{Group, GroupId, ReplayId, ReplayReference};
use crate::error::CollectResult;

/// Stream of replay file bytes as yielded by the remote API.
pub type ReplayByteStream = Pin<Box<dyn Stream<Item = CollectResult<Bytes>> + Send>>;

/// Port trait for the remote replay API.
///
/// Implemented by `rlvault-bc`. Every operation passes through the global
/// rate limiter before touching the network; no component may reach the
/// remote API any other way.
///
/// Listing operations hide pagination: they issue one rate-limited call per
/// page and return the concatenation.
#[async_trait]
pub trait ApiClientPort: Send + Sync {
    /// Verify the configured credential against the API.
    ///
    /// Fails with `CollectError::Auth` when the key is rejected, which
    /// aborts the job before any work is scheduled.
    async fn ping(&self) -> CollectResult<()>;

    /// Fetch metadata for a single group.
    async fn get_group(&self, id: &GroupId) -> CollectResult<Group>;

    /// List the immediate child groups of a group, across all pages.
    async fn list_child_groups(&self, id: &GroupId) -> CollectResult<Vec<Group>>;

    /// List the replay references directly contained in a group, across all
    /// pages. Non-recursive; tree expansion drives the recursion.
    async fn list_group_replays(&self, id: &GroupId) -> CollectResult<Vec<ReplayReference>>;

    /// Fetch metadata for a single replay.
    async fn get_replay(&self, id: &ReplayId) -> CollectResult<ReplayReference>;

    /// Fetch a replay's raw bytes as a stream.
    async fn download_replay(&self, id: &ReplayId) -> CollectResult<ReplayByteStream>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    // Verify the trait is object-safe
    fn _assert_object_safe(_: Arc<dyn ApiClientPort>) {}
}
