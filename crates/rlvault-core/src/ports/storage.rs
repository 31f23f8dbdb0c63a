//! Storage backend port.
//!
//! Capability-set abstraction over "write bytes under a key": the local
//! filesystem and object-storage variants in `rlvault-storage` implement
//! this, selected at construction time from configuration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::api_client::ReplayByteStream;
use crate::error::CollectResult;

/// Result of a completed storage write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrittenObject {
    /// Final location of the object (absolute path or bucket URL).
    pub location: String,
    /// Bytes written.
    pub bytes_written: u64,
}

/// Aggregate statistics for objects under a key prefix.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStats {
    /// Number of objects under the prefix.
    pub object_count: u64,
    /// Total bytes under the prefix.
    pub total_bytes: u64,
}

/// Port trait for replay byte storage.
///
/// `write` is idempotent from the caller's perspective: writing the same key
/// twice yields the same final location. The local variant additionally
/// guarantees a crash mid-write never leaves a partial file visible under
/// the final name (temp file + atomic rename).
#[async_trait]
pub trait StorageBackendPort: Send + Sync {
    /// Write a byte stream under a key, creating intermediate structure as
    /// needed. Returns the final location and byte count.
    async fn write(&self, key: &str, data: ReplayByteStream) -> CollectResult<WrittenObject>;

    /// Whether an object already exists under the key.
    async fn exists(&self, key: &str) -> CollectResult<bool>;

    /// Size in bytes of the object under the key, or `None` if absent.
    async fn size_of(&self, key: &str) -> CollectResult<Option<u64>>;

    /// List keys under a prefix.
    async fn list(&self, prefix: &str) -> CollectResult<Vec<String>>;

    /// Aggregate statistics for objects under a prefix.
    async fn stats(&self, prefix: &str) -> CollectResult<StorageStats>;
}
