//! Storage backends for rlvault.
//!
//! Implements the `StorageBackendPort` from `rlvault-core` for the local
//! filesystem and S3-compatible object storage, plus an in-memory backend
//! for tests. `backend_for` constructs the right one from configuration.

use std::sync::Arc;

use rlvault_core::{CollectResult, StorageBackendPort, StorageTarget};

pub mod local;
pub mod memory;
pub mod s3;

pub use local::LocalBackend;
pub use memory::MemoryBackend;
pub use s3::S3Backend;

/// Construct the storage backend selected by configuration.
pub fn backend_for(target: &StorageTarget) -> CollectResult<Arc<dyn StorageBackendPort>> {
    match target {
        StorageTarget::Local { base_dir } => Ok(Arc::new(LocalBackend::new(base_dir))),
        StorageTarget::S3 {
            bucket,
            region,
            prefix,
        } => Ok(Arc::new(S3Backend::new(
            bucket.as_str(),
            region.as_str(),
            prefix.clone(),
        )?)),
    }
}

// Dev-dependencies exercised only inside unit tests
#[cfg(test)]
use tokio_test as _;
