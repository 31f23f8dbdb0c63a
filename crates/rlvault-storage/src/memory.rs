//! In-memory storage backend for tests.
//!
//! Implements the full port contract over a `HashMap`, letting orchestrator
//! tests assert on stored bytes without touching the filesystem.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use std::collections::HashMap;
use tokio::sync::RwLock;

use rlvault_core::{
    CollectResult, ReplayByteStream, StorageBackendPort, StorageStats, WrittenObject,
};

/// Storage backend keeping every object in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    objects: RwLock<HashMap<String, Bytes>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored bytes for a key, for test assertions.
    pub async fn get(&self, key: &str) -> Option<Bytes> {
        self.objects.read().await.get(key).cloned()
    }
}

#[async_trait]
impl StorageBackendPort for MemoryBackend {
    async fn write(&self, key: &str, mut data: ReplayByteStream) -> CollectResult<WrittenObject> {
        let mut buffer = BytesMut::new();
        while let Some(chunk) = data.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        let bytes_written = buffer.len() as u64;
        self.objects
            .write()
            .await
            .insert(key.to_string(), buffer.freeze());
        Ok(WrittenObject {
            location: format!("memory://{key}"),
            bytes_written,
        })
    }

    async fn exists(&self, key: &str) -> CollectResult<bool> {
        Ok(self.objects.read().await.contains_key(key))
    }

    async fn size_of(&self, key: &str) -> CollectResult<Option<u64>> {
        Ok(self
            .objects
            .read()
            .await
            .get(key)
            .map(|bytes| bytes.len() as u64))
    }

    async fn list(&self, prefix: &str) -> CollectResult<Vec<String>> {
        let mut keys: Vec<String> = self
            .objects
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn stats(&self, prefix: &str) -> CollectResult<StorageStats> {
        let objects = self.objects.read().await;
        let mut stats = StorageStats::default();
        for (key, bytes) in objects.iter() {
            if key.starts_with(prefix) {
                stats.object_count += 1;
                stats.total_bytes += bytes.len() as u64;
            }
        }
        Ok(stats)
    }
}
