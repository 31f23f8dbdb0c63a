//! S3-compatible object storage backend.
//!
//! Uploads stream through multipart puts, so a replay is buffered in
//! memory only one part at a time and an interrupted upload never becomes
//! visible under the final key. Credentials come from the standard AWS
//! environment (env vars, profiles, instance metadata).

use async_trait::async_trait;
use futures::StreamExt;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, WriteMultipart};
use tracing::debug;

use rlvault_core::{
    CollectError, CollectResult, ReplayByteStream, StorageBackendPort, StorageStats, WrittenObject,
};

/// Storage backend writing replay files to an S3 bucket.
pub struct S3Backend {
    store: AmazonS3,
    bucket: String,
    prefix: Option<String>,
}

impl S3Backend {
    /// Create a backend for the given bucket and region.
    ///
    /// `prefix` places every key under a folder inside the bucket.
    pub fn new(
        bucket: impl Into<String>,
        region: impl Into<String>,
        prefix: Option<String>,
    ) -> CollectResult<Self> {
        let bucket = bucket.into();
        let store = AmazonS3Builder::from_env()
            .with_bucket_name(&bucket)
            .with_region(region.into())
            .build()
            .map_err(|e| CollectError::config(format!("building S3 client: {e}")))?;
        Ok(Self {
            store,
            bucket,
            prefix: prefix.filter(|p| !p.is_empty()),
        })
    }

    fn object_path(&self, key: &str) -> CollectResult<ObjectPath> {
        ObjectPath::parse(join_key(self.prefix.as_deref(), key))
            .map_err(|e| CollectError::storage(format!("invalid object key '{key}': {e}")))
    }

    /// Map an absolute bucket key back into the caller's key namespace.
    fn relative_key(&self, path: &ObjectPath) -> String {
        strip_prefix(self.prefix.as_deref(), path.as_ref())
    }
}

fn join_key(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}/{key}", prefix.trim_matches('/')),
        None => key.to_string(),
    }
}

fn strip_prefix(prefix: Option<&str>, full: &str) -> String {
    match prefix {
        Some(prefix) => full
            .strip_prefix(prefix.trim_matches('/'))
            .map_or_else(|| full.to_string(), |s| s.trim_start_matches('/').to_string()),
        None => full.to_string(),
    }
}

fn store_error(e: object_store::Error) -> CollectError {
    CollectError::storage(e.to_string())
}

#[async_trait]
impl StorageBackendPort for S3Backend {
    async fn write(&self, key: &str, mut data: ReplayByteStream) -> CollectResult<WrittenObject> {
        let path = self.object_path(key)?;
        let upload = self
            .store
            .put_multipart(&path)
            .await
            .map_err(store_error)?;
        let mut writer = WriteMultipart::new(upload);

        let mut bytes_written: u64 = 0;
        while let Some(chunk) = data.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    // Abort discards already-uploaded parts server-side
                    writer.abort().await.map_err(store_error)?;
                    return Err(e);
                }
            };
            bytes_written += chunk.len() as u64;
            writer.write(&chunk);
        }
        writer.finish().await.map_err(store_error)?;

        debug!(key, bytes = bytes_written, bucket = %self.bucket, "uploaded replay");
        Ok(WrittenObject {
            location: format!("s3://{}/{}", self.bucket, path.as_ref()),
            bytes_written,
        })
    }

    async fn exists(&self, key: &str) -> CollectResult<bool> {
        Ok(self.size_of(key).await?.is_some())
    }

    async fn size_of(&self, key: &str) -> CollectResult<Option<u64>> {
        let path = self.object_path(key)?;
        match self.store.head(&path).await {
            Ok(meta) => Ok(Some(u64::try_from(meta.size).unwrap_or(u64::MAX))),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(store_error(e)),
        }
    }

    async fn list(&self, prefix: &str) -> CollectResult<Vec<String>> {
        let list_under = self.object_path(prefix).ok();
        let mut stream = self.store.list(list_under.as_ref());
        let mut keys = Vec::new();
        while let Some(meta) = stream.next().await {
            let meta = meta.map_err(store_error)?;
            keys.push(self.relative_key(&meta.location));
        }
        keys.sort();
        Ok(keys)
    }

    async fn stats(&self, prefix: &str) -> CollectResult<StorageStats> {
        let list_under = self.object_path(prefix).ok();
        let mut stream = self.store.list(list_under.as_ref());
        let mut stats = StorageStats::default();
        while let Some(meta) = stream.next().await {
            let meta = meta.map_err(store_error)?;
            stats.object_count += 1;
            stats.total_bytes += u64::try_from(meta.size).unwrap_or(0);
        }
        Ok(stats)
    }
}
