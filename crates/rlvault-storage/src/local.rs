//! Local filesystem storage backend.
//!
//! Keys map directly to paths under a base directory. Writes go to a
//! temporary sibling first and are renamed into place after an fsync, so
//! a crash mid-write never leaves a partial file under the final name.

use async_trait::async_trait;
use futures::StreamExt;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use rlvault_core::{
    CollectError, CollectResult, ReplayByteStream, StorageBackendPort, StorageStats, WrittenObject,
};

/// Storage backend writing replay files under a local base directory.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    base_dir: PathBuf,
}

impl LocalBackend {
    /// Create a backend rooted at `base_dir`. The directory is created on
    /// first write, not here.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Resolve a key to a path, rejecting traversal outside the base.
    fn path_for(&self, key: &str) -> CollectResult<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(CollectError::storage(format!("invalid storage key '{key}'")));
        }
        Ok(self.base_dir.join(relative))
    }

    /// Walk every file under `prefix`, returning relative keys and sizes.
    async fn walk(&self, prefix: &str) -> CollectResult<Vec<(String, u64)>> {
        let root = if prefix.is_empty() {
            self.base_dir.clone()
        } else {
            self.path_for(prefix)?
        };
        if !fs::try_exists(&root).await.map_err(io_error)? {
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        let mut stack = vec![root];
        while let Some(dir) = stack.pop() {
            let mut entries = fs::read_dir(&dir).await.map_err(io_error)?;
            while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
                let path = entry.path();
                let metadata = entry.metadata().await.map_err(io_error)?;
                if metadata.is_dir() {
                    stack.push(path);
                } else if let Ok(relative) = path.strip_prefix(&self.base_dir) {
                    let key = relative
                        .components()
                        .filter_map(|c| c.as_os_str().to_str())
                        .collect::<Vec<_>>()
                        .join("/");
                    found.push((key, metadata.len()));
                }
            }
        }
        found.sort();
        Ok(found)
    }
}

fn io_error(e: std::io::Error) -> CollectError {
    CollectError::storage(e.to_string())
}

#[async_trait]
impl StorageBackendPort for LocalBackend {
    async fn write(&self, key: &str, mut data: ReplayByteStream) -> CollectResult<WrittenObject> {
        let final_path = self.path_for(key)?;
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).await.map_err(io_error)?;
        }

        let tmp_path = final_path.with_extension("replay.tmp");
        let result = async {
            let mut file = fs::File::create(&tmp_path).await.map_err(io_error)?;
            let mut bytes_written: u64 = 0;
            while let Some(chunk) = data.next().await {
                let chunk = chunk?;
                file.write_all(&chunk).await.map_err(io_error)?;
                bytes_written += chunk.len() as u64;
            }
            file.sync_all().await.map_err(io_error)?;
            drop(file);
            fs::rename(&tmp_path, &final_path).await.map_err(io_error)?;
            Ok(bytes_written)
        }
        .await;

        match result {
            Ok(bytes_written) => {
                debug!(key, bytes = bytes_written, "wrote replay file");
                Ok(WrittenObject {
                    location: final_path.to_string_lossy().into_owned(),
                    bytes_written,
                })
            }
            Err(e) => {
                // The temp file is garbage at this point; the final name
                // was never touched
                let _ = fs::remove_file(&tmp_path).await;
                Err(e)
            }
        }
    }

    async fn exists(&self, key: &str) -> CollectResult<bool> {
        let path = self.path_for(key)?;
        fs::try_exists(&path).await.map_err(io_error)
    }

    async fn size_of(&self, key: &str) -> CollectResult<Option<u64>> {
        let path = self.path_for(key)?;
        match fs::metadata(&path).await {
            Ok(metadata) => Ok(Some(metadata.len())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(e)),
        }
    }

    async fn list(&self, prefix: &str) -> CollectResult<Vec<String>> {
        Ok(self.walk(prefix).await?.into_iter().map(|(k, _)| k).collect())
    }

    async fn stats(&self, prefix: &str) -> CollectResult<StorageStats> {
        let files = self.walk(prefix).await?;
        Ok(StorageStats {
            object_count: files.len() as u64,
            total_bytes: files.iter().map(|(_, size)| size).sum(),
        })
    }
}
