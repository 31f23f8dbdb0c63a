//! Download worker pipeline.
//!
//! A worker processes one replay reference end to end: registration-store
//! transitions, the storage double-check, the download itself, and the
//! optional parser handoff. It operates on a value-type reference and
//! cloned Arc dependencies, with no access to the orchestrator's state.
//!
//! Cancellation is checked between steps and raced against the download
//! itself; a cancelled worker downgrades its `InProgress` claim so the
//! next run picks the replay up again.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use rlvault_core::{
    ApiClientPort, CollectError, CollectResult, RegistrationStorePort, ReplayId, ReplayParserPort,
    ReplayReference, StorageBackendPort, WrittenObject,
};

/// Cloned Arc dependencies handed to each worker.
#[derive(Clone)]
pub(crate) struct WorkerDeps {
    pub api: Arc<dyn ApiClientPort>,
    pub store: Arc<dyn RegistrationStorePort>,
    pub storage: Arc<dyn StorageBackendPort>,
    pub parser: Option<Arc<dyn ReplayParserPort>>,
    /// Permanent-failure ceiling per replay within this job.
    pub max_attempts: u32,
}

/// Terminal outcome of one worker job.
#[derive(Debug)]
pub(crate) enum JobOutcome {
    /// Downloaded, stored, and registered.
    Completed { bytes: u64 },
    /// Found already present in storage; record healed to completed.
    AlreadyStored,
    /// Failed terminally after exhausting any retries.
    Failed { error: CollectError },
    /// Stopped by cancellation; the record was left resumable.
    Cancelled,
}

/// Run one replay download to a terminal outcome. Never panics and never
/// returns early with the record stuck in `InProgress`.
pub(crate) async fn run_job(
    reference: ReplayReference,
    deps: WorkerDeps,
    cancel: CancellationToken,
) -> JobOutcome {
    let id = reference.id.clone();
    let key = reference.storage_key(None);

    if cancel.is_cancelled() {
        return JobOutcome::Cancelled;
    }

    // Double-check storage before spending API budget: a previous run may
    // have written the file without living long enough to register it
    match deps.storage.size_of(&key).await {
        Ok(Some(size)) => {
            if let Err(error) = deps.store.mark_completed(&id, &key, size).await {
                return JobOutcome::Failed { error };
            }
            debug!(id = %id, key, "found in storage, healed registration");
            return JobOutcome::AlreadyStored;
        }
        Ok(None) => {}
        Err(error) => return JobOutcome::Failed { error },
    }

    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        if let Err(error) = deps.store.mark_in_progress(&id).await {
            return JobOutcome::Failed { error };
        }

        let result = tokio::select! {
            biased;

            () = cancel.cancelled() => Err(CollectError::Cancelled),

            result = download_and_store(&deps, &id, &key) => result,
        };

        match result {
            Ok(written) => {
                if let Err(error) = deps
                    .store
                    .mark_completed(&id, &written.location, written.bytes_written)
                    .await
                {
                    return JobOutcome::Failed { error };
                }
                if let Some(parser) = &deps.parser {
                    // Handoff is best effort; the download stands either way
                    if let Err(e) = parser.ingest_completed(&id, &written.location).await {
                        warn!(id = %id, error = %e, "parser handoff failed");
                    }
                }
                debug!(id = %id, bytes = written.bytes_written, "replay stored");
                return JobOutcome::Completed {
                    bytes: written.bytes_written,
                };
            }
            Err(error) if error.is_cancelled() => {
                let _ = deps.store.release_in_progress(&id).await;
                return JobOutcome::Cancelled;
            }
            Err(error) if error.is_retryable() && attempt < deps.max_attempts => {
                warn!(id = %id, attempt, error = %error, "download failed, retrying");
            }
            Err(error) => {
                let _ = deps
                    .store
                    .mark_failed(&id, error.error_class(), &error.to_string())
                    .await;
                return JobOutcome::Failed { error };
            }
        }
    }
}

async fn download_and_store(
    deps: &WorkerDeps,
    id: &ReplayId,
    key: &str,
) -> CollectResult<WrittenObject> {
    let stream = deps.api.download_replay(id).await?;
    deps.storage.write(key, stream).await
}
