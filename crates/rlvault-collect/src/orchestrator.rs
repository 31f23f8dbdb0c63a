//! Download orchestration.
//!
//! Drives one collection job end to end: credential check, tree expansion,
//! partition against the registration store, then a bounded worker pool
//! downloading everything that is not already done. The orchestrator owns
//! no queue state; each worker gets a value-type job and cloned Arcs, and
//! outcomes flow back through the join set.

use std::sync::Arc;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use rlvault_bc::RateLimiter;
use rlvault_core::{
    ApiClientPort, CollectError, CollectResult, CollectionConfig, DownloadStatus, FailedReplay,
    GroupId, JobResult, RegistrationStorePort, ReplayId, ReplayParserPort, StorageBackendPort,
};

use crate::expander::GroupTreeExpander;
use crate::progress::{CollectionProgress, Phase};
use crate::worker::{run_job, JobOutcome, WorkerDeps};

/// Tuning for one orchestrator instance.
#[derive(Clone, Copy, Debug)]
pub struct OrchestratorOptions {
    /// Bounded worker pool size.
    pub worker_concurrency: usize,
    /// Permanent-failure attempt ceiling per replay.
    pub max_attempts: u32,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            worker_concurrency: rlvault_core::DEFAULT_WORKER_CONCURRENCY,
            max_attempts: rlvault_core::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl OrchestratorOptions {
    #[must_use]
    pub const fn from_config(config: &CollectionConfig) -> Self {
        Self {
            worker_concurrency: config.worker_concurrency,
            max_attempts: config.max_attempts,
        }
    }
}

/// Orchestrates rate-limited bulk collection of a group tree.
pub struct DownloadOrchestrator {
    api: Arc<dyn ApiClientPort>,
    store: Arc<dyn RegistrationStorePort>,
    storage: Arc<dyn StorageBackendPort>,
    parser: Option<Arc<dyn ReplayParserPort>>,
    limiter: Option<Arc<RateLimiter>>,
    options: OrchestratorOptions,
    progress_tx: watch::Sender<CollectionProgress>,
}

impl std::fmt::Debug for DownloadOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadOrchestrator")
            .field("parser", &self.parser.is_some())
            .field("limiter", &self.limiter.is_some())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl DownloadOrchestrator {
    pub fn new(
        api: Arc<dyn ApiClientPort>,
        store: Arc<dyn RegistrationStorePort>,
        storage: Arc<dyn StorageBackendPort>,
        options: OrchestratorOptions,
    ) -> Self {
        let (progress_tx, _) = watch::channel(CollectionProgress::default());
        Self {
            api,
            store,
            storage,
            parser: None,
            limiter: None,
            options,
            progress_tx,
        }
    }

    /// Attach a downstream parsing-engine handoff.
    #[must_use]
    pub fn with_parser(mut self, parser: Arc<dyn ReplayParserPort>) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Attach the shared rate limiter so its window budget survives
    /// restarts through the registration store.
    #[must_use]
    pub fn with_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Subscribe to progress snapshots for the lifetime of this instance.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CollectionProgress> {
        self.progress_tx.subscribe()
    }

    /// Collect every replay under `root` that is not already completed.
    ///
    /// Idempotent: a second run over the same tree skips everything the
    /// first run completed. Fails fast on a rejected credential or a
    /// registration-store failure; per-replay failures are recorded in the
    /// result and do not abort the job.
    pub async fn collect_group(
        &self,
        root: &GroupId,
        cancel: CancellationToken,
    ) -> CollectResult<JobResult> {
        self.run(root, cancel, false).await
    }

    /// Re-attempt only the replays under `root` whose last run failed.
    ///
    /// Walks the tree again (listing calls are rate-limited as usual) but
    /// dispatches only references whose record is currently `Failed`.
    pub async fn retry_failed(
        &self,
        root: &GroupId,
        cancel: CancellationToken,
    ) -> CollectResult<JobResult> {
        self.run(root, cancel, true).await
    }

    async fn run(
        &self,
        root: &GroupId,
        cancel: CancellationToken,
        only_failed: bool,
    ) -> CollectResult<JobResult> {
        self.api.ping().await?;

        if let Some(limiter) = &self.limiter {
            if let Ok(Some(budget)) = self.store.load_rate_budget().await {
                limiter.restore(&budget);
            }
        }

        self.progress_tx.send_modify(|p| {
            *p = CollectionProgress {
                phase: Phase::Expanding,
                ..CollectionProgress::default()
            };
        });

        let expander = GroupTreeExpander::new(Arc::clone(&self.api));
        let expansion = tokio::select! {
            biased;

            () = cancel.cancelled() => {
                return Ok(JobResult { cancelled: true, ..JobResult::default() });
            }

            expansion = expander.expand(root) => expansion?,
        };

        for (group, replay_count) in &expansion.groups {
            self.store.record_group_sync(group, *replay_count).await?;
        }
        info!(
            root = %root,
            groups = expansion.groups.len(),
            replays = expansion.replays.len(),
            cycles = expansion.cycles.len(),
            "group tree expanded"
        );

        let discovered = expansion.replays.len() as u64;
        let mut result = JobResult::default();
        let mut work = Vec::new();
        for reference in expansion.replays {
            if self.store.is_completed(&reference.id).await? {
                result.skipped += 1;
                continue;
            }
            self.store.register(&reference).await?;
            if only_failed && !self.is_failed(&reference.id).await? {
                result.skipped += 1;
                continue;
            }
            work.push(reference);
        }
        self.progress_tx.send_modify(|p| {
            p.phase = Phase::Downloading;
            p.discovered = discovered;
            p.skipped = result.skipped;
        });

        let deps = WorkerDeps {
            api: Arc::clone(&self.api),
            store: Arc::clone(&self.store),
            storage: Arc::clone(&self.storage),
            parser: self.parser.clone(),
            max_attempts: self.options.max_attempts,
        };
        let semaphore = Arc::new(Semaphore::new(self.options.worker_concurrency));
        let mut join_set: JoinSet<(ReplayId, JobOutcome)> = JoinSet::new();
        for reference in work {
            let deps = deps.clone();
            let cancel = cancel.clone();
            let semaphore = Arc::clone(&semaphore);
            let id = reference.id.clone();
            join_set.spawn(async move {
                let permit = tokio::select! {
                    biased;

                    () = cancel.cancelled() => None,

                    permit = semaphore.acquire_owned() => permit.ok(),
                };
                if permit.is_none() {
                    return (id, JobOutcome::Cancelled);
                }
                let outcome = run_job(reference, deps, cancel).await;
                (id, outcome)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            let (id, outcome) = joined
                .map_err(|e| CollectError::registry(format!("worker task panicked: {e}")))?;
            match outcome {
                JobOutcome::Completed { bytes } => {
                    result.attempted += 1;
                    result.succeeded += 1;
                    result.total_bytes += bytes;
                    self.progress_tx.send_modify(|p| {
                        p.succeeded += 1;
                        p.total_bytes += bytes;
                    });
                }
                JobOutcome::AlreadyStored => {
                    result.skipped += 1;
                    self.progress_tx.send_modify(|p| p.skipped += 1);
                }
                JobOutcome::Cancelled => {
                    result.cancelled = true;
                }
                JobOutcome::Failed { error } => {
                    result.attempted += 1;
                    result.failed += 1;
                    result.failures.push(FailedReplay {
                        replay_id: id,
                        error_class: error.error_class().to_string(),
                        message: error.to_string(),
                    });
                    self.progress_tx.send_modify(|p| p.failed += 1);
                    if error.is_fatal() {
                        warn!(error = %error, "fatal failure, cancelling remaining work");
                        cancel.cancel();
                    }
                }
            }
        }

        if cancel.is_cancelled() {
            result.cancelled = true;
        }

        if let Some(limiter) = &self.limiter {
            // Budget snapshot is best effort; losing it only means the
            // next run starts a conservative fresh window
            if let Err(e) = self.store.save_rate_budget(&limiter.budget()).await {
                warn!(error = %e, "failed to persist rate budget");
            }
        }

        self.progress_tx.send_modify(|p| p.phase = Phase::Finished);
        info!(
            succeeded = result.succeeded,
            failed = result.failed,
            skipped = result.skipped,
            cancelled = result.cancelled,
            "collection finished"
        );
        Ok(result)
    }

    async fn is_failed(&self, id: &ReplayId) -> CollectResult<bool> {
        let record = self.store.get_record(id).await?;
        Ok(record.is_some_and(|r| r.status == DownloadStatus::Failed))
    }
}
