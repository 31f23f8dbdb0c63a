//! Progress reporting for collection jobs.
//!
//! Consumers subscribe through a `watch` channel: they always see the
//! latest snapshot and slow readers never block the workers.

/// Phase of the running collection job.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    /// Walking the group tree and listing replays.
    Expanding,
    /// Workers downloading and storing replay files.
    Downloading,
    /// Job finished (successfully, cancelled, or aborted).
    Finished,
}

/// Snapshot of collection progress, updated as the job advances.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectionProgress {
    pub phase: Phase,
    /// Distinct replays discovered by tree expansion.
    pub discovered: u64,
    /// Replays skipped because they were already completed or stored.
    pub skipped: u64,
    /// Downloads finished and registered.
    pub succeeded: u64,
    /// Downloads failed terminally.
    pub failed: u64,
    /// Bytes written to storage so far.
    pub total_bytes: u64,
}
