//! Group-tree expansion and download orchestration for rlvault.
//!
//! This crate ties the ports together: it walks a remote group hierarchy,
//! diffs the discovered replays against the durable registration store,
//! and drives a bounded, cancellable worker pool that downloads and stores
//! everything still missing. Jobs are idempotent and resumable; run the
//! same tree twice and the second run only pays listing calls.

pub mod collector;
pub mod expander;
pub mod orchestrator;
pub mod progress;
mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use collector::build_orchestrator;
pub use expander::{Expansion, GroupTreeExpander};
pub use orchestrator::{DownloadOrchestrator, OrchestratorOptions};
pub use progress::{CollectionProgress, Phase};

// Dev-dependencies exercised only inside unit tests
#[cfg(test)]
use tokio_test as _;
