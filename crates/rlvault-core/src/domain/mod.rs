//! Pure domain types with no I/O dependencies.

mod group;
mod job;
mod record;
mod replay;

pub use group::{Group, GroupId};
pub use job::{FailedReplay, JobResult, RateBudget};
pub use record::{DownloadRecord, DownloadStatus, RegistrationStats};
pub use replay::{ReplayId, ReplayReference, sanitize_path_component};
