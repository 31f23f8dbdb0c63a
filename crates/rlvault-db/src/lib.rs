//! `SQLite` registration store for rlvault.
//!
//! Persists the per-replay download ledger that powers deduplication and
//! resumption, plus group sync history and the rate-budget snapshot.

pub mod setup;
pub mod store;

pub use setup::setup_database;
#[cfg(any(test, feature = "test-utils"))]
pub use setup::setup_test_database;
pub use store::SqliteRegistrationStore;

// Bundled SQLite is linked through libsqlite3-sys; sqlx drives it
use libsqlite3_sys as _;
