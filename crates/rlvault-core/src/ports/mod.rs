//! Port definitions implemented by the adapter crates.

mod api_client;
mod parser;
mod registration;
mod storage;

pub use api_client::{ApiClientPort, ReplayByteStream};
pub use parser::ReplayParserPort;
pub use registration::RegistrationStorePort;
pub use storage::{StorageBackendPort, StorageStats, WrittenObject};
