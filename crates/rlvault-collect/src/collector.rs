//! Wiring from configuration to a ready orchestrator.
//!
//! Builds the concrete adapter stack (ballchasing client, SQLite store,
//! storage backend) behind the ports. Callers that need different
//! adapters construct `DownloadOrchestrator` directly.

use std::sync::Arc;

use rlvault_bc::{BcApiClient, BcConfig, RateLimiter};
use rlvault_core::{CollectResult, CollectionConfig};
use rlvault_db::{setup_database, SqliteRegistrationStore};
use rlvault_storage::backend_for;

use crate::orchestrator::{DownloadOrchestrator, OrchestratorOptions};

/// Build an orchestrator from a validated configuration.
///
/// Opens (or creates) the registration database, constructs the storage
/// backend named by `config.storage`, and shares one rate limiter between
/// the API client and the orchestrator's budget persistence.
pub async fn build_orchestrator(config: &CollectionConfig) -> CollectResult<DownloadOrchestrator> {
    config.validate()?;

    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit_per_hour,
        config.rate_limit_per_second,
    )?);
    let api = BcApiClient::new(
        config.api_key.clone(),
        BcConfig::default(),
        Arc::clone(&limiter),
    )?;
    let pool = setup_database(&config.database_path).await?;
    let store = SqliteRegistrationStore::new(pool);
    let storage = backend_for(&config.storage)?;

    Ok(DownloadOrchestrator::new(
        Arc::new(api),
        Arc::new(store),
        storage,
        OrchestratorOptions::from_config(config),
    )
    .with_limiter(limiter))
}
