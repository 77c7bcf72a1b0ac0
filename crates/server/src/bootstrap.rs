use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;
use warboard_core::config::{AppConfig, ConfigError, LoadOptions};
use warboard_core::registry::{CorruptRecordPolicy, TableRegistry};
use warboard_core::store::{SnapshotStore, StoreError};
use warboard_discord::commands::CommandRouter;
use warboard_discord::events::{command_dispatcher, ChannelFilter};
use warboard_discord::gateway::GatewayRunner;

use crate::service::RegistryCommandService;

pub struct Application {
    pub config: AppConfig,
    pub snapshot_store: SnapshotStore,
    pub registry: Arc<Mutex<TableRegistry>>,
    pub gateway_runner: GatewayRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("reservation snapshot could not be loaded: {0}")]
    Snapshot(#[source] StoreError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let snapshot_store = SnapshotStore::new(config.tables.data_file.clone());
    let recovery_policy = if config.tables.strict_recovery {
        CorruptRecordPolicy::Fail
    } else {
        CorruptRecordPolicy::StartEmpty
    };
    let registry =
        TableRegistry::load(snapshot_store.clone(), config.tables.max_tables, recovery_policy)
            .map_err(BootstrapError::Snapshot)?;

    info!(
        event_name = "system.bootstrap.registry_loaded",
        correlation_id = "bootstrap",
        capacity = registry.capacity(),
        reserved = registry.capacity() - registry.available_count(),
        data_file = %snapshot_store.path().display(),
        "table registry loaded from the durable record"
    );

    let registry = Arc::new(Mutex::new(registry));
    let router = CommandRouter::new(
        RegistryCommandService::new(Arc::clone(&registry)),
        config.discord.command_prefix.clone(),
    );
    let filter = ChannelFilter::new(config.discord.allowed_channel_ids.clone());
    let gateway_runner = GatewayRunner::noop(command_dispatcher(router, filter));

    Ok(Application { config, snapshot_store, registry, gateway_runner })
}
