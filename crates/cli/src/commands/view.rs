use warboard_core::config::{AppConfig, LoadOptions};
use warboard_core::registry::{CorruptRecordPolicy, TableRegistry};
use warboard_core::store::SnapshotStore;

use super::CommandResult;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::failure("view", "config_validation", error.to_string(), 2),
    };

    let store = SnapshotStore::new(config.tables.data_file.clone());
    let policy = if config.tables.strict_recovery {
        CorruptRecordPolicy::Fail
    } else {
        CorruptRecordPolicy::StartEmpty
    };
    let registry = match TableRegistry::load(store, config.tables.max_tables, policy) {
        Ok(registry) => registry,
        Err(error) => return CommandResult::failure("view", "snapshot", error.to_string(), 3),
    };

    let reservations = registry.list_all();
    if reservations.is_empty() {
        return CommandResult::success(
            "view",
            format!("no active reservations (0/{} tables reserved)", registry.capacity()),
        );
    }

    let mut lines = vec![format!(
        "{}/{} tables reserved ({} available):",
        reservations.len(),
        registry.capacity(),
        registry.available_count()
    )];
    for reservation in &reservations {
        lines.push(format!(
            "  - Table {}: {} playing {} (reserved by {})",
            reservation.table_number,
            reservation.participant_names,
            reservation.activity_name,
            reservation.username
        ));
    }

    CommandResult::success("view", lines.join("\n"))
}
