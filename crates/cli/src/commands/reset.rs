use warboard_core::config::{AppConfig, LoadOptions};
use warboard_core::registry::{CorruptRecordPolicy, TableRegistry};
use warboard_core::store::SnapshotStore;

use super::CommandResult;

pub fn run(confirmed: bool) -> CommandResult {
    if !confirmed {
        return CommandResult::failure(
            "reset",
            "confirmation_required",
            "this clears every reservation; re-run with --yes to confirm",
            4,
        );
    }

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("reset", "config_validation", error.to_string(), 2)
        }
    };

    let store = SnapshotStore::new(config.tables.data_file.clone());
    let policy = if config.tables.strict_recovery {
        CorruptRecordPolicy::Fail
    } else {
        CorruptRecordPolicy::StartEmpty
    };
    let mut registry = match TableRegistry::load(store, config.tables.max_tables, policy) {
        Ok(registry) => registry,
        Err(error) => return CommandResult::failure("reset", "snapshot", error.to_string(), 3),
    };

    let cleared = registry.capacity() - registry.available_count();
    registry.reset_all();

    CommandResult::success("reset", format!("cleared {cleared} reservations"))
}
