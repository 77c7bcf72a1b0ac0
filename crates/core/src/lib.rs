pub mod config;
pub mod domain;
pub mod registry;
pub mod store;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::reservation::{Reservation, UserId};
pub use registry::{CorruptRecordPolicy, RegistryError, TableRegistry, DEFAULT_MAX_TABLES};
pub use store::{SnapshotStore, StoreError};
