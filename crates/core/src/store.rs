use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::reservation::Reservation;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not read snapshot `{path}`: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("could not write snapshot `{path}`: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("could not create data directory `{path}`: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("snapshot `{path}` is corrupt: {source}")]
    Corrupt { path: PathBuf, source: serde_json::Error },
    #[error("could not serialize snapshot: {0}")]
    Serialize(serde_json::Error),
}

/// Durable record for the table registry: the entire reservation
/// collection, written as one JSON document on every mutation and read
/// back once at startup. A single running registry instance owns the
/// file; concurrent writers are unsupported.
#[derive(Clone, Debug)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// An absent snapshot is an empty collection, not an error. A
    /// snapshot that exists but cannot be read or parsed is surfaced so
    /// the caller can apply its recovery policy.
    pub fn load(&self) -> Result<Vec<Reservation>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Read { path: self.path.clone(), source }),
        };

        serde_json::from_str(&raw)
            .map_err(|source| StoreError::Corrupt { path: self.path.clone(), source })
    }

    /// Full overwrite of the durable record. Creates the data directory
    /// on first use.
    pub fn save(&self, reservations: &[Reservation]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|source| StoreError::CreateDir { path: parent.to_path_buf(), source })?;
            }
        }

        let document = serde_json::to_string_pretty(reservations).map_err(StoreError::Serialize)?;
        fs::write(&self.path, document)
            .map_err(|source| StoreError::Write { path: self.path.clone(), source })
    }

    /// Readiness check for health/doctor surfaces. A snapshot that does
    /// not exist yet is healthy; one that exists but is unreadable is
    /// not.
    pub fn probe(&self) -> Result<(), StoreError> {
        match fs::metadata(&self.path) {
            Ok(_) => Ok(()),
            Err(source) if source.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Read { path: self.path.clone(), source }),
        }
    }
}
