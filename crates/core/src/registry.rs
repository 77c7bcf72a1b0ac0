use chrono::Utc;
use thiserror::Error;
use tracing::{error, warn};

use crate::domain::reservation::{Reservation, UserId};
use crate::store::{SnapshotStore, StoreError};

/// Number of physical tables the club owns.
pub const DEFAULT_MAX_TABLES: u32 = 15;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("all {capacity} tables are reserved")]
    CapacityExceeded { capacity: u32 },
    #[error("table {table_number} is already taken")]
    TableUnavailable { table_number: u32 },
    #[error("table number {table_number} is outside 1..={capacity}")]
    InvalidTableNumber { table_number: u32, capacity: u32 },
    #[error("requester already holds table {table_number}")]
    AlreadyReserved { table_number: u32 },
}

/// What to do when the durable record exists but cannot be parsed at
/// startup. `StartEmpty` reproduces the historical behavior (warn and
/// begin with no reservations); `Fail` refuses to start so the bad
/// file can be inspected instead of silently discarded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CorruptRecordPolicy {
    #[default]
    StartEmpty,
    Fail,
}

/// Authoritative mapping of table numbers to reservations.
///
/// The registry is single-threaded and performs no internal locking;
/// a host that can interleave mutating calls must serialize them (the
/// server wraps the registry in a mutex held across each
/// read-modify-persist sequence). Every successful mutation rewrites
/// the whole snapshot; a failed write is logged and never rolls back
/// the in-memory change.
#[derive(Debug)]
pub struct TableRegistry {
    capacity: u32,
    store: SnapshotStore,
    reservations: Vec<Reservation>,
}

impl TableRegistry {
    /// Construct the registry from the durable record. An absent record
    /// means an empty registry; an unreadable one is handled per
    /// `policy`.
    pub fn load(
        store: SnapshotStore,
        capacity: u32,
        policy: CorruptRecordPolicy,
    ) -> Result<Self, StoreError> {
        let reservations = match store.load() {
            Ok(reservations) => reservations,
            Err(source) => match policy {
                CorruptRecordPolicy::Fail => return Err(source),
                CorruptRecordPolicy::StartEmpty => {
                    warn!(
                        event_name = "registry.load.recovered_empty",
                        path = %store.path().display(),
                        error = %source,
                        "durable record unreadable; starting with an empty registry"
                    );
                    Vec::new()
                }
            },
        };

        Ok(Self { capacity, store, reservations })
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn available_count(&self) -> u32 {
        self.capacity.saturating_sub(self.reservations.len() as u32)
    }

    /// Reserve the lowest free table number for `requester_id`. Fails
    /// with `AlreadyReserved` if the requester already holds a table
    /// and `CapacityExceeded` when every table is occupied.
    pub fn allocate(
        &mut self,
        requester_id: UserId,
        username: impl Into<String>,
        participant_names: impl Into<String>,
        activity_name: impl Into<String>,
    ) -> Result<u32, RegistryError> {
        if let Some(existing) = self.find_by_requester(&requester_id) {
            return Err(RegistryError::AlreadyReserved { table_number: existing.table_number });
        }

        let table_number = self
            .lowest_free_table()
            .ok_or(RegistryError::CapacityExceeded { capacity: self.capacity })?;

        self.insert(Reservation {
            requester_id,
            username: username.into(),
            participant_names: participant_names.into(),
            activity_name: activity_name.into(),
            table_number,
            created_at: Utc::now(),
        });
        Ok(table_number)
    }

    /// Admin path: bind a reservation to exactly `table_number`,
    /// bypassing the lowest-free search. Intentionally does not check
    /// for an existing reservation under the same requester, so one
    /// identity may front several admin-assigned tables.
    pub fn allocate_specific(
        &mut self,
        requester_id: UserId,
        username: impl Into<String>,
        participant_names: impl Into<String>,
        activity_name: impl Into<String>,
        table_number: u32,
    ) -> Result<u32, RegistryError> {
        if table_number < 1 || table_number > self.capacity {
            return Err(RegistryError::InvalidTableNumber {
                table_number,
                capacity: self.capacity,
            });
        }
        if self.find_by_table(table_number).is_some() {
            return Err(RegistryError::TableUnavailable { table_number });
        }

        self.insert(Reservation {
            requester_id,
            username: username.into(),
            participant_names: participant_names.into(),
            activity_name: activity_name.into(),
            table_number,
            created_at: Utc::now(),
        });
        Ok(table_number)
    }

    /// Remove every reservation held by `requester_id`. Returns whether
    /// anything was removed; persists only on change.
    pub fn release(&mut self, requester_id: &UserId) -> bool {
        let before = self.reservations.len();
        self.reservations.retain(|reservation| &reservation.requester_id != requester_id);

        if self.reservations.len() == before {
            return false;
        }
        self.persist();
        true
    }

    /// Remove the reservation occupying `table_number`, if any,
    /// returning the removed row.
    pub fn release_table(&mut self, table_number: u32) -> Option<Reservation> {
        let index = self
            .reservations
            .iter()
            .position(|reservation| reservation.table_number == table_number)?;
        let removed = self.reservations.remove(index);
        self.persist();
        Some(removed)
    }

    pub fn find_by_requester(&self, requester_id: &UserId) -> Option<&Reservation> {
        self.reservations.iter().find(|reservation| &reservation.requester_id == requester_id)
    }

    pub fn find_by_table(&self, table_number: u32) -> Option<&Reservation> {
        self.reservations.iter().find(|reservation| reservation.table_number == table_number)
    }

    /// Fresh snapshot of every active reservation, ascending by table
    /// number. Callers cannot mutate registry state through it.
    pub fn list_all(&self) -> Vec<Reservation> {
        let mut snapshot = self.reservations.clone();
        snapshot.sort_by_key(|reservation| reservation.table_number);
        snapshot
    }

    /// Unconditionally clear every reservation. Irreversible.
    pub fn reset_all(&mut self) {
        self.reservations.clear();
        self.persist();
    }

    fn lowest_free_table(&self) -> Option<u32> {
        (1..=self.capacity).find(|candidate| self.find_by_table(*candidate).is_none())
    }

    fn insert(&mut self, reservation: Reservation) {
        self.reservations.push(reservation);
        self.persist();
    }

    // Memory commits unconditionally; durability is best-effort. A
    // failed write leaves the in-memory state ahead of the durable
    // record until the next successful snapshot.
    fn persist(&self) {
        if let Err(source) = self.store.save(&self.reservations) {
            error!(
                event_name = "registry.persist.failed",
                path = %self.store.path().display(),
                error = %source,
                "snapshot write failed; in-memory state retained"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::domain::reservation::UserId;
    use crate::store::{SnapshotStore, StoreError};

    use super::{CorruptRecordPolicy, RegistryError, TableRegistry};

    fn registry(capacity: u32) -> (TempDir, TableRegistry) {
        let dir = TempDir::new().expect("tempdir");
        let store = SnapshotStore::new(dir.path().join("reservations.json"));
        let registry = TableRegistry::load(store, capacity, CorruptRecordPolicy::default())
            .expect("load empty registry");
        (dir, registry)
    }

    fn user(id: &str) -> UserId {
        UserId(id.to_string())
    }

    fn allocate(registry: &mut TableRegistry, id: &str) -> Result<u32, RegistryError> {
        registry.allocate(user(id), format!("{id}#0001"), format!("{id}, guest"), "Kill Team")
    }

    #[test]
    fn allocate_assigns_lowest_free_table() {
        let (_dir, mut registry) = registry(5);

        assert_eq!(allocate(&mut registry, "u1"), Ok(1));
        assert_eq!(allocate(&mut registry, "u2"), Ok(2));
        assert_eq!(allocate(&mut registry, "u3"), Ok(3));
        assert_eq!(registry.available_count(), 2);
    }

    #[test]
    fn released_table_is_reused_first() {
        let (_dir, mut registry) = registry(3);

        assert_eq!(allocate(&mut registry, "u1"), Ok(1));
        assert_eq!(allocate(&mut registry, "u2"), Ok(2));
        assert!(registry.release(&user("u1")));
        assert_eq!(allocate(&mut registry, "u3"), Ok(1));

        let listed = registry.list_all();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].table_number, 1);
        assert_eq!(listed[0].requester_id, user("u3"));
        assert_eq!(listed[1].table_number, 2);
        assert_eq!(listed[1].requester_id, user("u2"));
    }

    #[test]
    fn allocate_fails_once_every_table_is_taken() {
        let (_dir, mut registry) = registry(1);

        assert_eq!(allocate(&mut registry, "u1"), Ok(1));
        assert_eq!(
            allocate(&mut registry, "u2"),
            Err(RegistryError::CapacityExceeded { capacity: 1 })
        );
        assert_eq!(registry.list_all().len(), 1);
    }

    #[test]
    fn allocate_rejects_a_second_reservation_for_the_same_requester() {
        let (_dir, mut registry) = registry(3);

        assert_eq!(allocate(&mut registry, "u1"), Ok(1));
        assert_eq!(
            allocate(&mut registry, "u1"),
            Err(RegistryError::AlreadyReserved { table_number: 1 })
        );
        assert_eq!(registry.list_all().len(), 1);
    }

    #[test]
    fn allocate_specific_binds_exactly_the_requested_table() {
        let (_dir, mut registry) = registry(5);

        let assigned = registry
            .allocate_specific(user("u1"), "u1#0001", "Ann, Ben", "Necromunda", 4)
            .expect("table 4 is free");
        assert_eq!(assigned, 4);
        assert_eq!(registry.find_by_table(4).map(|r| r.table_number), Some(4));

        // Lowest-free allocation still starts from 1.
        assert_eq!(allocate(&mut registry, "u2"), Ok(1));
    }

    #[test]
    fn allocate_specific_fails_without_mutating_when_table_is_taken() {
        let (_dir, mut registry) = registry(5);
        assert_eq!(allocate(&mut registry, "u1"), Ok(1));

        let result = registry.allocate_specific(user("u2"), "u2#0001", "Cal", "Malifaux", 1);
        assert_eq!(result, Err(RegistryError::TableUnavailable { table_number: 1 }));
        assert_eq!(registry.list_all().len(), 1);
    }

    #[test]
    fn allocate_specific_rejects_out_of_range_table_numbers() {
        let (_dir, mut registry) = registry(5);

        for bad in [0, 6] {
            let result = registry.allocate_specific(user("u1"), "u1#0001", "Cal", "Malifaux", bad);
            assert_eq!(
                result,
                Err(RegistryError::InvalidTableNumber { table_number: bad, capacity: 5 })
            );
        }
        assert!(registry.list_all().is_empty());
    }

    #[test]
    fn allocate_specific_allows_repeat_requesters_on_the_admin_path() {
        let (_dir, mut registry) = registry(5);

        registry
            .allocate_specific(user("admin"), "Admin Booking", "Ann", "X-Wing", 2)
            .expect("first admin booking");
        registry
            .allocate_specific(user("admin"), "Admin Booking", "Ben", "X-Wing", 3)
            .expect("second admin booking under the same identity");

        assert_eq!(registry.list_all().len(), 2);
    }

    #[test]
    fn release_is_a_noop_for_unknown_requesters() {
        let (_dir, mut registry) = registry(3);
        assert_eq!(allocate(&mut registry, "u1"), Ok(1));

        assert!(!registry.release(&user("nobody")));
        assert_eq!(registry.available_count(), 2);

        assert!(registry.release(&user("u1")));
        assert_eq!(registry.available_count(), 3);
    }

    #[test]
    fn release_table_returns_the_removed_reservation() {
        let (_dir, mut registry) = registry(3);
        assert_eq!(allocate(&mut registry, "u1"), Ok(1));
        assert_eq!(allocate(&mut registry, "u2"), Ok(2));

        let removed = registry.release_table(2).expect("table 2 is occupied");
        assert_eq!(removed.requester_id, user("u2"));
        assert!(registry.release_table(2).is_none());
        assert_eq!(registry.available_count(), 2);
    }

    #[test]
    fn list_all_sorts_by_table_number_regardless_of_insertion_order() {
        let (_dir, mut registry) = registry(9);

        registry.allocate_specific(user("u1"), "u1", "Ann", "Saga", 7).expect("table 7");
        registry.allocate_specific(user("u2"), "u2", "Ben", "Saga", 2).expect("table 2");
        registry.allocate_specific(user("u3"), "u3", "Cal", "Saga", 5).expect("table 5");

        let tables: Vec<u32> =
            registry.list_all().iter().map(|reservation| reservation.table_number).collect();
        assert_eq!(tables, vec![2, 5, 7]);
    }

    #[test]
    fn reset_all_empties_the_registry() {
        let (_dir, mut registry) = registry(3);
        assert_eq!(allocate(&mut registry, "u1"), Ok(1));
        assert_eq!(allocate(&mut registry, "u2"), Ok(2));

        registry.reset_all();
        assert!(registry.list_all().is_empty());
        assert_eq!(registry.available_count(), 3);
    }

    #[test]
    fn restart_reproduces_the_persisted_collection() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("reservations.json");

        let before = {
            let store = SnapshotStore::new(&path);
            let mut registry = TableRegistry::load(store, 5, CorruptRecordPolicy::default())
                .expect("load empty registry");
            allocate(&mut registry, "u1").expect("table 1");
            allocate(&mut registry, "u2").expect("table 2");
            registry.release(&user("u1"));
            registry.list_all()
        };

        let reloaded = TableRegistry::load(
            SnapshotStore::new(&path),
            5,
            CorruptRecordPolicy::default(),
        )
        .expect("reload from snapshot");
        assert_eq!(reloaded.list_all(), before);
        assert_eq!(reloaded.available_count(), 4);
    }

    #[test]
    fn corrupt_record_starts_empty_under_the_lenient_policy() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("reservations.json");
        std::fs::write(&path, "][").expect("write corrupt record");

        let registry =
            TableRegistry::load(SnapshotStore::new(&path), 5, CorruptRecordPolicy::StartEmpty)
                .expect("lenient policy recovers");
        assert!(registry.list_all().is_empty());
    }

    #[test]
    fn corrupt_record_fails_startup_under_the_strict_policy() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("reservations.json");
        std::fs::write(&path, "][").expect("write corrupt record");

        let error =
            TableRegistry::load(SnapshotStore::new(&path), 5, CorruptRecordPolicy::Fail)
                .expect_err("strict policy refuses to start");
        assert!(matches!(error, StoreError::Corrupt { .. }));
    }

    #[test]
    fn failed_snapshot_write_does_not_roll_back_memory() {
        let dir = TempDir::new().expect("tempdir");
        // A regular file where the data directory should be makes every
        // snapshot write fail.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").expect("write blocker file");
        let store = SnapshotStore::new(blocker.join("reservations.json"));

        let mut registry = TableRegistry::load(store, 3, CorruptRecordPolicy::default())
            .expect("load starts empty");
        assert_eq!(allocate(&mut registry, "u1"), Ok(1));
        assert_eq!(registry.list_all().len(), 1);
        assert_eq!(registry.available_count(), 2);
    }
}
