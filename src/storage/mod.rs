//! Storage layer for the till engine
//!
//! Provides JSON file storage with atomic writes, all-or-nothing ledger
//! commits, the per-location lock table and the lock-free debt snapshot.

pub mod expenses;
pub mod file_io;
pub mod init;
pub mod ledger;
pub mod locations;
pub mod locks;
pub mod recovery;
pub mod shifts;
pub mod snapshot;

pub use expenses::ExpenseRepository;
pub use file_io::{read_json, write_json_atomic};
pub use init::initialize_storage;
pub use ledger::{LedgerChanges, LedgerImage};
pub use locations::LocationRepository;
pub use locks::{CommitLock, LocationGuard, LocationLocks};
pub use recovery::RecoveryRepository;
pub use shifts::ShiftRepository;
pub use snapshot::DebtSnapshot;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::audit::{AuditEntry, AuditLogger};
use crate::config::paths::TillPaths;
use crate::error::TillError;
use crate::external::AuditSink;
use crate::models::LocationId;

pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, TillError> {
    lock.read()
        .map_err(|e| TillError::Storage(format!("Failed to acquire read lock: {}", e)))
}

pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, TillError> {
    lock.write()
        .map_err(|e| TillError::Storage(format!("Failed to acquire write lock: {}", e)))
}

/// Main storage coordinator that provides access to all repositories
pub struct Storage {
    paths: TillPaths,
    pub locations: LocationRepository,
    pub shifts: ShiftRepository,
    pub expenses: ExpenseRepository,
    pub recovery: RecoveryRepository,
    pub locks: LocationLocks,
    pub debt_snapshot: DebtSnapshot,
    audit_sink: Box<dyn AuditSink>,
    /// Last timestamp handed out by `tick`
    clock: Mutex<DateTime<Utc>>,
    sequence: AtomicU64,
    /// Ledger generation the in-memory tables reflect
    generation: AtomicU64,
}

impl Storage {
    /// Create a new Storage instance writing audit entries to the JSONL log
    pub fn new(paths: TillPaths) -> Result<Self, TillError> {
        paths.ensure_directories()?;

        Ok(Self {
            locations: LocationRepository::new(paths.locations_file()),
            shifts: ShiftRepository::new(),
            expenses: ExpenseRepository::new(),
            recovery: RecoveryRepository::new(),
            locks: LocationLocks::new(paths.lock_dir()),
            debt_snapshot: DebtSnapshot::new(),
            audit_sink: Box::new(AuditLogger::new(paths.audit_log())),
            clock: Mutex::new(DateTime::<Utc>::MIN_UTC),
            sequence: AtomicU64::new(0),
            generation: AtomicU64::new(0),
            paths,
        })
    }

    /// Replace the audit sink
    pub fn with_audit_sink(mut self, sink: Box<dyn AuditSink>) -> Self {
        self.audit_sink = sink;
        self
    }

    /// Get the paths configuration
    pub fn paths(&self) -> &TillPaths {
        &self.paths
    }

    /// Load all data from disk
    pub fn load_all(&self) -> Result<(), TillError> {
        self.locations.load()?;
        self.reload_ledger(false)
    }

    /// Pick up commits made by other processes since this one last looked
    pub fn refresh(&self) -> Result<(), TillError> {
        self.locations.load()?;
        self.reload_ledger(true)
    }

    /// Take exclusive access to a location and bring the tables up to date.
    ///
    /// Every read a mutation bases its decision on must happen after this.
    pub fn lock_location(
        &self,
        location_id: LocationId,
        timeout: StdDuration,
    ) -> Result<LocationGuard<'_>, TillError> {
        let guard = self.locks.acquire(location_id, timeout)?;
        self.refresh()?;
        Ok(guard)
    }

    /// Serialize a read-modify-write of data files with every other writer
    pub fn commit_lock(&self) -> Result<CommitLock, TillError> {
        CommitLock::acquire(&self.paths.commit_lock_file())
    }

    fn reload_ledger(&self, only_if_newer: bool) -> Result<(), TillError> {
        let image: LedgerImage = read_json(self.paths.ledger_file())?;

        let mut shifts = write_lock(&self.shifts.table)?;
        let mut expenses = write_lock(&self.expenses.table)?;
        let mut records = write_lock(&self.recovery.table)?;

        let known = self.generation.load(Ordering::SeqCst);
        if only_if_newer && image.generation <= known {
            return Ok(());
        }

        let generation = image.generation;
        self.observe(&image)?;
        let (next_shifts, next_expenses, next_records) = image.into_tables();
        self.debt_snapshot.rebuild(&next_records);

        debug!(
            generation,
            shifts = next_shifts.len(),
            expenses = next_expenses.len(),
            "Loaded ledger"
        );

        *shifts = next_shifts;
        *expenses = next_expenses;
        *records = next_records;
        self.generation.store(generation, Ordering::SeqCst);
        Ok(())
    }

    /// Keep the clock and record sequence ahead of everything in `image`
    fn observe(&self, image: &LedgerImage) -> Result<(), TillError> {
        let max_sequence = image
            .recovery_records
            .iter()
            .map(|r| r.sequence)
            .max()
            .unwrap_or(0);
        self.sequence.fetch_max(max_sequence, Ordering::SeqCst);

        if let Some(latest) = latest_timestamp(image) {
            let mut clock = self
                .clock
                .lock()
                .map_err(|e| TillError::Storage(format!("Clock lock poisoned: {}", e)))?;
            *clock = (*clock).max(latest);
        }
        Ok(())
    }

    /// Persist the location list
    pub fn save_locations(&self) -> Result<(), TillError> {
        self.locations.save()
    }

    /// Check if storage has been initialized
    pub fn is_initialized(&self) -> bool {
        self.paths.is_initialized()
    }

    /// Strictly increasing wall-clock timestamp
    ///
    /// Two calls never return the same instant, even across a clock step back.
    pub fn tick(&self) -> Result<DateTime<Utc>, TillError> {
        let mut clock = self
            .clock
            .lock()
            .map_err(|e| TillError::Storage(format!("Clock lock poisoned: {}", e)))?;

        let now = Utc::now();
        let next = if now > *clock {
            now
        } else {
            *clock + Duration::microseconds(1)
        };
        *clock = next;
        Ok(next)
    }

    /// Next recovery-record sequence number
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Apply a change set atomically.
    ///
    /// Runs under the commit lock. When another process committed since the
    /// tables were loaded, the change set is applied on top of the newer
    /// image so its rows for other locations survive. The full image is
    /// written before the in-memory tables are swapped, so a failed write
    /// leaves both untouched. Audit entries are emitted only after a
    /// successful commit.
    pub fn commit(&self, changes: LedgerChanges) -> Result<(), TillError> {
        if changes.is_empty() {
            self.emit_all(&changes.audit);
            return Ok(());
        }

        {
            let _commit_lock = self.commit_lock()?;
            let on_disk: LedgerImage = read_json(self.paths.ledger_file())?;

            // Fixed order: shifts, expenses, records
            let mut shifts = write_lock(&self.shifts.table)?;
            let mut expenses = write_lock(&self.expenses.table)?;
            let mut records = write_lock(&self.recovery.table)?;

            let known = self.generation.load(Ordering::SeqCst);
            let disk_generation = on_disk.generation;
            let rebased = disk_generation > known;

            let (mut next_shifts, mut next_expenses, mut next_records) = if rebased {
                self.observe(&on_disk)?;
                on_disk.into_tables()
            } else {
                (shifts.clone(), expenses.clone(), records.clone())
            };

            let touched =
                changes.apply_to(&mut next_shifts, &mut next_expenses, &mut next_records)?;

            let generation = known.max(disk_generation) + 1;
            let image =
                LedgerImage::from_tables(generation, &next_shifts, &next_expenses, &next_records);
            write_json_atomic(self.paths.ledger_file(), &image)?;

            if rebased {
                debug!(generation, "Rebased commit onto a newer ledger");
                self.debt_snapshot.rebuild(&next_records);
            } else {
                self.debt_snapshot.refresh(&next_records, &touched);
            }

            *shifts = next_shifts;
            *expenses = next_expenses;
            *records = next_records;
            self.generation.store(generation, Ordering::SeqCst);
        }

        self.emit_all(&changes.audit);
        Ok(())
    }

    /// Fire-and-forget audit emission
    pub fn emit(&self, entry: &AuditEntry) {
        if let Err(e) = self.audit_sink.append(entry) {
            warn!(
                action = %entry.action,
                entity_id = %entry.entity_id,
                error = %e,
                "Audit sink rejected entry"
            );
        }
    }

    fn emit_all(&self, entries: &[AuditEntry]) {
        for entry in entries {
            self.emit(entry);
        }
    }
}

fn latest_timestamp(image: &LedgerImage) -> Option<DateTime<Utc>> {
    let shift_times = image
        .shifts
        .iter()
        .flat_map(|s| std::iter::once(s.opened_at).chain(s.closed_at));
    let expense_times = image.expenses.iter().map(|e| e.timestamp);
    let record_times = image.recovery_records.iter().flat_map(|r| {
        std::iter::once(r.created_at)
            .chain(r.settled_at)
            .chain(r.applications.iter().map(|a| a.applied_at))
    });

    shift_times.chain(expense_times).chain(record_times).max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::NullSink;
    use crate::models::{LocationId, Money, RecoveryRecord, Shift};
    use tempfile::TempDir;

    fn create_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = TillPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths).unwrap();
        (temp_dir, storage)
    }

    #[test]
    fn test_tick_strictly_increasing() {
        let (_temp_dir, storage) = create_storage();
        let mut last = storage.tick().unwrap();
        for _ in 0..1000 {
            let next = storage.tick().unwrap();
            assert!(next > last);
            last = next;
        }
    }

    #[test]
    fn test_commit_persists_and_reloads() {
        let (temp_dir, storage) = create_storage();
        let location = LocationId::new();
        let shift = Shift::open(location, "op", Money::from_units(100), storage.tick().unwrap());
        let record = RecoveryRecord::new(
            location,
            shift.id,
            Money::from_units(20),
            storage.tick().unwrap(),
            storage.next_sequence(),
        );

        let mut changes = LedgerChanges::new();
        changes.upsert_shift(shift.clone()).upsert_record(record);
        storage.commit(changes).unwrap();

        assert_eq!(storage.debt_snapshot.get(location), Money::from_units(20));

        let reopened =
            Storage::new(TillPaths::with_base_dir(temp_dir.path().to_path_buf())).unwrap();
        reopened.load_all().unwrap();
        assert_eq!(reopened.shifts.get(shift.id).unwrap(), Some(shift.clone()));
        assert_eq!(reopened.debt_snapshot.get(location), Money::from_units(20));
        assert_eq!(reopened.next_sequence(), 2);
        assert!(reopened.tick().unwrap() > shift.opened_at);
    }

    #[test]
    fn test_failed_write_leaves_memory_untouched() {
        let (_temp_dir, storage) = create_storage();
        let storage = storage.with_audit_sink(Box::new(NullSink));
        let location = LocationId::new();

        // A directory in place of the ledger file makes the commit fail
        std::fs::create_dir_all(storage.paths().ledger_file()).unwrap();

        let mut changes = LedgerChanges::new();
        changes.upsert_shift(Shift::open(location, "op", Money::zero(), storage.tick().unwrap()));
        assert!(storage.commit(changes).is_err());

        assert!(storage.shifts.find_open(location).unwrap().is_none());
    }

    #[test]
    fn test_rejected_change_set_writes_nothing() {
        let (_temp_dir, storage) = create_storage();
        let location = LocationId::new();

        let mut changes = LedgerChanges::new();
        changes
            .upsert_shift(Shift::open(location, "a", Money::zero(), storage.tick().unwrap()))
            .upsert_shift(Shift::open(location, "b", Money::zero(), storage.tick().unwrap()));

        assert!(storage.commit(changes).is_err());
        assert!(!storage.paths().ledger_file().exists());
        assert_eq!(storage.shifts.count().unwrap(), 0);
    }

    #[test]
    fn test_commit_keeps_rows_written_by_another_instance() {
        let (temp_dir, first) = create_storage();
        let second =
            Storage::new(TillPaths::with_base_dir(temp_dir.path().to_path_buf())).unwrap();
        first.load_all().unwrap();
        second.load_all().unwrap();

        let north = Shift::open(LocationId::new(), "a", Money::zero(), first.tick().unwrap());
        let mut changes = LedgerChanges::new();
        changes.upsert_shift(north.clone());
        first.commit(changes).unwrap();

        // `second` never saw the first commit; its write must not drop it
        let south = Shift::open(LocationId::new(), "b", Money::zero(), second.tick().unwrap());
        let mut changes = LedgerChanges::new();
        changes.upsert_shift(south.clone());
        second.commit(changes).unwrap();
        assert!(second.shifts.get(north.id).unwrap().is_some());

        let fresh =
            Storage::new(TillPaths::with_base_dir(temp_dir.path().to_path_buf())).unwrap();
        fresh.load_all().unwrap();
        assert_eq!(fresh.shifts.count().unwrap(), 2);
        assert!(fresh.shifts.get(south.id).unwrap().is_some());
    }

    #[test]
    fn test_refresh_picks_up_newer_generation() {
        let (temp_dir, first) = create_storage();
        let second =
            Storage::new(TillPaths::with_base_dir(temp_dir.path().to_path_buf())).unwrap();
        second.load_all().unwrap();

        let location = LocationId::new();
        let mut changes = LedgerChanges::new();
        changes.upsert_shift(Shift::open(location, "a", Money::zero(), first.tick().unwrap()));
        first.commit(changes).unwrap();

        assert!(second.shifts.find_open(location).unwrap().is_none());
        second.refresh().unwrap();
        assert!(second.shifts.find_open(location).unwrap().is_some());
    }
}
