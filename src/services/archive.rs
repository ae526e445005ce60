//! Archive service
//!
//! Moves closed shifts and their expenses out of the live ledger into
//! timestamped files under `archive/`. Open shifts stay, and so does any
//! shift that is still the origin of Pending debt, so the settlement trail
//! is never broken.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::audit::{Action, AuditEntry, EntityType};
use crate::config::Settings;
use crate::error::{TillError, TillResult};
use crate::models::{Expense, LocationId, Shift, ShiftId};
use crate::storage::{write_json_atomic, LedgerChanges, Storage};

/// Contents of one archive file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveBundle {
    pub archived_at: DateTime<Utc>,
    pub location_id: LocationId,
    pub shifts: Vec<Shift>,
    pub expenses: Vec<Expense>,
}

/// Why a shift was kept in the live ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetainReason {
    StillOpen,
    PendingDebtOrigin,
}

impl std::fmt::Display for RetainReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StillOpen => write!(f, "shift is still open"),
            Self::PendingDebtOrigin => write!(f, "origin of pending debt"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArchiveReport {
    pub archived: Vec<ShiftId>,
    pub retained: Vec<(ShiftId, RetainReason)>,
    pub expenses_archived: usize,
    pub archive_file: Option<PathBuf>,
}

pub struct ArchiveService<'a> {
    storage: &'a Storage,
    lock_timeout: Duration,
}

impl<'a> ArchiveService<'a> {
    pub fn new(storage: &'a Storage, settings: &Settings) -> Self {
        Self {
            storage,
            lock_timeout: settings.lock_timeout(),
        }
    }

    /// Archive a single closed shift
    pub fn archive_shift(&self, shift_id: ShiftId, actor: &str) -> TillResult<ArchiveReport> {
        let location_id = self.load_shift(shift_id)?.location_id;
        let _guard = self.storage.lock_location(location_id, self.lock_timeout)?;

        let shift = self.load_shift(shift_id)?;
        match self.retain_reason(&shift)? {
            Some(RetainReason::StillOpen) => {
                return Err(TillError::InvalidState {
                    entity_type: "Shift",
                    identifier: shift_id.to_string(),
                    state: shift.state.to_string(),
                    operation: "archive",
                })
            }
            Some(RetainReason::PendingDebtOrigin) => {
                warn!(shift = %shift_id, "Refusing to archive origin of pending debt");
                return Err(TillError::conflict(
                    "pending-origin",
                    format!("Shift {} still has pending debt to recover", shift_id),
                ));
            }
            None => {}
        }

        self.archive(location_id, vec![shift], Vec::new(), actor)
    }

    /// Archive every closed shift at a location that closed before `cutoff`.
    ///
    /// Shifts that cannot be archived are reported as retained, not errors.
    pub fn archive_before(
        &self,
        location_id: LocationId,
        cutoff: DateTime<Utc>,
        actor: &str,
    ) -> TillResult<ArchiveReport> {
        let _guard = self.storage.lock_location(location_id, self.lock_timeout)?;

        let mut candidates = Vec::new();
        let mut retained = Vec::new();
        for shift in self.storage.shifts.get_by_location(location_id)? {
            if shift.closed_at.map_or(shift.opened_at >= cutoff, |c| c >= cutoff) {
                continue;
            }
            match self.retain_reason(&shift)? {
                Some(reason) => retained.push((shift.id, reason)),
                None => candidates.push(shift),
            }
        }

        if !retained.is_empty() {
            warn!(
                location = %location_id,
                retained = retained.len(),
                "Some shifts were kept in the live ledger"
            );
        }

        self.archive(location_id, candidates, retained, actor)
    }

    fn archive(
        &self,
        location_id: LocationId,
        shifts: Vec<Shift>,
        retained: Vec<(ShiftId, RetainReason)>,
        actor: &str,
    ) -> TillResult<ArchiveReport> {
        if shifts.is_empty() {
            return Ok(ArchiveReport {
                retained,
                ..ArchiveReport::default()
            });
        }

        let archived_at = self.storage.tick()?;
        let mut expenses = Vec::new();
        for shift in &shifts {
            expenses.extend(self.storage.expenses.get_by_shift(shift.id)?);
        }

        let bundle = ArchiveBundle {
            archived_at,
            location_id,
            shifts,
            expenses,
        };

        // The copy goes to disk before the live ledger drops anything
        let archive_file = self.storage.paths().archive_dir().join(format!(
            "shifts-{}.json",
            archived_at.format("%Y%m%dT%H%M%S%.6fZ")
        ));
        write_json_atomic(&archive_file, &bundle)?;

        let mut changes = LedgerChanges::new();
        for shift in &bundle.shifts {
            changes.remove_shift(shift.id).audit(
                AuditEntry::new(actor, Action::Archive, EntityType::Shift, shift.id.to_string())
                    .at(archived_at)
                    .before(shift),
            );
        }
        self.storage.commit(changes)?;

        info!(
            location = %location_id,
            shifts = bundle.shifts.len(),
            expenses = bundle.expenses.len(),
            file = %archive_file.display(),
            "Shifts archived"
        );

        Ok(ArchiveReport {
            archived: bundle.shifts.iter().map(|s| s.id).collect(),
            retained,
            expenses_archived: bundle.expenses.len(),
            archive_file: Some(archive_file),
        })
    }

    fn retain_reason(&self, shift: &Shift) -> TillResult<Option<RetainReason>> {
        if shift.is_open() {
            return Ok(Some(RetainReason::StillOpen));
        }
        if !self.storage.recovery.pending_from_origin(shift.id)?.is_empty() {
            return Ok(Some(RetainReason::PendingDebtOrigin));
        }
        Ok(None)
    }

    fn load_shift(&self, shift_id: ShiftId) -> TillResult<Shift> {
        self.storage
            .shifts
            .get(shift_id)?
            .ok_or_else(|| TillError::shift_not_found(shift_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::TillPaths;
    use crate::external::{FixedSales, NullSink, TrustedDirectory};
    use crate::models::{Location, Money};
    use crate::services::{ExpenseRegistry, ShiftManager};
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = TillPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths)
            .unwrap()
            .with_audit_sink(Box::new(NullSink));
        storage.load_all().unwrap();
        (temp_dir, storage)
    }

    fn setup(storage: &Storage) -> Location {
        let location = Location::new("Kiosk", Money::from_units(100));
        storage.locations.upsert(location.clone()).unwrap();
        storage.locations.save().unwrap();
        location
    }

    #[test]
    fn test_archive_closed_shift_moves_expenses() {
        let (_temp_dir, storage) = create_test_storage();
        let settings = Settings::default();
        let location = setup(&storage);
        let sales = FixedSales(Money::zero());
        let manager = ShiftManager::new(&storage, &settings, &sales, &TrustedDirectory);
        let registry = ExpenseRegistry::new(&storage, &settings, &TrustedDirectory);

        let opened = manager.open_shift(location.id, Money::from_units(100), "op", None).unwrap();
        registry.add_expense(opened.shift.id, Money::from_units(10), "ice", "op").unwrap();
        manager
            .close_shift(opened.shift.id, Money::from_units(100), "op", None)
            .unwrap();

        let service = ArchiveService::new(&storage, &settings);
        let report = service.archive_shift(opened.shift.id, "admin").unwrap();

        assert_eq!(report.archived, vec![opened.shift.id]);
        assert_eq!(report.expenses_archived, 1);
        assert!(storage.shifts.get(opened.shift.id).unwrap().is_none());
        assert_eq!(storage.expenses.count().unwrap(), 0);

        let raw = std::fs::read_to_string(report.archive_file.unwrap()).unwrap();
        let bundle: ArchiveBundle = serde_json::from_str(&raw).unwrap();
        assert_eq!(bundle.shifts.len(), 1);
        assert_eq!(bundle.expenses.len(), 1);
    }

    #[test]
    fn test_refuses_pending_origin_and_open_shift() {
        let (_temp_dir, storage) = create_test_storage();
        let settings = Settings::default();
        let location = setup(&storage);
        let sales = FixedSales(Money::zero());
        let manager = ShiftManager::new(&storage, &settings, &sales, &TrustedDirectory);
        let service = ArchiveService::new(&storage, &settings);

        let short = manager.open_shift(location.id, Money::from_units(100), "op", None).unwrap();
        manager.close_shift(short.shift.id, Money::from_units(80), "op", None).unwrap();

        let err = service.archive_shift(short.shift.id, "admin").unwrap_err();
        assert!(matches!(err, TillError::Conflict { invariant: "pending-origin", .. }));

        let open = manager.open_shift(location.id, Money::from_units(80), "op", None).unwrap();
        let err = service.archive_shift(open.shift.id, "admin").unwrap_err();
        assert!(matches!(err, TillError::InvalidState { .. }));
    }

    #[test]
    fn test_bulk_archive_reports_retained() {
        let (_temp_dir, storage) = create_test_storage();
        let settings = Settings::default();
        let location = setup(&storage);
        let sales = FixedSales(Money::zero());
        let manager = ShiftManager::new(&storage, &settings, &sales, &TrustedDirectory);
        let service = ArchiveService::new(&storage, &settings);

        // Short shift creates debt, the next one balances, then a surplus repays it
        let s1 = manager.open_shift(location.id, Money::from_units(100), "op", None).unwrap();
        manager.close_shift(s1.shift.id, Money::from_units(80), "op", None).unwrap();
        let s2 = manager.open_shift(location.id, Money::from_units(80), "op", None).unwrap();
        manager.close_shift(s2.shift.id, Money::from_units(90), "op", None).unwrap();
        let s3 = manager.open_shift(location.id, Money::from_units(80), "op", None).unwrap();

        let report = service
            .archive_before(location.id, storage.tick().unwrap(), "admin")
            .unwrap();

        assert_eq!(report.archived, vec![s2.shift.id]);
        assert!(report.retained.contains(&(s1.shift.id, RetainReason::PendingDebtOrigin)));
        assert!(report.retained.contains(&(s3.shift.id, RetainReason::StillOpen)));
        assert!(storage.shifts.get(s1.shift.id).unwrap().is_some());
    }
}
