//! Ledger image and change sets
//!
//! Shifts, expenses and recovery records are written together as one JSON
//! image. A mutating operation stages everything it wants to change in a
//! [`LedgerChanges`] and hands it to `Storage::commit`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::audit::AuditEntry;
use crate::error::TillError;
use crate::models::{Expense, LocationId, RecoveryRecord, Shift, ShiftId};

use super::expenses::ExpenseTable;
use super::recovery::RecoveryTable;
use super::shifts::ShiftTable;

pub const LEDGER_SCHEMA_VERSION: u32 = 1;

/// On-disk form of the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerImage {
    pub schema_version: u32,
    /// Bumped on every commit; a process whose tables carry an older
    /// generation reloads before it decides anything
    #[serde(default)]
    pub generation: u64,
    #[serde(default)]
    pub shifts: Vec<Shift>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub recovery_records: Vec<RecoveryRecord>,
}

impl Default for LedgerImage {
    fn default() -> Self {
        Self {
            schema_version: LEDGER_SCHEMA_VERSION,
            generation: 0,
            shifts: Vec::new(),
            expenses: Vec::new(),
            recovery_records: Vec::new(),
        }
    }
}

impl LedgerImage {
    /// Build a deterministic image: rows sorted so diffs of the file stay small
    pub fn from_tables(
        generation: u64,
        shifts: &ShiftTable,
        expenses: &ExpenseTable,
        records: &RecoveryTable,
    ) -> Self {
        let mut shifts: Vec<_> = shifts.values().cloned().collect();
        shifts.sort_by(|a, b| a.opened_at.cmp(&b.opened_at).then(a.id.cmp(&b.id)));

        let mut expenses: Vec<_> = expenses.values().cloned().collect();
        expenses.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));

        let mut recovery_records: Vec<_> = records.values().cloned().collect();
        recovery_records.sort_by_key(|r| r.queue_key());

        Self {
            schema_version: LEDGER_SCHEMA_VERSION,
            generation,
            shifts,
            expenses,
            recovery_records,
        }
    }

    pub fn into_tables(self) -> (ShiftTable, ExpenseTable, RecoveryTable) {
        (
            ShiftTable::from_rows(self.shifts),
            ExpenseTable::from_rows(self.expenses),
            RecoveryTable::from_rows(self.recovery_records),
        )
    }
}

/// Everything one operation changes, applied all-or-nothing
#[derive(Debug, Default)]
pub struct LedgerChanges {
    pub(super) shifts: Vec<Shift>,
    pub(super) expenses: Vec<Expense>,
    pub(super) records: Vec<RecoveryRecord>,
    pub(super) removed_shifts: Vec<ShiftId>,
    pub(super) audit: Vec<AuditEntry>,
}

impl LedgerChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_shift(&mut self, shift: Shift) -> &mut Self {
        self.shifts.push(shift);
        self
    }

    pub fn insert_expense(&mut self, expense: Expense) -> &mut Self {
        self.expenses.push(expense);
        self
    }

    pub fn upsert_record(&mut self, record: RecoveryRecord) -> &mut Self {
        self.records.push(record);
        self
    }

    /// Remove a shift together with the expenses it owns
    pub fn remove_shift(&mut self, shift_id: ShiftId) -> &mut Self {
        self.removed_shifts.push(shift_id);
        self
    }

    pub fn audit(&mut self, entry: AuditEntry) -> &mut Self {
        self.audit.push(entry);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.shifts.is_empty()
            && self.expenses.is_empty()
            && self.records.is_empty()
            && self.removed_shifts.is_empty()
    }

    /// Apply onto copies of the live tables and check the ledger invariants.
    ///
    /// Returns the locations whose shifts or debt changed.
    pub(super) fn apply_to(
        &self,
        shifts: &mut ShiftTable,
        expenses: &mut ExpenseTable,
        records: &mut RecoveryTable,
    ) -> Result<BTreeSet<LocationId>, TillError> {
        let mut touched = BTreeSet::new();

        for shift_id in &self.removed_shifts {
            if let Some(origin) = records.pending_from_origin(*shift_id).first() {
                return Err(TillError::conflict(
                    "pending-origin",
                    format!(
                        "Shift {} is the origin of pending recovery record {}",
                        shift_id, origin.id
                    ),
                ));
            }
            if let Some(shift) = shifts.remove(*shift_id) {
                touched.insert(shift.location_id);
            }
            expenses.remove_for_shift(*shift_id);
        }

        for shift in &self.shifts {
            touched.insert(shift.location_id);
            shifts.upsert(shift.clone());
        }

        for expense in &self.expenses {
            if shifts.get(expense.shift_id).is_none() {
                return Err(TillError::shift_not_found(expense.shift_id.to_string()));
            }
            expenses.insert(expense.clone());
        }

        for record in &self.records {
            if record.debt_amount.is_negative() {
                return Err(TillError::conflict(
                    "non-negative-debt",
                    format!("Recovery record {} would carry negative debt", record.id),
                ));
            }
            touched.insert(record.location_id);
            records.upsert(record.clone());
        }

        for location_id in &touched {
            let open = shifts.open_for(*location_id);
            if open.len() > 1 {
                return Err(TillError::conflict(
                    "single-open-shift",
                    format!("Location {} would have {} open shifts", location_id, open.len()),
                ));
            }
        }

        Ok(touched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Money;
    use chrono::Utc;

    #[test]
    fn test_second_open_shift_rejected() {
        let location = LocationId::new();
        let mut shifts = ShiftTable::from_rows(vec![Shift::open(
            location,
            "op",
            Money::from_units(100),
            Utc::now(),
        )]);

        let mut changes = LedgerChanges::new();
        changes.upsert_shift(Shift::open(location, "op", Money::from_units(100), Utc::now()));

        let err = changes
            .apply_to(&mut shifts, &mut ExpenseTable::default(), &mut RecoveryTable::default())
            .unwrap_err();
        assert!(matches!(err, TillError::Conflict { invariant: "single-open-shift", .. }));
    }

    #[test]
    fn test_pending_origin_cannot_be_removed() {
        let location = LocationId::new();
        let shift = Shift::open(location, "op", Money::from_units(100), Utc::now());
        let record = RecoveryRecord::new(location, shift.id, Money::from_units(20), Utc::now(), 1);

        let mut shifts = ShiftTable::from_rows(vec![shift.clone()]);
        let mut records = RecoveryTable::from_rows(vec![record]);
        let mut changes = LedgerChanges::new();
        changes.remove_shift(shift.id);

        let err = changes
            .apply_to(&mut shifts, &mut ExpenseTable::default(), &mut records)
            .unwrap_err();
        assert!(matches!(err, TillError::Conflict { invariant: "pending-origin", .. }));
    }

    #[test]
    fn test_expense_for_unknown_shift_rejected() {
        let mut changes = LedgerChanges::new();
        changes.insert_expense(Expense::new(
            ShiftId::new(),
            Money::from_units(5),
            "ice",
            "op",
            Utc::now(),
        ));

        let err = changes
            .apply_to(
                &mut ShiftTable::default(),
                &mut ExpenseTable::default(),
                &mut RecoveryTable::default(),
            )
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_image_round_trips_through_tables() {
        let location = LocationId::new();
        let shift = Shift::open(location, "op", Money::from_units(100), Utc::now());
        let expense = Expense::new(shift.id, Money::from_units(5), "ice", "op", Utc::now());
        let image = LedgerImage {
            schema_version: LEDGER_SCHEMA_VERSION,
            generation: 3,
            shifts: vec![shift.clone()],
            expenses: vec![expense],
            recovery_records: Vec::new(),
        };

        let (shifts, expenses, records) = image.into_tables();
        let rebuilt = LedgerImage::from_tables(3, &shifts, &expenses, &records);
        assert_eq!(rebuilt.shifts, vec![shift]);
        assert_eq!(rebuilt.expenses.len(), 1);
    }
}
