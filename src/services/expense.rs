//! Expense registry
//!
//! Records cash taken out of the drawer during an open shift. Each insertion
//! bumps the shift's cached running total in the same commit as the expense.

use std::time::Duration;

use tracing::info;

use crate::audit::{Action, AuditEntry, EntityType};
use crate::config::Settings;
use crate::error::{TillError, TillResult};
use crate::external::OperatorDirectory;
use crate::models::{Expense, Money, Shift, ShiftId};
use crate::storage::{LedgerChanges, Storage};

/// An expense together with the shift it updated
#[derive(Debug, Clone)]
pub struct ExpenseRecorded {
    pub expense: Expense,
    pub shift: Shift,
}

pub struct ExpenseRegistry<'a> {
    storage: &'a Storage,
    directory: &'a dyn OperatorDirectory,
    lock_timeout: Duration,
}

impl<'a> ExpenseRegistry<'a> {
    pub fn new(
        storage: &'a Storage,
        settings: &Settings,
        directory: &'a dyn OperatorDirectory,
    ) -> Self {
        Self {
            storage,
            directory,
            lock_timeout: settings.lock_timeout(),
        }
    }

    /// Record an expense against an open shift
    pub fn add_expense(
        &self,
        shift_id: ShiftId,
        amount: Money,
        reason: &str,
        operator_id: &str,
    ) -> TillResult<ExpenseRecorded> {
        let draft = Expense::new(shift_id, amount, reason.trim(), operator_id, chrono::Utc::now());
        draft
            .validate()
            .map_err(|e| TillError::validation(e.field(), e.to_string()))?;

        let location_id = self
            .storage
            .shifts
            .get(shift_id)?
            .ok_or_else(|| TillError::shift_not_found(shift_id.to_string()))?
            .location_id;

        let _guard = self.storage.lock_location(location_id, self.lock_timeout)?;

        // Re-read under the lock; a close may have won the race
        let mut shift = self
            .storage
            .shifts
            .get(shift_id)?
            .ok_or_else(|| TillError::shift_not_found(shift_id.to_string()))?;

        if !shift.is_open() {
            return Err(TillError::InvalidState {
                entity_type: "Shift",
                identifier: shift_id.to_string(),
                state: shift.state.to_string(),
                operation: "add an expense to",
            });
        }

        let timestamp = self.storage.tick()?;
        let expense = Expense {
            timestamp,
            ..draft
        };

        let before = shift.clone();
        shift.apply_expense(expense.amount);

        let actor = self.directory.resolve(operator_id).to_string();
        let mut changes = LedgerChanges::new();
        changes
            .insert_expense(expense.clone())
            .upsert_shift(shift.clone())
            .audit(
                AuditEntry::new(
                    &actor,
                    Action::AddExpense,
                    EntityType::Expense,
                    expense.id.to_string(),
                )
                .at(timestamp)
                .after(&expense),
            )
            .audit(
                AuditEntry::new(&actor, Action::AddExpense, EntityType::Shift, shift.id.to_string())
                    .at(timestamp)
                    .before(&before)
                    .after(&shift),
            );
        self.storage.commit(changes)?;

        info!(
            shift = %shift.id,
            amount = %expense.amount,
            running_total = %shift.expense_total,
            "Expense recorded"
        );

        Ok(ExpenseRecorded { expense, shift })
    }

    /// Expenses of a shift in the order they were taken
    pub fn list_expenses(&self, shift_id: ShiftId) -> TillResult<Vec<Expense>> {
        if self.storage.shifts.get(shift_id)?.is_none() {
            return Err(TillError::shift_not_found(shift_id.to_string()));
        }
        self.storage.expenses.get_by_shift(shift_id)
    }

    /// Cached running total of a shift's expenses
    pub fn running_total(&self, shift_id: ShiftId) -> TillResult<Money> {
        self.storage
            .shifts
            .get(shift_id)?
            .map(|s| s.expense_total)
            .ok_or_else(|| TillError::shift_not_found(shift_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::TillPaths;
    use crate::external::{NullSink, TrustedDirectory};
    use crate::models::{LocationId, ShiftState};
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

    fn open_shift(storage: &Storage) -> Shift {
        let shift = Shift::open(
            LocationId::new(),
            "op-1",
            Money::from_units(100),
            storage.tick().unwrap(),
        );
        let mut changes = LedgerChanges::new();
        changes.upsert_shift(shift.clone());
        storage.commit(changes).unwrap();
        shift
    }

    #[test]
    fn test_running_total_matches_rescan() {
        let (_temp_dir, storage) = create_test_storage();
        let settings = Settings::default();
        let registry = ExpenseRegistry::new(&storage, &settings, &TrustedDirectory);
        let shift = open_shift(&storage);

        registry
            .add_expense(shift.id, Money::from_units(30), "ice", "op-1")
            .unwrap();
        let recorded = registry
            .add_expense(shift.id, Money::from_cents(4050), "window cleaner", "op-1")
            .unwrap();

        assert_eq!(recorded.shift.expense_total, Money::from_cents(7050));
        assert_eq!(recorded.shift.expense_count, 2);
        assert_eq!(
            storage.expenses.sum_for_shift(shift.id).unwrap(),
            registry.running_total(shift.id).unwrap()
        );
        assert_eq!(registry.list_expenses(shift.id).unwrap().len(), 2);
    }

    #[test]
    fn test_zero_amount_is_validation_error() {
        let (_temp_dir, storage) = create_test_storage();
        let settings = Settings::default();
        let registry = ExpenseRegistry::new(&storage, &settings, &TrustedDirectory);
        let shift = open_shift(&storage);

        let err = registry
            .add_expense(shift.id, Money::zero(), "nothing", "op-1")
            .unwrap_err();
        assert!(matches!(err, TillError::Validation { field: "amount", .. }));
        assert!(storage.expenses.get_by_shift(shift.id).unwrap().is_empty());
    }

    #[test]
    fn test_closed_shift_is_invalid_state() {
        let (_temp_dir, storage) = create_test_storage();
        let settings = Settings::default();
        let registry = ExpenseRegistry::new(&storage, &settings, &TrustedDirectory);
        let mut shift = open_shift(&storage);
        shift.state = ShiftState::Closed;
        let mut changes = LedgerChanges::new();
        changes.upsert_shift(shift.clone());
        storage.commit(changes).unwrap();

        let err = registry
            .add_expense(shift.id, Money::from_units(5), "ice", "op-1")
            .unwrap_err();
        assert!(matches!(err, TillError::InvalidState { .. }));
    }

    #[test]
    fn test_unknown_shift_not_found() {
        let (_temp_dir, storage) = create_test_storage();
        let settings = Settings::default();
        let registry = ExpenseRegistry::new(&storage, &settings, &TrustedDirectory);

        let err = registry
            .add_expense(ShiftId::new(), Money::from_units(5), "ice", "op-1")
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
