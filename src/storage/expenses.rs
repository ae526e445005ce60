//! Expense table and repository

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::TillError;
use crate::models::{Expense, ExpenseId, Money, ShiftId};

use super::read_lock;

#[derive(Debug, Clone, Default)]
pub struct ExpenseTable {
    rows: HashMap<ExpenseId, Expense>,
    /// Index: shift_id -> expense ids
    by_shift: HashMap<ShiftId, Vec<ExpenseId>>,
}

impl ExpenseTable {
    pub fn from_rows(expenses: Vec<Expense>) -> Self {
        let mut table = Self::default();
        for expense in expenses {
            table.insert(expense);
        }
        table
    }

    /// Expenses are immutable; re-inserting an existing id is ignored
    pub fn insert(&mut self, expense: Expense) -> bool {
        if self.rows.contains_key(&expense.id) {
            return false;
        }
        self.by_shift
            .entry(expense.shift_id)
            .or_default()
            .push(expense.id);
        self.rows.insert(expense.id, expense);
        true
    }

    /// Drop every expense owned by a shift
    pub fn remove_for_shift(&mut self, shift_id: ShiftId) -> Vec<Expense> {
        self.by_shift
            .remove(&shift_id)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|id| self.rows.remove(&id))
            .collect()
    }

    pub fn for_shift(&self, shift_id: ShiftId) -> impl Iterator<Item = &Expense> {
        self.by_shift
            .get(&shift_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(|id| self.rows.get(id))
    }

    pub fn values(&self) -> impl Iterator<Item = &Expense> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

pub struct ExpenseRepository {
    pub(super) table: RwLock<ExpenseTable>,
}

impl ExpenseRepository {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(ExpenseTable::default()),
        }
    }

    pub fn get(&self, id: ExpenseId) -> Result<Option<Expense>, TillError> {
        let table = read_lock(&self.table)?;
        Ok(table.rows.get(&id).cloned())
    }

    /// Expenses of a shift in the order they were taken
    pub fn get_by_shift(&self, shift_id: ShiftId) -> Result<Vec<Expense>, TillError> {
        let table = read_lock(&self.table)?;
        let mut expenses: Vec<_> = table.for_shift(shift_id).cloned().collect();
        expenses.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(expenses)
    }

    /// Full re-scan of a shift's expenses
    pub fn sum_for_shift(&self, shift_id: ShiftId) -> Result<Money, TillError> {
        let table = read_lock(&self.table)?;
        Ok(table.for_shift(shift_id).map(|e| e.amount).sum())
    }

    pub fn count(&self) -> Result<usize, TillError> {
        Ok(read_lock(&self.table)?.len())
    }
}

impl Default for ExpenseRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_insert_is_idempotent_per_id() {
        let shift = ShiftId::new();
        let expense = Expense::new(shift, Money::from_units(5), "ice", "op", Utc::now());
        let mut table = ExpenseTable::default();

        assert!(table.insert(expense.clone()));
        assert!(!table.insert(expense));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_remove_for_shift() {
        let keep = ShiftId::new();
        let drop = ShiftId::new();
        let mut table = ExpenseTable::from_rows(vec![
            Expense::new(keep, Money::from_units(1), "a", "op", Utc::now()),
            Expense::new(drop, Money::from_units(2), "b", "op", Utc::now()),
            Expense::new(drop, Money::from_units(3), "c", "op", Utc::now()),
        ]);

        let removed = table.remove_for_shift(drop);
        assert_eq!(removed.len(), 2);
        assert_eq!(table.len(), 1);
        assert_eq!(table.for_shift(keep).count(), 1);
    }
}
