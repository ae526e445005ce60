//! Recovery record table and repository
//!
//! Pending records of a location are always returned in FIFO order
//! (`created_at`, then `sequence`).

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::TillError;
use crate::models::{LocationId, Money, RecoveryId, RecoveryRecord, ShiftId};

use super::read_lock;

#[derive(Debug, Clone, Default)]
pub struct RecoveryTable {
    rows: HashMap<RecoveryId, RecoveryRecord>,
    /// Index: location_id -> record ids
    by_location: HashMap<LocationId, Vec<RecoveryId>>,
}

impl RecoveryTable {
    pub fn from_rows(records: Vec<RecoveryRecord>) -> Self {
        let mut table = Self::default();
        for record in records {
            table.upsert(record);
        }
        table
    }

    pub fn upsert(&mut self, record: RecoveryRecord) {
        if !self.rows.contains_key(&record.id) {
            self.by_location
                .entry(record.location_id)
                .or_default()
                .push(record.id);
        }
        self.rows.insert(record.id, record);
    }

    pub fn get(&self, id: RecoveryId) -> Option<&RecoveryRecord> {
        self.rows.get(&id)
    }

    fn for_location(&self, location_id: LocationId) -> impl Iterator<Item = &RecoveryRecord> {
        self.by_location
            .get(&location_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(|id| self.rows.get(id))
    }

    /// Pending records, oldest first
    pub fn pending_for(&self, location_id: LocationId) -> Vec<&RecoveryRecord> {
        let mut pending: Vec<_> = self
            .for_location(location_id)
            .filter(|r| r.is_pending())
            .collect();
        pending.sort_by_key(|r| r.queue_key());
        pending
    }

    pub fn pending_total(&self, location_id: LocationId) -> Money {
        self.for_location(location_id)
            .filter(|r| r.is_pending())
            .map(|r| r.debt_amount)
            .sum()
    }

    /// Pending records whose debt originated in the given shift
    pub fn pending_from_origin(&self, shift_id: ShiftId) -> Vec<&RecoveryRecord> {
        self.rows
            .values()
            .filter(|r| r.is_pending() && r.origin_shift_id == shift_id)
            .collect()
    }

    pub fn locations(&self) -> impl Iterator<Item = &LocationId> {
        self.by_location.keys()
    }

    pub fn max_sequence(&self) -> u64 {
        self.rows.values().map(|r| r.sequence).max().unwrap_or(0)
    }

    pub fn values(&self) -> impl Iterator<Item = &RecoveryRecord> {
        self.rows.values()
    }
}

pub struct RecoveryRepository {
    pub(super) table: RwLock<RecoveryTable>,
}

impl RecoveryRepository {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(RecoveryTable::default()),
        }
    }

    pub fn get(&self, id: RecoveryId) -> Result<Option<RecoveryRecord>, TillError> {
        Ok(read_lock(&self.table)?.get(id).cloned())
    }

    /// Pending records for a location in settlement order
    pub fn get_pending(&self, location_id: LocationId) -> Result<Vec<RecoveryRecord>, TillError> {
        let table = read_lock(&self.table)?;
        Ok(table.pending_for(location_id).into_iter().cloned().collect())
    }

    /// Authoritative outstanding debt, read under the table lock
    pub fn pending_total(&self, location_id: LocationId) -> Result<Money, TillError> {
        Ok(read_lock(&self.table)?.pending_total(location_id))
    }

    /// Every record for a location, pending or settled, oldest first
    pub fn get_history(&self, location_id: LocationId) -> Result<Vec<RecoveryRecord>, TillError> {
        let table = read_lock(&self.table)?;
        let mut records: Vec<_> = table.for_location(location_id).cloned().collect();
        records.sort_by_key(|r| r.queue_key());
        Ok(records)
    }

    pub fn pending_from_origin(&self, shift_id: ShiftId) -> Result<Vec<RecoveryRecord>, TillError> {
        let table = read_lock(&self.table)?;
        Ok(table
            .pending_from_origin(shift_id)
            .into_iter()
            .cloned()
            .collect())
    }
}

impl Default for RecoveryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_pending_sorted_fifo_with_sequence_tiebreak() {
        let location = LocationId::new();
        let t0 = Utc::now();
        let record = |amount: i64, at, seq| {
            RecoveryRecord::new(location, ShiftId::new(), Money::from_units(amount), at, seq)
        };
        let newer = record(5, t0 + Duration::minutes(5), 3);
        let tied_second = record(7, t0, 2);
        let tied_first = record(9, t0, 1);

        let table =
            RecoveryTable::from_rows(vec![newer.clone(), tied_second.clone(), tied_first.clone()]);
        let order: Vec<_> = table.pending_for(location).iter().map(|r| r.id).collect();

        assert_eq!(order, vec![tied_first.id, tied_second.id, newer.id]);
        assert_eq!(table.pending_total(location), Money::from_units(21));
        assert_eq!(table.max_sequence(), 3);
    }

    #[test]
    fn test_settled_records_excluded_from_pending() {
        let location = LocationId::new();
        let mut settled =
            RecoveryRecord::new(location, ShiftId::new(), Money::from_units(10), Utc::now(), 1);
        settled.apply(ShiftId::new(), Money::from_units(10), Utc::now());

        let table = RecoveryTable::from_rows(vec![settled]);
        assert!(table.pending_for(location).is_empty());
        assert!(table.pending_total(location).is_zero());
    }
}
