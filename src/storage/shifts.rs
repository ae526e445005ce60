//! Shift table and repository
//!
//! Shifts are persisted inside the ledger image (see `ledger.rs`); this module
//! holds the in-memory table with its per-location index.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::TillError;
use crate::models::{LocationId, Shift, ShiftId};

use super::read_lock;

#[derive(Debug, Clone, Default)]
pub struct ShiftTable {
    rows: HashMap<ShiftId, Shift>,
    /// Index: location_id -> shift ids
    by_location: HashMap<LocationId, Vec<ShiftId>>,
}

impl ShiftTable {
    pub fn from_rows(shifts: Vec<Shift>) -> Self {
        let mut table = Self::default();
        for shift in shifts {
            table.upsert(shift);
        }
        table
    }

    pub fn upsert(&mut self, shift: Shift) {
        if !self.rows.contains_key(&shift.id) {
            self.by_location
                .entry(shift.location_id)
                .or_default()
                .push(shift.id);
        }
        self.rows.insert(shift.id, shift);
    }

    pub fn remove(&mut self, id: ShiftId) -> Option<Shift> {
        let shift = self.rows.remove(&id)?;
        if let Some(ids) = self.by_location.get_mut(&shift.location_id) {
            ids.retain(|&sid| sid != id);
        }
        Some(shift)
    }

    pub fn get(&self, id: ShiftId) -> Option<&Shift> {
        self.rows.get(&id)
    }

    pub fn for_location(&self, location_id: LocationId) -> impl Iterator<Item = &Shift> {
        self.by_location
            .get(&location_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(|id| self.rows.get(id))
    }

    /// Every open shift at the location; more than one means the table is invalid
    pub fn open_for(&self, location_id: LocationId) -> Vec<&Shift> {
        self.for_location(location_id).filter(|s| s.is_open()).collect()
    }

    pub fn values(&self) -> impl Iterator<Item = &Shift> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub struct ShiftRepository {
    pub(super) table: RwLock<ShiftTable>,
}

impl ShiftRepository {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(ShiftTable::default()),
        }
    }

    pub fn get(&self, id: ShiftId) -> Result<Option<Shift>, TillError> {
        Ok(read_lock(&self.table)?.get(id).cloned())
    }

    /// Look up a shift by full id or by its abbreviated display form
    pub fn find(&self, identifier: &str) -> Result<Option<Shift>, TillError> {
        let identifier = identifier.trim();
        if let Ok(id) = identifier.parse::<ShiftId>() {
            return self.get(id);
        }

        let table = read_lock(&self.table)?;
        let mut matches = table.values().filter(|s| s.id.to_string() == identifier);
        match (matches.next(), matches.next()) {
            (Some(shift), None) => Ok(Some(shift.clone())),
            _ => Ok(None),
        }
    }

    /// The open shift at a location, if any
    pub fn find_open(&self, location_id: LocationId) -> Result<Option<Shift>, TillError> {
        let table = read_lock(&self.table)?;
        Ok(table.open_for(location_id).first().map(|s| (*s).clone()))
    }

    /// All shifts at a location, oldest first
    pub fn get_by_location(&self, location_id: LocationId) -> Result<Vec<Shift>, TillError> {
        let table = read_lock(&self.table)?;
        let mut shifts: Vec<_> = table.for_location(location_id).cloned().collect();
        shifts.sort_by(|a, b| a.opened_at.cmp(&b.opened_at));
        Ok(shifts)
    }

    pub fn count(&self) -> Result<usize, TillError> {
        Ok(read_lock(&self.table)?.len())
    }
}

impl Default for ShiftRepository {
    fn default() -> Self {
        Self::new()
    }
}
