//! Lock-free outstanding-debt snapshot.
//!
//! Holds the last committed outstanding debt per location so the suggested
//! opening amount can be served without taking the ledger locks. Values may
//! lag a commit in flight; closing a shift always re-reads the ledger.

use dashmap::DashMap;

use crate::models::{LocationId, Money};

use super::recovery::RecoveryTable;

pub struct DebtSnapshot {
    /// Map from location to its Pending debt total at the last commit
    debts: DashMap<LocationId, Money>,
}

impl DebtSnapshot {
    pub fn new() -> Self {
        Self {
            debts: DashMap::new(),
        }
    }

    /// Last committed debt; zero for a location that never owed anything
    pub fn get(&self, location_id: LocationId) -> Money {
        self.debts
            .get(&location_id)
            .map(|entry| *entry.value())
            .unwrap_or_default()
    }

    /// Recompute the listed locations from a committed table
    pub fn refresh<'a>(
        &self,
        table: &RecoveryTable,
        locations: impl IntoIterator<Item = &'a LocationId>,
    ) {
        for location_id in locations {
            let total = table.pending_total(*location_id);
            if total.is_zero() {
                self.debts.remove(location_id);
            } else {
                self.debts.insert(*location_id, total);
            }
        }
    }

    /// Rebuild from scratch after a load
    pub fn rebuild(&self, table: &RecoveryTable) {
        self.debts.clear();
        let locations: Vec<LocationId> = table.locations().copied().collect();
        self.refresh(table, &locations);
    }

    pub fn len(&self) -> usize {
        self.debts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.debts.is_empty()
    }
}

impl Default for DebtSnapshot {
    fn default() -> Self {
        Self::new()
    }
}
