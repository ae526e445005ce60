//! Recovery ledger
//!
//! Float debt per location, kept as a FIFO queue of Pending recovery records.
//! A shift's cash surplus is applied oldest-debt-first; a record only becomes
//! Settled once its debt reaches zero.
//!
//! Only debt recorded before a shift opened can be repaid by that shift, and
//! a shift never applies to the same record twice.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::audit::{Action, AuditEntry, EntityType};
use crate::config::Settings;
use crate::error::{TillError, TillResult};
use crate::external::OperatorDirectory;
use crate::models::{LocationId, Money, RecoveryRecord, SettlementAction, Shift, ShiftId};
use crate::storage::{LedgerChanges, Storage};

/// Outcome of applying a surplus to a location's queue, before it is committed
#[derive(Debug, Clone, Default)]
pub struct SettlementPlan {
    /// Records as they will look after the settlement
    pub updated: Vec<RecoveryRecord>,
    pub actions: Vec<SettlementAction>,
    /// Surplus left after every eligible record was served
    pub unapplied: Money,
}

impl SettlementPlan {
    pub fn applied_total(&self) -> Money {
        self.actions.iter().map(|a| a.applied).sum()
    }

    /// Stage the updated records and one audit entry per action
    pub fn stage(&self, changes: &mut LedgerChanges, actor: &str, at: DateTime<Utc>) {
        for (record, action) in self.updated.iter().zip(&self.actions) {
            changes.upsert_record(record.clone()).audit(
                AuditEntry::new(
                    actor,
                    Action::Settle,
                    EntityType::RecoveryRecord,
                    record.id.to_string(),
                )
                .at(at)
                .before(&PendingView::before(record, action))
                .after(&PendingView::from(record)),
            );
        }
    }
}

/// Compact before/after view of a record for audit diffs
#[derive(serde::Serialize)]
struct PendingView {
    debt_amount: Money,
    state: String,
}

impl PendingView {
    fn before(record: &RecoveryRecord, action: &SettlementAction) -> Self {
        Self {
            debt_amount: record.debt_amount + action.applied,
            state: "Pending".to_string(),
        }
    }
}

impl From<&RecoveryRecord> for PendingView {
    fn from(record: &RecoveryRecord) -> Self {
        Self {
            debt_amount: record.debt_amount,
            state: record.state.to_string(),
        }
    }
}

/// Greedily apply `surplus` to `pending` in FIFO order on behalf of `settling`.
///
/// `pending` may be in any order. Records created at or after the settling
/// shift opened, and records this shift already paid into, are skipped.
pub fn plan_settlement(
    pending: &[RecoveryRecord],
    settling: &Shift,
    surplus: Money,
    at: DateTime<Utc>,
) -> SettlementPlan {
    let mut queue: Vec<&RecoveryRecord> = pending
        .iter()
        .filter(|r| r.is_pending())
        .filter(|r| r.created_at < settling.opened_at)
        .filter(|r| !r.applied_by(settling.id))
        .collect();
    queue.sort_by_key(|r| r.queue_key());

    let mut plan = SettlementPlan {
        unapplied: surplus.positive_part(),
        ..SettlementPlan::default()
    };

    for record in queue {
        if !plan.unapplied.is_positive() {
            break;
        }

        let mut updated = record.clone();
        let applied = updated.apply(settling.id, plan.unapplied, at);
        plan.unapplied -= applied;

        debug!(
            record = %updated.id,
            applied = %applied,
            remaining = %updated.debt_amount,
            "Planned settlement"
        );

        plan.actions.push(SettlementAction {
            record_id: updated.id,
            origin_shift_id: updated.origin_shift_id,
            applied,
            remaining_debt: updated.debt_amount,
            settled: !updated.is_pending(),
        });
        plan.updated.push(updated);
    }

    plan
}

pub struct RecoveryLedger<'a> {
    storage: &'a Storage,
    directory: &'a dyn OperatorDirectory,
    lock_timeout: Duration,
}

impl<'a> RecoveryLedger<'a> {
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

    /// Outstanding debt from the lock-free snapshot.
    ///
    /// Advisory only: it may trail a commit that is still in flight.
    pub fn outstanding_debt(&self, location_id: LocationId) -> Money {
        self.storage.debt_snapshot.get(location_id)
    }

    /// Outstanding debt read from the ledger tables
    pub fn committed_debt(&self, location_id: LocationId) -> TillResult<Money> {
        self.storage.recovery.pending_total(location_id)
    }

    /// Pending records in settlement order
    pub fn pending_records(&self, location_id: LocationId) -> TillResult<Vec<RecoveryRecord>> {
        self.storage.recovery.get_pending(location_id)
    }

    /// Every record for a location, oldest first
    pub fn history(&self, location_id: LocationId) -> TillResult<Vec<RecoveryRecord>> {
        self.storage.recovery.get_history(location_id)
    }

    /// Build a Pending record originating at `shift`; `None` for a zero amount
    pub fn new_record(
        &self,
        shift: &Shift,
        amount: Money,
        created_at: DateTime<Utc>,
    ) -> Option<RecoveryRecord> {
        if !amount.is_positive() {
            return None;
        }
        Some(RecoveryRecord::new(
            shift.location_id,
            shift.id,
            amount,
            created_at,
            self.storage.next_sequence(),
        ))
    }

    /// Record a shortfall against a shift's location and commit it.
    ///
    /// Returns `None` without writing anything when `amount` is zero.
    pub fn record_shortfall(
        &self,
        shift_id: ShiftId,
        amount: Money,
        operator_id: &str,
    ) -> TillResult<Option<RecoveryRecord>> {
        if amount.is_negative() {
            return Err(TillError::validation(
                "amount",
                format!("Shortfall cannot be negative (got {})", amount),
            ));
        }
        if amount.is_zero() {
            return Ok(None);
        }

        let shift = self.load_shift(shift_id)?;
        let _guard = self.storage.lock_location(shift.location_id, self.lock_timeout)?;

        let created_at = self.storage.tick()?;
        let Some(record) = self.new_record(&shift, amount, created_at) else {
            return Ok(None);
        };

        let actor = self.directory.resolve(operator_id).to_string();
        let mut changes = LedgerChanges::new();
        changes.upsert_record(record.clone()).audit(
            AuditEntry::new(
                &actor,
                Action::RecordShortfall,
                EntityType::RecoveryRecord,
                record.id.to_string(),
            )
            .at(created_at)
            .after(&record),
        );
        self.storage.commit(changes)?;

        info!(
            location = %record.location_id,
            record = %record.id,
            amount = %amount,
            "Shortfall recorded"
        );
        Ok(Some(record))
    }

    /// Apply a surplus from `shift_id` to its location's pending debt and commit
    pub fn try_settle(
        &self,
        shift_id: ShiftId,
        available_surplus: Money,
        operator_id: &str,
    ) -> TillResult<Vec<SettlementAction>> {
        if available_surplus.is_negative() {
            return Err(TillError::validation(
                "available_surplus",
                format!("Surplus cannot be negative (got {})", available_surplus),
            ));
        }

        let shift = self.load_shift(shift_id)?;
        let _guard = self.storage.lock_location(shift.location_id, self.lock_timeout)?;

        let pending = self.storage.recovery.get_pending(shift.location_id)?;
        let at = self.storage.tick()?;
        let plan = plan_settlement(&pending, &shift, available_surplus, at);
        if plan.actions.is_empty() {
            return Ok(Vec::new());
        }

        let actor = self.directory.resolve(operator_id).to_string();
        let mut changes = LedgerChanges::new();
        plan.stage(&mut changes, &actor, at);
        self.storage.commit(changes)?;

        info!(
            location = %shift.location_id,
            shift = %shift.id,
            applied = %plan.applied_total(),
            unapplied = %plan.unapplied,
            records = plan.actions.len(),
            "Debt settled"
        );
        Ok(plan.actions)
    }

    fn load_shift(&self, shift_id: ShiftId) -> TillResult<Shift> {
        self.storage
            .shifts
            .get(shift_id)?
            .ok_or_else(|| TillError::shift_not_found(shift_id.to_string()))
    }
}
