//! Shift manager
//!
//! Opens and closes shifts. Every mutation on a location runs under that
//! location's lock, and closing a shift (balance, settlement of older debt,
//! any new shortfall, terminal shift state) is committed as one ledger write.

use tracing::{info, warn};

use crate::audit::{Action, AuditEntry, EntityType};
use crate::config::Settings;
use crate::error::{TillError, TillResult};
use crate::external::{OperatorDirectory, SalesAggregator};
use crate::models::{
    ClosingFigures, Location, LocationId, Money, RecoveryRecord, SettlementAction, Shift, ShiftId,
};
use crate::storage::{LedgerChanges, Storage};

use super::reconciliation::ReconciliationValidator;
use super::recovery::{plan_settlement, RecoveryLedger};

/// Result of opening a shift
#[derive(Debug, Clone)]
pub struct OpenedShift {
    pub shift: Shift,
    /// max(0, float - outstanding debt) at the time of opening
    pub suggested_amount: Money,
    pub outstanding_debt: Money,
    /// Record created for justified under-funding, when that is tracked
    pub recovery_delta: Option<RecoveryRecord>,
}

/// Result of closing a shift
#[derive(Debug, Clone)]
pub struct ClosedShiftSummary {
    pub shift: Shift,
    pub expected_balance: Money,
    pub variance: Money,
    pub flagged_for_review: bool,
    pub shortfall_created: Option<RecoveryRecord>,
    pub settlements: Vec<SettlementAction>,
    /// Surplus over float that no eligible debt absorbed
    pub unapplied_surplus: Money,
}

pub struct ShiftManager<'a> {
    storage: &'a Storage,
    settings: &'a Settings,
    sales: &'a dyn SalesAggregator,
    directory: &'a dyn OperatorDirectory,
    validator: ReconciliationValidator,
    ledger: RecoveryLedger<'a>,
}

impl<'a> ShiftManager<'a> {
    pub fn new(
        storage: &'a Storage,
        settings: &'a Settings,
        sales: &'a dyn SalesAggregator,
        directory: &'a dyn OperatorDirectory,
    ) -> Self {
        Self {
            storage,
            settings,
            sales,
            directory,
            validator: ReconciliationValidator::from_settings(settings),
            ledger: RecoveryLedger::new(storage, settings, directory),
        }
    }

    /// Open a shift at a location.
    ///
    /// Opening below the float is accepted without a justification only when
    /// the gap is covered by outstanding debt, i.e. `proposed >= suggested`.
    pub fn open_shift(
        &self,
        location_id: LocationId,
        proposed_amount: Money,
        operator_id: &str,
        justification: Option<&str>,
    ) -> TillResult<OpenedShift> {
        if proposed_amount.is_negative() {
            return Err(TillError::validation(
                "opening_amount",
                format!("Opening amount cannot be negative (got {})", proposed_amount),
            ));
        }
        let operator_id = operator_id.trim();
        if operator_id.is_empty() {
            return Err(TillError::validation("operator_id", "Operator is required"));
        }
        let justification = justification
            .map(str::trim)
            .filter(|j| !j.is_empty())
            .map(String::from);

        let location = self.location(location_id)?;
        let _guard = self
            .storage
            .lock_location(location_id, self.settings.lock_timeout())?;

        if let Some(open) = self.storage.shifts.find_open(location_id)? {
            return Err(TillError::conflict(
                "single-open-shift",
                format!("{} already has open shift {}", location.name, open.id),
            ));
        }

        let outstanding_debt = self.storage.recovery.pending_total(location_id)?;
        let suggested_amount = (location.fixed_float - outstanding_debt).positive_part();
        let unexplained_gap = (suggested_amount - proposed_amount).positive_part();

        if unexplained_gap.is_positive() && justification.is_none() {
            return Err(TillError::validation(
                "justification",
                format!(
                    "Opening with {} is {} below the float of {} beyond outstanding debt of {}; \
                     proceeding requires a justification",
                    proposed_amount, unexplained_gap, location.fixed_float, outstanding_debt
                ),
            ));
        }

        let opened_at = self.storage.tick()?;
        let mut shift = Shift::open(location_id, operator_id, proposed_amount, opened_at);
        shift.justification = justification;

        let actor = self.directory.resolve(operator_id).to_string();
        let mut changes = LedgerChanges::new();
        changes.upsert_shift(shift.clone()).audit(
            AuditEntry::new(&actor, Action::OpenShift, EntityType::Shift, shift.id.to_string())
                .at(opened_at)
                .after(&shift),
        );

        let recovery_delta = if self.settings.track_justified_underfunding
            && unexplained_gap.is_positive()
        {
            let created_at = self.storage.tick()?;
            let record = self.ledger.new_record(&shift, unexplained_gap, created_at);
            if let Some(record) = &record {
                changes.upsert_record(record.clone()).audit(
                    AuditEntry::new(
                        &actor,
                        Action::RecordShortfall,
                        EntityType::RecoveryRecord,
                        record.id.to_string(),
                    )
                    .at(created_at)
                    .after(record),
                );
            }
            record
        } else {
            None
        };

        self.storage.commit(changes)?;

        if unexplained_gap.is_positive() {
            warn!(
                location = %location.name,
                shift = %shift.id,
                gap = %unexplained_gap,
                "Shift opened below float with justification"
            );
        }
        info!(
            location = %location.name,
            shift = %shift.id,
            opening = %proposed_amount,
            suggested = %suggested_amount,
            "Shift opened"
        );

        Ok(OpenedShift {
            shift,
            suggested_amount,
            outstanding_debt,
            recovery_delta,
        })
    }

    /// Close an open shift.
    ///
    /// Surplus over the float repays older debt first. A count below the float
    /// records the part of the shortfall that is not already carried as debt.
    pub fn close_shift(
        &self,
        shift_id: ShiftId,
        counted_cash: Money,
        operator_id: &str,
        observations: Option<&str>,
    ) -> TillResult<ClosedShiftSummary> {
        ReconciliationValidator::validate_count(counted_cash)?;

        let location_id = self.load_shift(shift_id)?.location_id;
        let _guard = self
            .storage
            .lock_location(location_id, self.settings.lock_timeout())?;

        let mut shift = self.load_shift(shift_id)?;
        if !shift.is_open() {
            return Err(TillError::InvalidState {
                entity_type: "Shift",
                identifier: shift_id.to_string(),
                state: shift.state.to_string(),
                operation: "close",
            });
        }
        let location = self.location(location_id)?;

        let cash_sales_total = self.sales.cash_sales_total(shift_id)?;
        let balance = self
            .validator
            .compute_closing_balance(&shift, cash_sales_total, counted_cash);

        let closed_at = self.storage.tick()?;

        let pending = self.storage.recovery.get_pending(location_id)?;
        let carried_before: Money = pending.iter().map(|r| r.debt_amount).sum();
        let surplus =
            ReconciliationValidator::determine_surplus(counted_cash, location.fixed_float);
        let plan = plan_settlement(&pending, &shift, surplus, closed_at);
        let carried_after = carried_before - plan.applied_total();

        // Carried debt only explains the part of the shortfall the drawer
        // already lacked when it opened
        let shortfall =
            ReconciliationValidator::determine_shortfall(counted_cash, location.fixed_float);
        let opening_gap = (location.fixed_float - shift.opening_amount).positive_part();
        let explained = carried_after.min(opening_gap);
        let new_debt = (shortfall - explained).positive_part();

        let before = shift.clone();
        shift.close(
            ClosingFigures {
                counted_cash,
                cash_sales_total,
                expected_balance: balance.expected_balance,
                variance: balance.variance,
                flagged_for_review: balance.flagged_for_review,
            },
            operator_id.trim(),
            observations
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from),
            closed_at,
        );

        let actor = self.directory.resolve(operator_id).to_string();
        let mut changes = LedgerChanges::new();
        changes.upsert_shift(shift.clone()).audit(
            AuditEntry::new(&actor, Action::CloseShift, EntityType::Shift, shift.id.to_string())
                .at(closed_at)
                .before(&before)
                .after(&shift),
        );
        plan.stage(&mut changes, &actor, closed_at);

        let shortfall_created = if new_debt.is_positive() {
            let created_at = self.storage.tick()?;
            let record = self.ledger.new_record(&shift, new_debt, created_at);
            if let Some(record) = &record {
                changes.upsert_record(record.clone()).audit(
                    AuditEntry::new(
                        &actor,
                        Action::RecordShortfall,
                        EntityType::RecoveryRecord,
                        record.id.to_string(),
                    )
                    .at(created_at)
                    .after(record),
                );
            }
            record
        } else {
            None
        };

        self.storage.commit(changes)?;

        if balance.flagged_for_review {
            warn!(
                location = %location.name,
                shift = %shift.id,
                variance = %balance.variance,
                tolerance = %self.validator.tolerance(),
                "Variance beyond tolerance, shift flagged for review"
            );
        }
        info!(
            location = %location.name,
            shift = %shift.id,
            counted = %counted_cash,
            expected = %balance.expected_balance,
            variance = %balance.variance,
            settled = plan.actions.len(),
            new_debt = %new_debt,
            "Shift closed"
        );

        Ok(ClosedShiftSummary {
            shift,
            expected_balance: balance.expected_balance,
            variance: balance.variance,
            flagged_for_review: balance.flagged_for_review,
            shortfall_created,
            settlements: plan.actions,
            unapplied_surplus: plan.unapplied,
        })
    }

    /// The open shift at a location, if any
    pub fn current_shift(&self, location_id: LocationId) -> TillResult<Option<Shift>> {
        self.location(location_id)?;
        self.storage.shifts.find_open(location_id)
    }

    /// Advisory opening amount served from the debt snapshot
    pub fn suggested_opening_amount(&self, location_id: LocationId) -> TillResult<Money> {
        let location = self.location(location_id)?;
        let debt = self.ledger.outstanding_debt(location_id);
        Ok((location.fixed_float - debt).positive_part())
    }

    pub fn outstanding_debt(&self, location_id: LocationId) -> TillResult<Money> {
        self.location(location_id)?;
        Ok(self.ledger.outstanding_debt(location_id))
    }

    /// All shifts at a location, oldest first
    pub fn list_shifts(&self, location_id: LocationId) -> TillResult<Vec<Shift>> {
        self.location(location_id)?;
        self.storage.shifts.get_by_location(location_id)
    }

    pub fn get_shift(&self, shift_id: ShiftId) -> TillResult<Shift> {
        self.load_shift(shift_id)
    }

    /// Find a shift by full or abbreviated id
    pub fn find_shift(&self, identifier: &str) -> TillResult<Shift> {
        self.storage
            .shifts
            .find(identifier)?
            .ok_or_else(|| TillError::shift_not_found(identifier))
    }

    fn load_shift(&self, shift_id: ShiftId) -> TillResult<Shift> {
        self.storage
            .shifts
            .get(shift_id)?
            .ok_or_else(|| TillError::shift_not_found(shift_id.to_string()))
    }

    fn location(&self, location_id: LocationId) -> TillResult<Location> {
        self.storage
            .locations
            .get(location_id)?
            .ok_or_else(|| TillError::location_not_found(location_id.to_string()))
    }
}
