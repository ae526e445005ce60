//! Recovery record model
//!
//! A recovery record is a durable float debt: cash a location is short of its
//! fixed float, carried forward until a later shift's surplus repays it.
//!
//! Records move `Pending -> Settled`. Partial repayments keep a record
//! `Pending` with a smaller `debt_amount`; every repayment is kept in
//! `applications` so the settlement trail can be audited.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{LocationId, RecoveryId, ShiftId};
use super::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryState {
    #[default]
    Pending,
    Settled,
}

impl fmt::Display for RecoveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Settled => write!(f, "Settled"),
        }
    }
}

/// One repayment applied to a record by a settling shift
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub shift_id: ShiftId,
    pub amount: Money,
    pub applied_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryRecord {
    pub id: RecoveryId,

    pub location_id: LocationId,

    /// Outstanding debt; never negative
    pub debt_amount: Money,

    /// Debt at creation
    pub original_amount: Money,

    #[serde(default)]
    pub state: RecoveryState,

    /// Shift whose opening or close produced the shortfall
    pub origin_shift_id: ShiftId,

    /// Shift that cleared the last of the debt
    pub settling_shift_id: Option<ShiftId>,

    pub created_at: DateTime<Utc>,

    pub settled_at: Option<DateTime<Utc>>,

    /// Tie-breaker for records created in the same instant
    #[serde(default)]
    pub sequence: u64,

    #[serde(default)]
    pub applications: Vec<Application>,
}

impl RecoveryRecord {
    pub fn new(
        location_id: LocationId,
        origin_shift_id: ShiftId,
        amount: Money,
        created_at: DateTime<Utc>,
        sequence: u64,
    ) -> Self {
        Self {
            id: RecoveryId::new(),
            location_id,
            debt_amount: amount,
            original_amount: amount,
            state: RecoveryState::Pending,
            origin_shift_id,
            settling_shift_id: None,
            created_at,
            settled_at: None,
            sequence,
            applications: Vec::new(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state == RecoveryState::Pending
    }

    /// Total repaid so far
    pub fn repaid(&self) -> Money {
        self.original_amount - self.debt_amount
    }

    /// Whether `shift_id` has already applied a repayment to this record
    pub fn applied_by(&self, shift_id: ShiftId) -> bool {
        self.applications.iter().any(|a| a.shift_id == shift_id)
    }

    /// FIFO sort key: oldest first, creation order breaks ties
    pub fn queue_key(&self) -> (DateTime<Utc>, u64) {
        (self.created_at, self.sequence)
    }

    /// Apply up to `available` against the debt and return what was absorbed
    pub fn apply(&mut self, shift_id: ShiftId, available: Money, at: DateTime<Utc>) -> Money {
        if !self.is_pending() || !available.is_positive() {
            return Money::zero();
        }

        let absorbed = available.min(self.debt_amount);
        self.debt_amount -= absorbed;
        self.applications.push(Application {
            shift_id,
            amount: absorbed,
            applied_at: at,
        });

        if self.debt_amount.is_zero() {
            self.state = RecoveryState::Settled;
            self.settling_shift_id = Some(shift_id);
            self.settled_at = Some(at);
        }

        absorbed
    }
}

/// What a settlement did to one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementAction {
    pub record_id: RecoveryId,
    pub origin_shift_id: ShiftId,
    pub applied: Money,
    pub remaining_debt: Money,
    pub settled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(amount: i64) -> RecoveryRecord {
        RecoveryRecord::new(
            LocationId::new(),
            ShiftId::new(),
            Money::from_units(amount),
            Utc::now(),
            1,
        )
    }

    #[test]
    fn test_full_application_settles() {
        let mut rec = record(20);
        let settler = ShiftId::new();
        let absorbed = rec.apply(settler, Money::from_units(30), Utc::now());

        assert_eq!(absorbed, Money::from_units(20));
        assert_eq!(rec.state, RecoveryState::Settled);
        assert_eq!(rec.settling_shift_id, Some(settler));
        assert!(rec.debt_amount.is_zero());
        assert_eq!(rec.repaid(), Money::from_units(20));
    }

    #[test]
    fn test_partial_application_stays_pending() {
        let mut rec = record(20);
        let absorbed = rec.apply(ShiftId::new(), Money::from_units(5), Utc::now());

        assert_eq!(absorbed, Money::from_units(5));
        assert!(rec.is_pending());
        assert_eq!(rec.debt_amount, Money::from_units(15));
        assert!(rec.settling_shift_id.is_none());
        assert_eq!(rec.applications.len(), 1);
    }

    #[test]
    fn test_settled_record_absorbs_nothing() {
        let mut rec = record(10);
        rec.apply(ShiftId::new(), Money::from_units(10), Utc::now());
        let again = rec.apply(ShiftId::new(), Money::from_units(10), Utc::now());
        assert!(again.is_zero());
        assert_eq!(rec.applications.len(), 1);
    }
}
