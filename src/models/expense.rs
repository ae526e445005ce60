//! Expense model
//!
//! A discretionary cash outflow taken from the drawer during an open shift.
//! Expenses belong to exactly one shift and are immutable once recorded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{ExpenseId, ShiftId};
use super::money::Money;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub shift_id: ShiftId,
    /// Always strictly positive
    pub amount: Money,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
    pub operator_id: String,
}

impl Expense {
    pub fn new(
        shift_id: ShiftId,
        amount: Money,
        reason: impl Into<String>,
        operator_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ExpenseId::new(),
            shift_id,
            amount,
            reason: reason.into(),
            timestamp,
            operator_id: operator_id.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ExpenseValidationError> {
        if !self.amount.is_positive() {
            return Err(ExpenseValidationError::NonPositiveAmount(self.amount));
        }
        if self.reason.trim().is_empty() {
            return Err(ExpenseValidationError::EmptyReason);
        }
        if self.reason.len() > 200 {
            return Err(ExpenseValidationError::ReasonTooLong(self.reason.len()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpenseValidationError {
    NonPositiveAmount(Money),
    EmptyReason,
    ReasonTooLong(usize),
}

impl ExpenseValidationError {
    /// Name of the offending field
    pub fn field(&self) -> &'static str {
        match self {
            Self::NonPositiveAmount(_) => "amount",
            Self::EmptyReason | Self::ReasonTooLong(_) => "reason",
        }
    }
}

impl fmt::Display for ExpenseValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveAmount(amount) => {
                write!(f, "Expense amount must be greater than zero (got {})", amount)
            }
            Self::EmptyReason => write!(f, "Expense reason cannot be empty"),
            Self::ReasonTooLong(len) => {
                write!(f, "Expense reason too long ({} chars, max 200)", len)
            }
        }
    }
}

impl std::error::Error for ExpenseValidationError {}
