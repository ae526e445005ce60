//! Collaborators the till engine consumes but does not own
//!
//! - [`SalesAggregator`] supplies the cash-sales figure for a shift.
//! - [`OperatorDirectory`] resolves operator ids for audit attribution.
//! - [`AuditSink`] receives audit entries.
//!
//! The engine does not validate what these return: a sales figure is taken
//! as-is, and operator existence is assumed rather than re-verified.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use crate::audit::AuditEntry;
use crate::error::{TillError, TillResult};
use crate::models::{Money, ShiftId};

pub trait SalesAggregator: Send + Sync {
    /// Total cash sales taken during the shift
    fn cash_sales_total(&self, shift_id: ShiftId) -> TillResult<Money>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorIdentity {
    pub id: String,
    pub display_name: String,
}

impl fmt::Display for OperatorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.display_name == self.id {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{} ({})", self.display_name, self.id)
        }
    }
}

pub trait OperatorDirectory: Send + Sync {
    fn resolve(&self, operator_id: &str) -> OperatorIdentity;
}

pub trait AuditSink: Send + Sync {
    fn append(&self, entry: &AuditEntry) -> TillResult<()>;
}

/// Reports the same figure for every shift
///
/// Used when the operator keys the sales total in at close.
#[derive(Debug, Clone, Copy)]
pub struct FixedSales(pub Money);

impl SalesAggregator for FixedSales {
    fn cash_sales_total(&self, _shift_id: ShiftId) -> TillResult<Money> {
        Ok(self.0)
    }
}

/// Per-shift sales figures
#[derive(Debug, Default)]
pub struct SalesBook {
    totals: RwLock<HashMap<ShiftId, Money>>,
}

impl SalesBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, shift_id: ShiftId, total: Money) -> TillResult<()> {
        let mut totals = self
            .totals
            .write()
            .map_err(|e| TillError::Storage(format!("Failed to acquire write lock: {}", e)))?;
        totals.insert(shift_id, total);
        Ok(())
    }
}

impl SalesAggregator for SalesBook {
    /// Shifts with no recorded sales report zero
    fn cash_sales_total(&self, shift_id: ShiftId) -> TillResult<Money> {
        let totals = self
            .totals
            .read()
            .map_err(|e| TillError::Storage(format!("Failed to acquire read lock: {}", e)))?;
        Ok(totals.get(&shift_id).copied().unwrap_or_default())
    }
}

/// Echoes operator ids back as identities
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustedDirectory;

impl OperatorDirectory for TrustedDirectory {
    fn resolve(&self, operator_id: &str) -> OperatorIdentity {
        OperatorIdentity {
            id: operator_id.to_string(),
            display_name: operator_id.to_string(),
        }
    }
}

/// Maps known operator ids to display names; unknown ids pass through
#[derive(Debug, Clone, Default)]
pub struct RosterDirectory {
    names: HashMap<String, String>,
}

impl RosterDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operator(mut self, id: impl Into<String>, display_name: impl Into<String>) -> Self {
        self.names.insert(id.into(), display_name.into());
        self
    }
}

impl OperatorDirectory for RosterDirectory {
    fn resolve(&self, operator_id: &str) -> OperatorIdentity {
        OperatorIdentity {
            id: operator_id.to_string(),
            display_name: self
                .names
                .get(operator_id)
                .cloned()
                .unwrap_or_else(|| operator_id.to_string()),
        }
    }
}

/// Discards every entry
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl AuditSink for NullSink {
    fn append(&self, _entry: &AuditEntry) -> TillResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sales_book_defaults_to_zero() {
        let book = SalesBook::new();
        let shift = ShiftId::new();
        assert_eq!(book.cash_sales_total(shift).unwrap(), Money::zero());

        book.set(shift, Money::from_units(50)).unwrap();
        assert_eq!(book.cash_sales_total(shift).unwrap(), Money::from_units(50));
    }

    #[test]
    fn test_roster_falls_back_to_id() {
        let roster = RosterDirectory::new().with_operator("op-7", "Dana");
        assert_eq!(roster.resolve("op-7").display_name, "Dana");
        assert_eq!(roster.resolve("op-9").display_name, "op-9");
        assert_eq!(roster.resolve("op-7").to_string(), "Dana (op-7)");
    }
}
