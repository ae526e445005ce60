//! Reconciliation service
//!
//! Computes the expected drawer balance at close, the variance against the
//! counted cash, and how far the count falls short of (or exceeds) the
//! location's fixed float.
//!
//! Shortfall and variance are different things: a drawer can balance exactly
//! (variance zero) and still hold less than its float. It is the shortfall
//! that becomes float debt.

use crate::config::Settings;
use crate::error::{TillError, TillResult};
use crate::models::{Money, Shift};

/// Expected vs. counted figures for a closing shift
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosingBalance {
    /// opening + cash sales - expenses
    pub expected_balance: Money,
    /// counted - expected
    pub variance: Money,
    /// |variance| exceeded the tolerance
    pub flagged_for_review: bool,
}

/// Stateless balance checks, parameterised by the variance tolerance
#[derive(Debug, Clone, Copy)]
pub struct ReconciliationValidator {
    tolerance: Money,
}

impl ReconciliationValidator {
    pub fn new(tolerance: Money) -> Self {
        Self {
            tolerance: tolerance.abs(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.variance_tolerance)
    }

    pub fn tolerance(&self) -> Money {
        self.tolerance
    }

    /// Reject a negative cash count
    pub fn validate_count(counted_cash: Money) -> TillResult<()> {
        if counted_cash.is_negative() {
            return Err(TillError::validation(
                "counted_cash",
                format!("Counted cash cannot be negative (got {})", counted_cash),
            ));
        }
        Ok(())
    }

    /// Expected balance and variance for a shift about to close.
    ///
    /// Uses the shift's cached expense total. A variance beyond tolerance only
    /// flags the shift; closing still goes ahead.
    pub fn compute_closing_balance(
        &self,
        shift: &Shift,
        cash_sales_total: Money,
        counted_cash: Money,
    ) -> ClosingBalance {
        let expected_balance = shift.opening_amount + cash_sales_total - shift.expense_total;
        let variance = counted_cash - expected_balance;

        ClosingBalance {
            expected_balance,
            variance,
            flagged_for_review: variance.abs() > self.tolerance,
        }
    }

    /// How far the count falls below the float; zero when at or above it
    pub fn determine_shortfall(counted_cash: Money, fixed_float: Money) -> Money {
        (fixed_float - counted_cash).positive_part()
    }

    /// How far the count exceeds the float; zero when at or below it
    pub fn determine_surplus(counted_cash: Money, fixed_float: Money) -> Money {
        (counted_cash - fixed_float).positive_part()
    }
}

impl Default for ReconciliationValidator {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LocationId;
    use chrono::Utc;

    fn shift_with(opening: i64, expenses: &[i64]) -> Shift {
        let mut shift = Shift::open(
            LocationId::new(),
            "op",
            Money::from_units(opening),
            Utc::now(),
        );
        for amount in expenses {
            shift.apply_expense(Money::from_units(*amount));
        }
        shift
    }

    #[test]
    fn test_balanced_close_still_short_of_float() {
        // Opens with 100, sells 50, spends 70, counts 80
        let validator = ReconciliationValidator::new(Money::from_units(5));
        let shift = shift_with(100, &[30, 40]);

        let balance =
            validator.compute_closing_balance(&shift, Money::from_units(50), Money::from_units(80));
        assert_eq!(balance.expected_balance, Money::from_units(80));
        assert!(balance.variance.is_zero());
        assert!(!balance.flagged_for_review);

        let shortfall = ReconciliationValidator::determine_shortfall(
            Money::from_units(80),
            Money::from_units(100),
        );
        assert_eq!(shortfall, Money::from_units(20));
    }

    #[test]
    fn test_variance_beyond_tolerance_flags() {
        let validator = ReconciliationValidator::new(Money::from_units(5));
        let shift = shift_with(100, &[]);

        let over =
            validator.compute_closing_balance(&shift, Money::zero(), Money::from_cents(10501));
        assert_eq!(over.variance, Money::from_cents(501));
        assert!(over.flagged_for_review);

        let at_limit =
            validator.compute_closing_balance(&shift, Money::zero(), Money::from_units(95));
        assert_eq!(at_limit.variance, Money::from_units(-5));
        assert!(!at_limit.flagged_for_review);
    }

    #[test]
    fn test_expected_balance_is_deterministic() {
        let validator = ReconciliationValidator::default();
        let shift = shift_with(120, &[15]);
        let sales = Money::from_units(40);
        let a = validator.compute_closing_balance(&shift, sales, Money::from_units(140));
        let b = validator.compute_closing_balance(&shift, sales, Money::from_units(10));
        assert_eq!(a.expected_balance, b.expected_balance);
        assert_eq!(a.expected_balance, Money::from_units(145));
    }

    #[test]
    fn test_surplus_and_shortfall_are_exclusive() {
        let float = Money::from_units(100);
        assert_eq!(
            ReconciliationValidator::determine_surplus(Money::from_units(130), float),
            Money::from_units(30)
        );
        assert!(
            ReconciliationValidator::determine_shortfall(Money::from_units(130), float).is_zero()
        );
        assert!(
            ReconciliationValidator::determine_surplus(Money::from_units(100), float).is_zero()
        );
    }

    #[test]
    fn test_negative_count_rejected() {
        let err = ReconciliationValidator::validate_count(Money::from_cents(-1)).unwrap_err();
        assert!(matches!(err, TillError::Validation { field: "counted_cash", .. }));
        assert!(ReconciliationValidator::validate_count(Money::zero()).is_ok());
    }
}
