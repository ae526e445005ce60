//! Core data models for the till engine
//!
//! Locations, shifts, expenses and recovery records, plus the `Money` and
//! typed-ID primitives they are built from.

pub mod expense;
pub mod ids;
pub mod location;
pub mod money;
pub mod recovery;
pub mod shift;

pub use expense::Expense;
pub use ids::{ExpenseId, LocationId, RecoveryId, ShiftId};
pub use location::Location;
pub use money::Money;
pub use recovery::{Application, RecoveryRecord, RecoveryState, SettlementAction};
pub use shift::{ClosingFigures, Shift, ShiftState};
