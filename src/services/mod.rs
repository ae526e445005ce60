//! Service layer for the till engine
//!
//! The service layer provides business logic on top of the storage layer,
//! handling validation, per-location serialization, and multi-entity commits.

pub mod archive;
pub mod expense;
pub mod location;
pub mod reconciliation;
pub mod recovery;
pub mod shift;

pub use archive::{ArchiveBundle, ArchiveReport, ArchiveService, RetainReason};
pub use expense::{ExpenseRecorded, ExpenseRegistry};
pub use location::LocationService;
pub use reconciliation::{ClosingBalance, ReconciliationValidator};
pub use recovery::{plan_settlement, RecoveryLedger, SettlementPlan};
pub use shift::{ClosedShiftSummary, OpenedShift, ShiftManager};
