//! Export module for the till engine
//!
//! CSV exports of a location's shift history and recovery ledger
//! (spreadsheet-compatible).

pub mod csv;

pub use self::csv::{export_debts_csv, export_shifts_csv};
