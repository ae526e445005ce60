//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.

pub mod archive;
pub mod audit;
pub mod debt;
pub mod expense;
pub mod export;
pub mod location;
pub mod shift;

pub use archive::{handle_archive_command, ArchiveCommands};
pub use audit::handle_audit_command;
pub use debt::{handle_debt_command, DebtCommands};
pub use expense::{handle_expense_command, ExpenseCommands};
pub use export::{handle_export_command, ExportCommands};
pub use location::{handle_location_command, LocationCommands};
pub use shift::{handle_shift_command, ShiftCommands};

use crate::error::{TillError, TillResult};
use crate::models::Money;

/// Parse a user-supplied amount such as "150", "12.50" or "$1,250.00"
pub(crate) fn parse_amount(field: &'static str, input: &str) -> TillResult<Money> {
    Money::parse(input).map_err(|e| {
        TillError::validation(
            field,
            format!("Invalid amount '{}': {}. Use a format like '12.50'", input, e),
        )
    })
}
