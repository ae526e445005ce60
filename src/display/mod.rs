//! Display formatting for terminal output
//!
//! Provides utilities for formatting shifts, close summaries and the
//! recovery ledger as plain-text tables.

pub mod debt;
pub mod shift;

pub use debt::{format_debt_list, format_settlements};
pub use shift::{format_close_summary, format_opened, format_shift_details, format_shift_list};
