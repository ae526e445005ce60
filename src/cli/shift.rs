//! Shift CLI commands
//!
//! Opening and closing a drawer, plus the read-only shift queries.

use clap::Subcommand;

use crate::config::Settings;
use crate::display::{format_close_summary, format_opened, format_shift_details, format_shift_list};
use crate::error::TillResult;
use crate::external::{FixedSales, TrustedDirectory};
use crate::models::Money;
use crate::services::{LocationService, ShiftManager};
use crate::storage::Storage;

use super::parse_amount;

/// Shift subcommands
#[derive(Subcommand)]
pub enum ShiftCommands {
    /// Open a shift with the cash placed in the drawer
    Open {
        /// Location name or ID
        location: String,
        /// Opening amount (e.g. "100.00")
        amount: String,
        /// Operator opening the drawer
        #[arg(short, long, env = "TILL_OPERATOR")]
        operator: String,
        /// Reason for opening below float when outstanding debt does not explain it
        #[arg(short, long)]
        justification: Option<String>,
    },
    /// Close a shift with the counted cash
    Close {
        /// Shift ID
        shift: String,
        /// Counted cash in the drawer
        counted: String,
        /// Cash sales taken during the shift
        #[arg(short, long, default_value = "0")]
        sales: String,
        /// Operator closing the drawer
        #[arg(short, long, env = "TILL_OPERATOR")]
        operator: String,
        /// Closing observations
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Show the open shift at a location
    Current {
        /// Location name or ID
        location: String,
    },
    /// Show the suggested opening amount for a location
    Suggest {
        /// Location name or ID
        location: String,
    },
    /// List shifts at a location
    List {
        /// Location name or ID
        location: String,
        /// Number of shifts to show (most recent)
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Show shift details and expenses
    Show {
        /// Shift ID
        shift: String,
    },
}

pub fn handle_shift_command(
    storage: &Storage,
    settings: &Settings,
    cmd: ShiftCommands,
) -> TillResult<()> {
    let locations = LocationService::new(storage);
    let no_sales = FixedSales(Money::zero());

    match cmd {
        ShiftCommands::Open {
            location,
            amount,
            operator,
            justification,
        } => {
            let location = locations.find(&location)?;
            let amount = parse_amount("opening_amount", &amount)?;
            let manager = ShiftManager::new(storage, settings, &no_sales, &TrustedDirectory);

            let opened =
                manager.open_shift(location.id, amount, &operator, justification.as_deref())?;
            print!("{}", format_opened(&opened));
            println!("  ID: {}", opened.shift.id.to_full_string());
        }

        ShiftCommands::Close {
            shift,
            counted,
            sales,
            operator,
            notes,
        } => {
            let counted = parse_amount("counted_cash", &counted)?;
            let sales = FixedSales(parse_amount("cash_sales_total", &sales)?);
            let manager = ShiftManager::new(storage, settings, &sales, &TrustedDirectory);

            let shift = manager.find_shift(&shift)?;
            let summary = manager.close_shift(shift.id, counted, &operator, notes.as_deref())?;
            print!("{}", format_close_summary(&summary));
        }

        ShiftCommands::Current { location } => {
            let location = locations.find(&location)?;
            let manager = ShiftManager::new(storage, settings, &no_sales, &TrustedDirectory);

            match manager.current_shift(location.id)? {
                Some(shift) => {
                    let expenses = storage.expenses.get_by_shift(shift.id)?;
                    print!("{}", format_shift_details(&shift, &expenses, &settings.date_format));
                }
                None => println!("No open shift at {}.", location.name),
            }
        }

        ShiftCommands::Suggest { location } => {
            let location = locations.find(&location)?;
            let manager = ShiftManager::new(storage, settings, &no_sales, &TrustedDirectory);

            let debt = manager.outstanding_debt(location.id)?;
            let suggested = manager.suggested_opening_amount(location.id)?;
            println!("Fixed float:       {}", location.fixed_float);
            println!("Outstanding debt:  {}", debt);
            println!("Suggested opening: {}", suggested);
        }

        ShiftCommands::List { location, limit } => {
            let location = locations.find(&location)?;
            let manager = ShiftManager::new(storage, settings, &no_sales, &TrustedDirectory);

            let shifts = manager.list_shifts(location.id)?;
            let start = shifts.len().saturating_sub(limit);
            print!("{}", format_shift_list(&shifts[start..], &settings.date_format));
        }

        ShiftCommands::Show { shift } => {
            let manager = ShiftManager::new(storage, settings, &no_sales, &TrustedDirectory);
            let shift = manager.find_shift(&shift)?;
            let expenses = storage.expenses.get_by_shift(shift.id)?;
            print!("{}", format_shift_details(&shift, &expenses, &settings.date_format));
        }
    }

    Ok(())
}
