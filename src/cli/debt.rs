//! Debt (recovery ledger) CLI commands

use clap::Subcommand;

use crate::config::Settings;
use crate::display::{format_debt_list, format_settlements};
use crate::error::{TillError, TillResult};
use crate::external::TrustedDirectory;
use crate::services::{LocationService, RecoveryLedger};
use crate::storage::Storage;

use super::parse_amount;

/// Debt subcommands
#[derive(Subcommand)]
pub enum DebtCommands {
    /// Show pending debt for a location, oldest first
    Show {
        /// Location name or ID
        location: String,
    },
    /// Show every recovery record for a location
    History {
        /// Location name or ID
        location: String,
    },
    /// Apply a shift's surplus to pending debt
    Settle {
        /// Shift providing the surplus
        shift: String,
        /// Surplus to apply
        amount: String,
        /// Operator recording the settlement
        #[arg(short, long, env = "TILL_OPERATOR")]
        operator: String,
    },
}

pub fn handle_debt_command(
    storage: &Storage,
    settings: &Settings,
    cmd: DebtCommands,
) -> TillResult<()> {
    let locations = LocationService::new(storage);
    let ledger = RecoveryLedger::new(storage, settings, &TrustedDirectory);

    match cmd {
        DebtCommands::Show { location } => {
            let location = locations.find(&location)?;
            let pending = ledger.pending_records(location.id)?;
            println!("{}", location);
            print!("{}", format_debt_list(&pending, &settings.date_format));
        }

        DebtCommands::History { location } => {
            let location = locations.find(&location)?;
            let history = ledger.history(location.id)?;
            println!("{}", location);
            print!("{}", format_debt_list(&history, &settings.date_format));
        }

        DebtCommands::Settle {
            shift,
            amount,
            operator,
        } => {
            let amount = parse_amount("available_surplus", &amount)?;
            let shift = storage
                .shifts
                .find(&shift)?
                .ok_or_else(|| TillError::shift_not_found(&shift))?;

            let actions = ledger.try_settle(shift.id, amount, &operator)?;
            print!("{}", format_settlements(&actions));
            println!("Outstanding: {}", ledger.outstanding_debt(shift.location_id));
        }
    }

    Ok(())
}
