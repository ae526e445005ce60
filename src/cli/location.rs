//! Location CLI commands

use clap::Subcommand;

use crate::config::Settings;
use crate::error::TillResult;
use crate::services::{LocationService, RecoveryLedger};
use crate::external::TrustedDirectory;
use crate::storage::Storage;

use super::parse_amount;

/// Location subcommands
#[derive(Subcommand)]
pub enum LocationCommands {
    /// Register a location and its fixed float
    Add {
        /// Location name
        name: String,
        /// Fixed float expected at each opening (e.g. "150.00")
        #[arg(short, long)]
        float: String,
    },
    /// List all locations
    List,
    /// Show a location with its outstanding debt
    Show {
        /// Location name or ID
        location: String,
    },
}

pub fn handle_location_command(
    storage: &Storage,
    settings: &Settings,
    cmd: LocationCommands,
) -> TillResult<()> {
    let service = LocationService::new(storage);

    match cmd {
        LocationCommands::Add { name, float } => {
            let fixed_float = parse_amount("fixed_float", &float)?;
            let location = service.create(&name, fixed_float)?;

            println!("Created location: {}", location.name);
            println!("  Fixed float: {}", location.fixed_float);
            println!("  ID: {}", location.id.to_full_string());
        }

        LocationCommands::List => {
            let locations = service.list()?;
            if locations.is_empty() {
                println!("No locations configured. Add one with 'till location add'.");
                return Ok(());
            }
            let ledger = RecoveryLedger::new(storage, settings, &TrustedDirectory);
            for location in locations {
                let debt = ledger.outstanding_debt(location.id);
                println!(
                    "{:<12}  {:<24}  float {:>10}  owed {:>10}",
                    location.id.to_string(),
                    location.name,
                    location.fixed_float.to_string(),
                    debt.to_string()
                );
            }
        }

        LocationCommands::Show { location } => {
            let location = service.find(&location)?;
            let ledger = RecoveryLedger::new(storage, settings, &TrustedDirectory);
            let current = storage.shifts.find_open(location.id)?;

            println!("Location:     {}", location.name);
            println!("ID:           {}", location.id.to_full_string());
            println!("Fixed float:  {}", location.fixed_float);
            println!("Owed:         {}", ledger.outstanding_debt(location.id));
            match current {
                Some(shift) => println!("Open shift:   {} ({})", shift.id, shift.operator_id),
                None => println!("Open shift:   none"),
            }
        }
    }

    Ok(())
}
