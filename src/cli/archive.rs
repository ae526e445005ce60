//! Archive CLI commands

use chrono::{NaiveDate, TimeZone, Utc};
use clap::Subcommand;

use crate::config::Settings;
use crate::error::{TillError, TillResult};
use crate::services::{ArchiveReport, ArchiveService, LocationService};
use crate::storage::Storage;

/// Archive subcommands
#[derive(Subcommand)]
pub enum ArchiveCommands {
    /// Archive one closed shift
    Shift {
        /// Shift ID
        shift: String,
        /// Who is archiving
        #[arg(short, long, env = "TILL_OPERATOR", default_value = "maintenance")]
        operator: String,
    },
    /// Archive closed shifts at a location that closed before a date
    Before {
        /// Location name or ID
        location: String,
        /// Cutoff date (YYYY-MM-DD), exclusive
        date: String,
        /// Who is archiving
        #[arg(short, long, env = "TILL_OPERATOR", default_value = "maintenance")]
        operator: String,
    },
}

pub fn handle_archive_command(
    storage: &Storage,
    settings: &Settings,
    cmd: ArchiveCommands,
) -> TillResult<()> {
    let service = ArchiveService::new(storage, settings);

    let report = match cmd {
        ArchiveCommands::Shift { shift, operator } => {
            let shift = storage
                .shifts
                .find(&shift)?
                .ok_or_else(|| TillError::shift_not_found(&shift))?;
            service.archive_shift(shift.id, &operator)?
        }
        ArchiveCommands::Before {
            location,
            date,
            operator,
        } => {
            let location = LocationService::new(storage).find(&location)?;
            let cutoff = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|d| Utc.from_utc_datetime(&d))
                .ok_or_else(|| {
                    let message = format!("Invalid date '{}', use YYYY-MM-DD", date);
                    TillError::validation("date", message)
                })?;
            service.archive_before(location.id, cutoff, &operator)?
        }
    };

    print_report(&report);
    Ok(())
}

fn print_report(report: &ArchiveReport) {
    if report.archived.is_empty() {
        println!("Nothing archived.");
    } else {
        println!(
            "Archived {} shift(s) and {} expense(s)",
            report.archived.len(),
            report.expenses_archived
        );
        if let Some(file) = &report.archive_file {
            println!("  File: {}", file.display());
        }
    }

    for (shift_id, reason) in &report.retained {
        println!("  Kept {}: {}", shift_id, reason);
    }
}
