//! Export CLI commands

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::Subcommand;

use crate::error::{TillError, TillResult};
use crate::export::{export_debts_csv, export_shifts_csv};
use crate::services::LocationService;
use crate::storage::Storage;

/// Export subcommands
#[derive(Subcommand)]
pub enum ExportCommands {
    /// Export shift history of a location as CSV
    Shifts {
        /// Location name or ID
        location: String,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Export the recovery ledger of a location as CSV
    Debts {
        /// Location name or ID
        location: String,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub fn handle_export_command(storage: &Storage, cmd: ExportCommands) -> TillResult<()> {
    let locations = LocationService::new(storage);

    let (rows, output) = match cmd {
        ExportCommands::Shifts { location, output } => {
            let location = locations.find(&location)?;
            (export_shifts_csv(storage, &location, open_output(output.as_deref())?)?, output)
        }
        ExportCommands::Debts { location, output } => {
            let location = locations.find(&location)?;
            (export_debts_csv(storage, &location, open_output(output.as_deref())?)?, output)
        }
    };

    if let Some(path) = output {
        eprintln!("Exported {} row(s) to {}", rows, path.display());
    }
    Ok(())
}

fn open_output(path: Option<&Path>) -> TillResult<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                TillError::Export(format!("Failed to create {}: {}", path.display(), e))
            })?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout())),
    }
}
