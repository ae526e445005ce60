use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use till::cli::{
    handle_archive_command, handle_audit_command, handle_debt_command, handle_expense_command,
    handle_export_command, handle_location_command, handle_shift_command,
};
use till::config::{Settings, TillPaths};
use till::logging::init_logging;
use till::storage::Storage;

#[derive(Parser)]
#[command(
    name = "till",
    version,
    about = "Cash drawer accountability for multi-location businesses",
    long_about = "Till tracks the cash drawer at each location through shifts. \
                  Shortfalls at closing become debts that later surpluses repay, \
                  oldest first, so every missing unit of currency stays accounted for."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Location management commands
    #[command(subcommand, alias = "loc")]
    Location(till::cli::LocationCommands),

    /// Open, close and inspect shifts
    #[command(subcommand)]
    Shift(till::cli::ShiftCommands),

    /// Record and list drawer expenses
    #[command(subcommand)]
    Expense(till::cli::ExpenseCommands),

    /// Inspect and settle drawer debt
    #[command(subcommand)]
    Debt(till::cli::DebtCommands),

    /// Move old closed shifts out of the live ledger
    #[command(subcommand)]
    Archive(till::cli::ArchiveCommands),

    /// Export ledger data as CSV
    #[command(subcommand)]
    Export(till::cli::ExportCommands),

    /// Show recent audit log entries
    Audit {
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Initialize the data directory
    Init,

    /// Show current configuration and paths
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize paths and settings
    let paths = TillPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;

    if let Some(Commands::Init) = cli.command {
        println!("Initializing till at: {}", paths.base_dir().display());
        till::storage::initialize_storage(&paths)?;
        settings.save(&paths)?;
        println!("Initialization complete!");
        println!();
        println!("Next steps:");
        println!("  1. Add a location: till location add \"Main Store\" --float 150.00");
        println!("  2. Open a shift:   till shift open \"Main Store\" 150.00 --operator <id>");
        return Ok(());
    }

    if let Some(Commands::Config) = cli.command {
        println!("Till Configuration");
        println!("==================");
        println!("Base directory:    {}", paths.base_dir().display());
        println!("Data directory:    {}", paths.data_dir().display());
        println!("Archive directory: {}", paths.archive_dir().display());
        println!("Log directory:     {}", paths.log_dir().display());
        println!();
        println!("Settings:");
        println!("  Variance tolerance:      {}", settings.variance_tolerance);
        println!("  Lock timeout:            {} ms", settings.lock_timeout_ms);
        println!("  Track justified gaps:    {}", settings.track_justified_underfunding);
        println!("  Log level:               {}", settings.log_level);
        return Ok(());
    }

    if !paths.is_initialized() {
        bail!("Till is not initialized here. Run 'till init' first.");
    }

    let _log_guard = init_logging(&paths, &settings)?;

    // Initialize storage
    let storage = Storage::new(paths.clone())?;
    storage.load_all()?;

    match cli.command {
        Some(Commands::Location(cmd)) => handle_location_command(&storage, &settings, cmd)?,
        Some(Commands::Shift(cmd)) => handle_shift_command(&storage, &settings, cmd)?,
        Some(Commands::Expense(cmd)) => handle_expense_command(&storage, &settings, cmd)?,
        Some(Commands::Debt(cmd)) => handle_debt_command(&storage, &settings, cmd)?,
        Some(Commands::Archive(cmd)) => handle_archive_command(&storage, &settings, cmd)?,
        Some(Commands::Export(cmd)) => handle_export_command(&storage, cmd)?,
        Some(Commands::Audit { limit }) => handle_audit_command(&storage, limit)?,
        Some(Commands::Init) | Some(Commands::Config) => {}
        None => {
            println!("Till - cash drawer accountability");
            println!();
            println!("Run 'till --help' for available commands.");
        }
    }

    Ok(())
}
