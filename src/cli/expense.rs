//! Expense CLI commands

use clap::Subcommand;

use crate::config::Settings;
use crate::error::TillResult;
use crate::external::TrustedDirectory;
use crate::services::ExpenseRegistry;
use crate::storage::Storage;

use super::parse_amount;

/// Expense subcommands
#[derive(Subcommand)]
pub enum ExpenseCommands {
    /// Record cash taken from the drawer
    Add {
        /// Shift ID
        shift: String,
        /// Amount (e.g. "12.50")
        amount: String,
        /// What the cash was used for
        reason: String,
        /// Operator taking the cash
        #[arg(short, long, env = "TILL_OPERATOR")]
        operator: String,
    },
    /// List expenses of a shift
    List {
        /// Shift ID
        shift: String,
    },
}

pub fn handle_expense_command(
    storage: &Storage,
    settings: &Settings,
    cmd: ExpenseCommands,
) -> TillResult<()> {
    let registry = ExpenseRegistry::new(storage, settings, &TrustedDirectory);

    match cmd {
        ExpenseCommands::Add {
            shift,
            amount,
            reason,
            operator,
        } => {
            let amount = parse_amount("amount", &amount)?;
            let shift = storage
                .shifts
                .find(&shift)?
                .ok_or_else(|| crate::error::TillError::shift_not_found(&shift))?;

            let recorded = registry.add_expense(shift.id, amount, &reason, &operator)?;
            println!(
                "Recorded expense of {} ({})",
                recorded.expense.amount, recorded.expense.reason
            );
            println!(
                "  Shift total: {} over {} expense(s)",
                recorded.shift.expense_total, recorded.shift.expense_count
            );
        }

        ExpenseCommands::List { shift } => {
            let shift = storage
                .shifts
                .find(&shift)?
                .ok_or_else(|| crate::error::TillError::shift_not_found(&shift))?;

            let expenses = registry.list_expenses(shift.id)?;
            if expenses.is_empty() {
                println!("No expenses recorded for shift {}.", shift.id);
                return Ok(());
            }
            for expense in &expenses {
                println!(
                    "{}  {:>10}  {:<12}  {}",
                    expense.timestamp.format(&settings.date_format),
                    expense.amount.to_string(),
                    expense.operator_id,
                    expense.reason
                );
            }
            println!("Total: {}", shift.expense_total);
        }
    }

    Ok(())
}
