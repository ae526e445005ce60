//! Shift display formatting
//!
//! Formats shifts for terminal output in table and detail views.

use crate::models::{Expense, Shift};
use crate::services::{ClosedShiftSummary, OpenedShift};

use super::debt::format_settlements;

/// Format a list of shifts as a table
pub fn format_shift_list(shifts: &[Shift], date_format: &str) -> String {
    if shifts.is_empty() {
        return "No shifts found.".to_string();
    }

    let op_width = shifts
        .iter()
        .map(|s| s.operator_id.len())
        .max()
        .unwrap_or(8)
        .max(8);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<12}  {:<6}  {:<16}  {:<op_width$}  {:>10}  {:>10}  {:>10}\n",
        "ID",
        "State",
        "Opened",
        "Operator",
        "Opening",
        "Counted",
        "Variance",
        op_width = op_width,
    ));
    output.push_str(&format!(
        "{:-<12}  {:-<6}  {:-<16}  {:-<op_width$}  {:->10}  {:->10}  {:->10}\n",
        "",
        "",
        "",
        "",
        "",
        "",
        "",
        op_width = op_width,
    ));

    for shift in shifts {
        let variance = match shift.variance {
            Some(v) if shift.flagged_for_review => format!("{}!", v),
            Some(v) => v.to_string(),
            None => String::new(),
        };
        output.push_str(&format!(
            "{:<12}  {:<6}  {:<16}  {:<op_width$}  {:>10}  {:>10}  {:>10}\n",
            shift.id.to_string(),
            shift.state.to_string(),
            shift.opened_at.format(date_format).to_string(),
            shift.operator_id,
            shift.opening_amount.to_string(),
            shift.closing_amount.map(|m| m.to_string()).unwrap_or_default(),
            variance,
            op_width = op_width,
        ));
    }

    output
}

/// Format a single shift with its expenses
pub fn format_shift_details(shift: &Shift, expenses: &[Expense], date_format: &str) -> String {
    let mut output = String::new();

    output.push_str(&format!("Shift:     {}\n", shift.id.to_full_string()));
    output.push_str(&format!("State:     {}\n", shift.state));
    output.push_str(&format!("Operator:  {}\n", shift.operator_id));
    output.push_str(&format!("Opened:    {}\n", shift.opened_at.format(date_format)));
    if let Some(closed_at) = shift.closed_at {
        output.push_str(&format!("Closed:    {}\n", closed_at.format(date_format)));
    }
    output.push_str(&format!("Opening:   {}\n", shift.opening_amount));
    if let Some(justification) = &shift.justification {
        output.push_str(&format!("Reason:    {}\n", justification));
    }
    output.push_str(&format!(
        "Expenses:  {} ({} item{})\n",
        shift.expense_total,
        shift.expense_count,
        if shift.expense_count == 1 { "" } else { "s" }
    ));

    if let (Some(sales), Some(expected), Some(counted), Some(variance)) = (
        shift.cash_sales_total,
        shift.expected_balance,
        shift.closing_amount,
        shift.variance,
    ) {
        output.push_str(&format!("Sales:     {}\n", sales));
        output.push_str(&format!("Expected:  {}\n", expected));
        output.push_str(&format!("Counted:   {}\n", counted));
        output.push_str(&format!(
            "Variance:  {}{}\n",
            variance,
            if shift.flagged_for_review { "  (flagged for review)" } else { "" }
        ));
    }
    if let Some(observations) = &shift.observations {
        output.push_str(&format!("Notes:     {}\n", observations));
    }

    if !expenses.is_empty() {
        output.push_str("\nExpenses:\n");
        for expense in expenses {
            output.push_str(&format!(
                "  {}  {:>10}  {}\n",
                expense.timestamp.format(date_format),
                expense.amount.to_string(),
                expense.reason
            ));
        }
    }

    output
}

pub fn format_opened(opened: &OpenedShift) -> String {
    let mut output = format!(
        "Opened shift {} with {}\n",
        opened.shift.id, opened.shift.opening_amount
    );
    if opened.outstanding_debt.is_positive() {
        output.push_str(&format!(
            "Outstanding debt {}; suggested opening {}\n",
            opened.outstanding_debt, opened.suggested_amount
        ));
    }
    if let Some(record) = &opened.recovery_delta {
        output.push_str(&format!(
            "Recorded {} under-funding as {}\n",
            record.debt_amount, record.id
        ));
    }
    output
}

/// Format the outcome of a close
pub fn format_close_summary(summary: &ClosedShiftSummary) -> String {
    let mut output = String::new();

    output.push_str(&format!("Closed shift {}\n", summary.shift.id));
    output.push_str(&format!("  Expected:  {}\n", summary.expected_balance));
    output.push_str(&format!(
        "  Counted:   {}\n",
        summary.shift.closing_amount.unwrap_or_default()
    ));
    output.push_str(&format!("  Variance:  {}\n", summary.variance));

    if summary.flagged_for_review {
        output.push_str("  Variance exceeds tolerance: flagged for review\n");
    }

    if !summary.settlements.is_empty() {
        output.push_str(&format_settlements(&summary.settlements));
    }
    if summary.unapplied_surplus.is_positive() {
        output.push_str(&format!(
            "  Surplus not applied to debt: {}\n",
            summary.unapplied_surplus
        ));
    }
    if let Some(record) = &summary.shortfall_created {
        output.push_str(&format!(
            "  Shortfall of {} carried forward as {}\n",
            record.debt_amount, record.id
        ));
    }

    output
}
