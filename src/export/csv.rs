//! CSV Export functionality
//!
//! Exports a location's shift history and its recovery ledger to CSV format.

use std::io::Write;

use serde::Serialize;

use crate::error::TillResult;
use crate::models::{Location, Money};
use crate::storage::Storage;

#[derive(Serialize)]
struct ShiftRow {
    id: String,
    location: String,
    operator: String,
    state: String,
    opened_at: String,
    closed_at: String,
    opening_amount: String,
    expenses: String,
    expense_count: u32,
    cash_sales: String,
    expected_balance: String,
    counted_cash: String,
    variance: String,
    flagged_for_review: bool,
    justification: String,
}

#[derive(Serialize)]
struct DebtRow {
    id: String,
    location: String,
    state: String,
    original_amount: String,
    debt_amount: String,
    repaid: String,
    origin_shift: String,
    settling_shift: String,
    created_at: String,
    settled_at: String,
}

fn decimal(amount: Money) -> String {
    format!("{:.2}", amount.cents() as f64 / 100.0)
}

fn optional_decimal(amount: Option<Money>) -> String {
    amount.map(decimal).unwrap_or_default()
}

/// Export every live shift at a location, oldest first
pub fn export_shifts_csv<W: Write>(
    storage: &Storage,
    location: &Location,
    writer: W,
) -> TillResult<usize> {
    let mut csv_writer = ::csv::Writer::from_writer(writer);
    let shifts = storage.shifts.get_by_location(location.id)?;

    for shift in &shifts {
        csv_writer.serialize(ShiftRow {
            id: shift.id.to_full_string(),
            location: location.name.clone(),
            operator: shift.operator_id.clone(),
            state: shift.state.to_string(),
            opened_at: shift.opened_at.to_rfc3339(),
            closed_at: shift.closed_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            opening_amount: decimal(shift.opening_amount),
            expenses: decimal(shift.expense_total),
            expense_count: shift.expense_count,
            cash_sales: optional_decimal(shift.cash_sales_total),
            expected_balance: optional_decimal(shift.expected_balance),
            counted_cash: optional_decimal(shift.closing_amount),
            variance: optional_decimal(shift.variance),
            flagged_for_review: shift.flagged_for_review,
            justification: shift.justification.clone().unwrap_or_default(),
        })?;
    }

    csv_writer.flush()?;
    Ok(shifts.len())
}

/// Export the full recovery ledger of a location, oldest first
pub fn export_debts_csv<W: Write>(
    storage: &Storage,
    location: &Location,
    writer: W,
) -> TillResult<usize> {
    let mut csv_writer = ::csv::Writer::from_writer(writer);
    let records = storage.recovery.get_history(location.id)?;

    for record in &records {
        csv_writer.serialize(DebtRow {
            id: record.id.to_full_string(),
            location: location.name.clone(),
            state: record.state.to_string(),
            original_amount: decimal(record.original_amount),
            debt_amount: decimal(record.debt_amount),
            repaid: decimal(record.repaid()),
            origin_shift: record.origin_shift_id.to_full_string(),
            settling_shift: record
                .settling_shift_id
                .map(|id| id.to_full_string())
                .unwrap_or_default(),
            created_at: record.created_at.to_rfc3339(),
            settled_at: record.settled_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
        })?;
    }

    csv_writer.flush()?;
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::TillPaths;
    use crate::config::Settings;
    use crate::external::{FixedSales, NullSink, TrustedDirectory};
    use crate::services::ShiftManager;
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = TillPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths)
            .unwrap()
            .with_audit_sink(Box::new(NullSink));
        storage.load_all().unwrap();
        (temp_dir, storage)
    }

    fn short_shift(storage: &Storage) -> Location {
        let location = Location::new("Kiosk, North", Money::from_units(100));
        storage.locations.upsert(location.clone()).unwrap();
        storage.locations.save().unwrap();

        let settings = Settings::default();
        let sales = FixedSales(Money::from_units(50));
        let manager = ShiftManager::new(storage, &settings, &sales, &TrustedDirectory);
        let opened = manager
            .open_shift(location.id, Money::from_units(100), "op", None)
            .unwrap();
        manager
            .close_shift(opened.shift.id, Money::from_units(80), "op", None)
            .unwrap();
        location
    }

    #[test]
    fn test_export_shifts() {
        let (_temp_dir, storage) = create_test_storage();
        let location = short_shift(&storage);

        let mut output = Vec::new();
        let count = export_shifts_csv(&storage, &location, &mut output).unwrap();
        let csv = String::from_utf8(output).unwrap();

        assert_eq!(count, 1);
        assert!(csv.starts_with("id,location,operator,state,opened_at"));
        assert!(csv.contains("\"Kiosk, North\""));
        assert!(csv.contains("Closed"));
        assert!(csv.contains("150.00"));
        assert!(csv.contains("-70.00"));
    }

    #[test]
    fn test_export_debts() {
        let (_temp_dir, storage) = create_test_storage();
        let location = short_shift(&storage);

        let mut output = Vec::new();
        let count = export_debts_csv(&storage, &location, &mut output).unwrap();
        let csv = String::from_utf8(output).unwrap();

        assert_eq!(count, 1);
        assert!(csv.contains("Pending,20.00,20.00,0.00"));
    }
}
