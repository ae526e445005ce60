//! Recovery ledger display formatting

use crate::models::{Money, RecoveryRecord, SettlementAction};

/// Format recovery records as a table
pub fn format_debt_list(records: &[RecoveryRecord], date_format: &str) -> String {
    if records.is_empty() {
        return "No recovery records.".to_string();
    }

    let mut output = String::new();
    output.push_str(&format!(
        "{:<12}  {:<8}  {:<16}  {:>10}  {:>10}  {:<12}  {:<12}\n",
        "ID", "State", "Created", "Original", "Owed", "Origin", "Settled by"
    ));
    output.push_str(&format!(
        "{:-<12}  {:-<8}  {:-<16}  {:->10}  {:->10}  {:-<12}  {:-<12}\n",
        "", "", "", "", "", "", ""
    ));

    for record in records {
        output.push_str(&format!(
            "{:<12}  {:<8}  {:<16}  {:>10}  {:>10}  {:<12}  {:<12}\n",
            record.id.to_string(),
            record.state.to_string(),
            record.created_at.format(date_format).to_string(),
            record.original_amount.to_string(),
            record.debt_amount.to_string(),
            record.origin_shift_id.to_string(),
            record
                .settling_shift_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
        ));
    }

    let owed: Money = records
        .iter()
        .filter(|r| r.is_pending())
        .map(|r| r.debt_amount)
        .sum();
    output.push_str(&format!("\nOutstanding: {}\n", owed));

    output
}

/// Format settlement actions, one line each
pub fn format_settlements(actions: &[SettlementAction]) -> String {
    if actions.is_empty() {
        return "  No debt settled.\n".to_string();
    }

    let mut output = String::from("  Settlements:\n");
    for action in actions {
        let status = if action.settled {
            "settled".to_string()
        } else {
            format!("{} still owed", action.remaining_debt)
        };
        output.push_str(&format!(
            "    {}  repaid {}  ({})\n",
            action.record_id, action.applied, status
        ));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LocationId, RecoveryId, ShiftId};
    use chrono::Utc;

    #[test]
    fn test_outstanding_total_counts_pending_only() {
        let location = LocationId::new();
        let record = |amount: i64, seq: u64| {
            let amount = Money::from_units(amount);
            RecoveryRecord::new(location, ShiftId::new(), amount, Utc::now(), seq)
        };
        let pending = record(20, 1);
        let mut settled = record(7, 2);
        settled.apply(ShiftId::new(), Money::from_units(7), Utc::now());

        let output = format_debt_list(&[pending, settled], "%Y-%m-%d");
        assert!(output.contains("Outstanding: $20.00"));
        assert!(output.contains("Settled"));
    }

    #[test]
    fn test_partial_settlement_shows_remaining() {
        let action = SettlementAction {
            record_id: RecoveryId::new(),
            origin_shift_id: ShiftId::new(),
            applied: Money::from_units(5),
            remaining_debt: Money::from_units(15),
            settled: false,
        };
        let output = format_settlements(&[action]);
        assert!(output.contains("repaid $5.00"));
        assert!(output.contains("$15.00 still owed"));
    }
}
