//! Audit entry data structures
//!
//! Every open, expense, close, shortfall, settlement and archive emits one
//! immutable `{actor, action, before, after, timestamp}` record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::diff::generate_diff;

/// Mutations that are audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    OpenShift,
    AddExpense,
    CloseShift,
    RecordShortfall,
    Settle,
    Archive,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Action::OpenShift => "OPEN",
            Action::AddExpense => "EXPENSE",
            Action::CloseShift => "CLOSE",
            Action::RecordShortfall => "SHORTFALL",
            Action::Settle => "SETTLE",
            Action::Archive => "ARCHIVE",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Shift,
    Expense,
    RecoveryRecord,
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityType::Shift => write!(f, "Shift"),
            EntityType::Expense => write!(f, "Expense"),
            EntityType::RecoveryRecord => write!(f, "RecoveryRecord"),
        }
    }
}

/// A single audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the mutation was committed (UTC)
    pub timestamp: DateTime<Utc>,

    /// Operator the mutation is attributed to
    pub actor: String,

    pub action: Action,

    pub entity_type: EntityType,

    pub entity_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<serde_json::Value>,

    /// Human-readable diff of before/after
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_summary: Option<String>,
}

impl AuditEntry {
    pub fn new(
        actor: impl Into<String>,
        action: Action,
        entity_type: EntityType,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            actor: actor.into(),
            action,
            entity_type,
            entity_id: entity_id.into(),
            before: None,
            after: None,
            diff_summary: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn before<T: Serialize>(mut self, entity: &T) -> Self {
        self.before = serde_json::to_value(entity).ok();
        self.refresh_diff();
        self
    }

    pub fn after<T: Serialize>(mut self, entity: &T) -> Self {
        self.after = serde_json::to_value(entity).ok();
        self.refresh_diff();
        self
    }

    fn refresh_diff(&mut self) {
        if let (Some(before), Some(after)) = (&self.before, &self.after) {
            self.diff_summary = generate_diff(before, after);
        }
    }

    /// Format the entry for human-readable output
    pub fn format_human_readable(&self) -> String {
        let mut output = format!(
            "[{}] {} {} {} by {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.action,
            self.entity_type,
            self.entity_id,
            self.actor
        );

        if let Some(diff) = &self.diff_summary {
            output.push_str(&format!("\n  Changes: {}", diff));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_display() {
        assert_eq!(Action::OpenShift.to_string(), "OPEN");
        assert_eq!(Action::Settle.to_string(), "SETTLE");
    }

    #[test]
    fn test_create_style_entry_has_no_before() {
        let entry = AuditEntry::new("op-1", Action::OpenShift, EntityType::Shift, "sft-1")
            .after(&json!({"state": "open"}));

        assert!(entry.before.is_none());
        assert!(entry.after.is_some());
        assert!(entry.diff_summary.is_none());
    }

    #[test]
    fn test_update_entry_gets_diff() {
        let entry = AuditEntry::new("op-1", Action::CloseShift, EntityType::Shift, "sft-1")
            .before(&json!({"state": "open", "closing_amount": null}))
            .after(&json!({"state": "closed", "closing_amount": 8000}));

        let diff = entry.diff_summary.unwrap();
        assert!(diff.contains("state: \"open\" -> \"closed\""));
        assert!(diff.contains("closing_amount: null -> 8000"));
    }

    #[test]
    fn test_serialization_uses_snake_case() {
        let entry =
            AuditEntry::new("op", Action::RecordShortfall, EntityType::RecoveryRecord, "rec-1");
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"record_shortfall\""));
        assert!(json.contains("\"recovery_record\""));

        let back: AuditEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.action, Action::RecordShortfall);
    }

    #[test]
    fn test_human_readable_format() {
        let entry = AuditEntry::new("alice", Action::AddExpense, EntityType::Expense, "exp-1");
        let formatted = entry.format_human_readable();
        assert!(formatted.contains("EXPENSE Expense exp-1 by alice"));
    }
}
