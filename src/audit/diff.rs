//! Before/after diffs for audit entries
//!
//! Only top-level fields are compared; nested values are summarised.

use serde_json::Value;

/// Describe the top-level changes between two JSON values
///
/// Returns `None` when nothing changed.
pub fn generate_diff(before: &Value, after: &Value) -> Option<String> {
    let changes: Vec<String> = match (before, after) {
        (Value::Object(old), Value::Object(new)) => {
            let mut changes: Vec<String> = old
                .iter()
                .filter_map(|(key, old_val)| match new.get(key) {
                    Some(new_val) if new_val == old_val => None,
                    Some(new_val) => Some(format!(
                        "{}: {} -> {}",
                        key,
                        format_value(old_val),
                        format_value(new_val)
                    )),
                    None => Some(format!("{}: {} -> (removed)", key, format_value(old_val))),
                })
                .collect();

            changes.extend(
                new.iter()
                    .filter(|(key, _)| !old.contains_key(*key))
                    .map(|(key, val)| format!("{}: (added) -> {}", key, format_value(val))),
            );
            changes
        }
        _ if before != after => vec![format!(
            "{} -> {}",
            format_value(before),
            format_value(after)
        )],
        _ => Vec::new(),
    };

    if changes.is_empty() {
        None
    } else {
        Some(changes.join(", "))
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) if s.chars().count() > 50 => {
            let head: String = s.chars().take(47).collect();
            format!("\"{}...\"", head)
        }
        Value::String(s) => format!("\"{}\"", s),
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) => format!("{{{} fields}}", obj.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_changed_fields_only() {
        let before = json!({"debt_amount": 2000, "state": "pending"});
        let after = json!({"debt_amount": 0, "state": "settled"});

        let diff = generate_diff(&before, &after).unwrap();
        assert!(diff.contains("debt_amount: 2000 -> 0"));
        assert!(diff.contains("state: \"pending\" -> \"settled\""));
    }

    #[test]
    fn test_unchanged_is_none() {
        let value = json!({"expense_total": 7000});
        assert!(generate_diff(&value, &value).is_none());
    }

    #[test]
    fn test_added_and_removed_fields() {
        let before = json!({"observations": "late count"});
        let after = json!({"closed_by": "op-2"});

        let diff = generate_diff(&before, &after).unwrap();
        assert!(diff.contains("observations: \"late count\" -> (removed)"));
        assert!(diff.contains("closed_by: (added) -> \"op-2\""));
    }

    #[test]
    fn test_arrays_are_summarised() {
        let before = json!({"applications": []});
        let after = json!({"applications": [{"amount": 2000}]});

        let diff = generate_diff(&before, &after).unwrap();
        assert_eq!(diff, "applications: [0 items] -> [1 items]");
    }

    #[test]
    fn test_long_strings_truncated() {
        let before = json!({"reason": "x".repeat(80)});
        let after = json!({"reason": "short"});
        assert!(generate_diff(&before, &after).unwrap().contains("...\""));
    }
}
