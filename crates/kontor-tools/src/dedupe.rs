// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Duplicate-suppression keys for create and update tools.
//!
//! A key captures the *identity* of an action: repeating the same
//! request within the duplicate window produces the same key and is
//! short-circuited by the ledger. Different changes to the same target
//! must produce different keys, so update keys include the normalized
//! update payload. Deletes, searches and counts are never deduplicated;
//! deleting twice is naturally idempotent and reads are free.

use serde_json::Value;

/// Lowercased, trimmed string argument, empty when absent.
fn part(args: &Value, key: &str) -> String {
    args.get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_default()
}

/// Target identity for lookup-style tools: the id when the model sent
/// one, else the human lookup keys.
fn target(args: &Value, keys: &[&str]) -> String {
    let id = part(args, "id");
    if !id.is_empty() {
        return id;
    }
    keys.iter()
        .map(|k| part(args, k))
        .collect::<Vec<_>>()
        .join("|")
}

/// Normalized update payload. `serde_json::Map` keeps keys sorted, so
/// serialization is canonical for identical payloads.
fn updates(args: &Value) -> String {
    args.get("updates").map(Value::to_string).unwrap_or_default()
}

fn number(args: &Value, key: &str) -> String {
    args.get(key)
        .filter(|v| v.is_number())
        .map(Value::to_string)
        .unwrap_or_default()
}

/// Computes the duplicate-suppression key for a tool call, or `None`
/// when the tool is not subject to duplicate suppression.
pub fn dedupe_key_for(tool: &str, args: &Value) -> Option<String> {
    let key = match tool {
        "create_contact" | "create_lead" => format!(
            "{tool}:{}|{}|{}",
            part(args, "first_name"),
            part(args, "last_name"),
            part(args, "email")
        ),
        "update_contact" => format!(
            "{tool}:{}|{}",
            target(args, &["first_name", "last_name", "email"]),
            updates(args)
        ),
        "update_lead_stage" => format!(
            "{tool}:{}|{}",
            target(args, &["first_name", "last_name", "email"]),
            part(args, "stage")
        ),
        "create_task" => format!("{tool}:{}|{}", part(args, "title"), part(args, "due_date")),
        "update_task" => format!("{tool}:{}|{}", target(args, &["title"]), updates(args)),
        "complete_task" => format!("{tool}:{}", target(args, &["title"])),
        "bulk_update_tasks" => {
            let mut ids: Vec<String> = args
                .get("ids")
                .and_then(Value::as_array)
                .map(|a| {
                    a.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            ids.sort();
            format!("{tool}:{}|{}", ids.join(","), updates(args))
        }
        "create_project" => format!("{tool}:{}", part(args, "name")),
        "update_project" => format!("{tool}:{}|{}", target(args, &["name"]), updates(args)),
        "create_talent" => format!("{tool}:{}", part(args, "name")),
        "update_talent" => format!("{tool}:{}|{}", target(args, &["name"]), updates(args)),
        "create_booking" => format!(
            "{tool}:{}|{}",
            target(args, &["talent_id", "talent_name"]),
            part(args, "start_date")
        ),
        "update_booking_status" => format!(
            "{tool}:{}|{}",
            target(args, &["talent_name"]),
            part(args, "status")
        ),
        "create_invoice" => {
            let num = part(args, "number");
            if num.is_empty() {
                format!(
                    "{tool}:{}|{}",
                    part(args, "contact_name"),
                    number(args, "amount")
                )
            } else {
                format!("{tool}:{num}")
            }
        }
        "update_invoice_status" => format!(
            "{tool}:{}|{}",
            target(args, &["number"]),
            part(args, "status")
        ),
        "create_expense" => format!(
            "{tool}:{}|{}|{}",
            part(args, "description"),
            number(args, "amount"),
            part(args, "expense_date")
        ),
        _ => return None,
    };
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_contact_key_is_name_and_email() {
        let key = dedupe_key_for(
            "create_contact",
            &json!({"first_name": " Amanda", "last_name": "Lopez"}),
        )
        .unwrap();
        assert_eq!(key, "create_contact:amanda|lopez|");
    }

    #[test]
    fn create_contact_key_ignores_case() {
        let a = dedupe_key_for("create_contact", &json!({"first_name": "AMANDA", "last_name": "Lopez"}));
        let b = dedupe_key_for("create_contact", &json!({"first_name": "amanda", "last_name": "lopez"}));
        assert_eq!(a, b);
    }

    #[test]
    fn update_key_prefers_id_over_names() {
        let key = dedupe_key_for(
            "update_contact",
            &json!({"id": "C9", "first_name": "Jane", "updates": {"city": "Berlin"}}),
        )
        .unwrap();
        assert!(key.starts_with("update_contact:c9|"));
    }

    #[test]
    fn different_updates_to_same_target_differ() {
        let a = dedupe_key_for("update_contact", &json!({"id": "c1", "updates": {"city": "Berlin"}}));
        let b = dedupe_key_for("update_contact", &json!({"id": "c1", "updates": {"city": "Hamburg"}}));
        assert_ne!(a, b);
    }

    #[test]
    fn bulk_update_key_is_order_insensitive() {
        let a = dedupe_key_for(
            "bulk_update_tasks",
            &json!({"ids": ["t2", "t1"], "updates": {"status": "COMPLETED"}}),
        );
        let b = dedupe_key_for(
            "bulk_update_tasks",
            &json!({"ids": ["t1", "t2"], "updates": {"status": "COMPLETED"}}),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn deletes_and_reads_have_no_key() {
        assert!(dedupe_key_for("delete_contact", &json!({"id": "c1"})).is_none());
        assert!(dedupe_key_for("bulk_delete_tasks", &json!({"ids": ["t1"]})).is_none());
        assert!(dedupe_key_for("search_contacts", &json!({})).is_none());
        assert!(dedupe_key_for("count_leads", &json!({})).is_none());
    }

    #[test]
    fn invoice_key_uses_number_when_present() {
        let with_number = dedupe_key_for("create_invoice", &json!({"number": "INV-1001", "amount": 500}));
        assert_eq!(with_number.unwrap(), "create_invoice:inv-1001");
        let without = dedupe_key_for("create_invoice", &json!({"contact_name": "Acme", "amount": 500}));
        assert_eq!(without.unwrap(), "create_invoice:acme|500");
    }
}
