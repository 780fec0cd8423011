// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-tool required-argument checks.
//!
//! Providers do not reliably enforce the JSON Schema they are sent, so
//! every call is re-checked here before execution. A failure produces a
//! model-facing error string that is injected as a tool result; the
//! model corrects itself within the same turn.

use serde_json::Value;

/// Non-empty trimmed string argument.
fn str_arg<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn has_str(args: &Value, key: &str) -> bool {
    str_arg(args, key).is_some()
}

fn has_number(args: &Value, key: &str) -> bool {
    args.get(key).is_some_and(Value::is_number)
}

fn non_empty_string_array(args: &Value, key: &str) -> bool {
    args.get(key)
        .and_then(Value::as_array)
        .is_some_and(|a| !a.is_empty() && a.iter().all(|v| v.as_str().is_some_and(|s| !s.trim().is_empty())))
}

fn non_empty_object(args: &Value, key: &str) -> bool {
    args.get(key)
        .and_then(Value::as_object)
        .is_some_and(|m| !m.is_empty())
}

fn any_str(args: &Value, keys: &[&str]) -> bool {
    keys.iter().any(|k| has_str(args, k))
}

/// Validates one tool call's arguments against the tool's contract.
pub fn validate_arguments(tool: &str, args: &Value) -> Result<(), String> {
    match tool {
        "create_contact" | "create_lead" => {
            if !has_str(args, "first_name") || !has_str(args, "last_name") {
                return Err(format!("{tool} requires non-empty first_name and last_name"));
            }
        }
        "update_contact" => {
            require_lookup(tool, args, &["id", "first_name", "last_name", "email"])?;
            require_updates(tool, args)?;
        }
        "delete_contact" | "delete_lead" => {
            require_lookup(tool, args, &["id", "first_name", "last_name", "email"])?;
        }
        "update_lead_stage" => {
            require_lookup(tool, args, &["id", "first_name", "last_name", "email"])?;
            if !has_str(args, "stage") {
                return Err(format!("{tool} requires a stage"));
            }
        }
        "create_task" => {
            if !has_str(args, "title") {
                return Err(format!("{tool} requires a non-empty title"));
            }
        }
        "update_task" => {
            require_lookup(tool, args, &["id", "title"])?;
            require_updates(tool, args)?;
        }
        "complete_task" | "delete_task" => {
            require_lookup(tool, args, &["id", "title"])?;
        }
        "bulk_delete_tasks" => {
            if !non_empty_string_array(args, "ids") {
                return Err(format!("{tool} requires a non-empty ids array"));
            }
        }
        "bulk_update_tasks" => {
            if !non_empty_string_array(args, "ids") {
                return Err(format!("{tool} requires a non-empty ids array"));
            }
            require_updates(tool, args)?;
        }
        "create_project" => {
            if !has_str(args, "name") {
                return Err(format!("{tool} requires a non-empty name"));
            }
        }
        "update_project" => {
            require_lookup(tool, args, &["id", "name"])?;
            require_updates(tool, args)?;
        }
        "delete_project" => {
            require_lookup(tool, args, &["id", "name"])?;
        }
        "create_talent" => {
            if !has_str(args, "name") {
                return Err(format!("{tool} requires a non-empty name"));
            }
        }
        "update_talent" => {
            require_lookup(tool, args, &["id", "name"])?;
            require_updates(tool, args)?;
        }
        "create_booking" => {
            if !any_str(args, &["talent_id", "talent_name"]) {
                return Err(format!("{tool} requires talent_id or talent_name"));
            }
        }
        "update_booking_status" => {
            require_lookup(tool, args, &["id", "talent_name"])?;
            if !has_str(args, "status") {
                return Err(format!("{tool} requires a status"));
            }
        }
        "create_invoice" => {
            if !has_number(args, "amount") {
                return Err(format!("{tool} requires a numeric amount"));
            }
        }
        "update_invoice_status" => {
            require_lookup(tool, args, &["id", "number"])?;
            if !has_str(args, "status") {
                return Err(format!("{tool} requires a status"));
            }
        }
        "create_expense" => {
            if !has_str(args, "description") {
                return Err(format!("{tool} requires a non-empty description"));
            }
            if !has_number(args, "amount") {
                return Err(format!("{tool} requires a numeric amount"));
            }
        }
        "delete_expense" => {
            require_lookup(tool, args, &["id", "description"])?;
        }
        "search_contacts" | "count_contacts" | "search_leads" | "count_leads"
        | "search_tasks" | "search_projects" | "search_talent" | "search_bookings"
        | "search_invoices" | "search_expenses" => {}
        other => return Err(format!("unknown tool: {other}")),
    }
    Ok(())
}

fn require_lookup(tool: &str, args: &Value, keys: &[&str]) -> Result<(), String> {
    if any_str(args, keys) {
        Ok(())
    } else {
        Err(format!("{tool} requires one of: {}", keys.join(", ")))
    }
}

fn require_updates(tool: &str, args: &Value) -> Result<(), String> {
    if non_empty_object(args, "updates") {
        Ok(())
    } else {
        Err(format!("{tool} requires a non-empty updates object"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_contact_needs_both_names() {
        assert!(validate_arguments("create_contact", &json!({"first_name": "Amanda", "last_name": "Lopez"})).is_ok());
        assert!(validate_arguments("create_contact", &json!({"first_name": "Amanda"})).is_err());
        assert!(validate_arguments("create_contact", &json!({"first_name": "  ", "last_name": "Lopez"})).is_err());
    }

    #[test]
    fn update_contact_needs_lookup_and_updates() {
        let ok = json!({"first_name": "Amanda", "last_name": "Lopez", "updates": {"city": "Berlin"}});
        assert!(validate_arguments("update_contact", &ok).is_ok());
        let no_lookup = json!({"updates": {"city": "Berlin"}});
        assert!(validate_arguments("update_contact", &no_lookup).is_err());
        let empty_updates = json!({"id": "c1", "updates": {}});
        assert!(validate_arguments("update_contact", &empty_updates).is_err());
    }

    #[test]
    fn bulk_ops_need_non_empty_id_arrays() {
        assert!(validate_arguments("bulk_delete_tasks", &json!({"ids": ["t1", "t2"]})).is_ok());
        assert!(validate_arguments("bulk_delete_tasks", &json!({"ids": []})).is_err());
        assert!(validate_arguments("bulk_delete_tasks", &json!({"ids": ["t1", ""]})).is_err());
        assert!(validate_arguments("bulk_delete_tasks", &json!({})).is_err());
        assert!(
            validate_arguments("bulk_update_tasks", &json!({"ids": ["t1"], "updates": {"status": "COMPLETED"}}))
                .is_ok()
        );
        assert!(validate_arguments("bulk_update_tasks", &json!({"ids": ["t1"]})).is_err());
    }

    #[test]
    fn invoice_amount_must_be_numeric() {
        assert!(validate_arguments("create_invoice", &json!({"amount": 1200.5})).is_ok());
        assert!(validate_arguments("create_invoice", &json!({"amount": "1200"})).is_err());
        assert!(validate_arguments("create_invoice", &json!({})).is_err());
    }

    #[test]
    fn status_updates_need_target_and_status() {
        assert!(validate_arguments("update_invoice_status", &json!({"number": "INV-1001", "status": "PAID"})).is_ok());
        assert!(validate_arguments("update_invoice_status", &json!({"status": "PAID"})).is_err());
        assert!(validate_arguments("update_booking_status", &json!({"talent_name": "Mia Ray"})).is_err());
    }

    #[test]
    fn searches_accept_empty_arguments() {
        assert!(validate_arguments("search_contacts", &json!({})).is_ok());
        assert!(validate_arguments("count_leads", &json!({})).is_ok());
    }

    #[test]
    fn unknown_tool_is_rejected() {
        let err = validate_arguments("drop_database", &json!({})).unwrap_err();
        assert!(err.contains("unknown tool"));
    }
}
