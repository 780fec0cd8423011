// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Verify-after-write: compare requested field values against the
//! re-read row.
//!
//! The read-back is a separate statement, not part of the write's
//! transaction. A concurrent writer that changes the row between the
//! two shows up as a mismatch and fails verification even though the
//! original write succeeded. That is the intended reading: the caller
//! may only claim success for state it can still observe.

use serde_json::{Map, Value};

/// Field keys whose persisted value differs from the requested one.
/// `persisted` is the entity's JSON view; absent keys read as null.
pub(crate) fn mismatched_fields(requested: &Map<String, Value>, persisted: &Value) -> Vec<String> {
    requested
        .iter()
        .filter(|(key, want)| {
            let have = persisted.get(key.as_str()).unwrap_or(&Value::Null);
            !values_equal(want, have)
        })
        .map(|(key, _)| key.clone())
        .collect()
}

/// Numeric values compare with a tolerance; SQLite gives back f64 for
/// REAL columns and exact equality on amounts is brittle.
fn values_equal(a: &Value, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return (x - y).abs() < 1e-9;
    }
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn matching_fields_produce_no_mismatches() {
        let requested = map(json!({"city": "Berlin", "lead_value": 5000.0}));
        let persisted = json!({"city": "Berlin", "lead_value": 5000, "email": null});
        assert!(mismatched_fields(&requested, &persisted).is_empty());
    }

    #[test]
    fn changed_field_is_reported() {
        let requested = map(json!({"city": "Berlin"}));
        let persisted = json!({"city": "Hamburg"});
        assert_eq!(mismatched_fields(&requested, &persisted), vec!["city"]);
    }

    #[test]
    fn missing_key_reads_as_null() {
        let requested = map(json!({"notes": "call back"}));
        let persisted = json!({"city": "Berlin"});
        assert_eq!(mismatched_fields(&requested, &persisted), vec!["notes"]);
        let cleared = map(json!({"notes": null}));
        assert!(mismatched_fields(&cleared, &persisted).is_empty());
    }

    #[test]
    fn numeric_comparison_tolerates_representation() {
        let requested = map(json!({"amount": 1200.5}));
        let persisted = json!({"amount": 1200.5000000001});
        assert!(mismatched_fields(&requested, &persisted).is_empty());
    }
}
