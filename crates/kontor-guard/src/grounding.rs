// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hallucination guard for name-bearing tool arguments.
//!
//! Language models occasionally invent a plausible name when the user
//! never said one ("delete Jane Jones" becomes "delete Jane Johnson").
//! Before a lookup, update or delete executes, every proper-name
//! argument must literally appear in the user's message or the recent
//! conversation window. Create tools are exempt: introducing a new name
//! is exactly what they are for.

use kontor_core::Language;
use serde_json::Value;
use tracing::warn;

/// Top-level argument fields treated as proper names.
const NAME_FIELDS: &[&str] = &["first_name", "last_name", "name", "title", "organization"];

/// A name argument that appears nowhere in the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UngroundedArg {
    pub field: String,
    pub value: String,
}

/// Result of checking one tool call's arguments.
#[derive(Debug, Clone, Default)]
pub struct GroundingReport {
    pub ungrounded: Vec<UngroundedArg>,
}

impl GroundingReport {
    pub fn is_grounded(&self) -> bool {
        self.ungrounded.is_empty()
    }
}

/// Checks every name-bearing top-level argument against the literal
/// user message and the recent-context window, case-insensitively.
///
/// Nested objects (such as an update tool's `updates` payload) are not
/// inspected: new values may legitimately be names the user just
/// introduced. Only the identifying lookup keys must be grounded.
pub fn check_arguments(
    tool_name: &str,
    arguments: &Value,
    user_message: &str,
    recent_context: &[String],
) -> GroundingReport {
    let mut report = GroundingReport::default();
    let Some(map) = arguments.as_object() else {
        return report;
    };

    let mut haystacks: Vec<String> = Vec::with_capacity(recent_context.len() + 1);
    haystacks.push(user_message.to_lowercase());
    haystacks.extend(recent_context.iter().map(|s| s.to_lowercase()));

    for field in NAME_FIELDS {
        let Some(value) = map.get(*field).and_then(Value::as_str) else {
            continue;
        };
        let needle = value.trim().to_lowercase();
        // Single characters match almost anything and guard nothing.
        if needle.chars().count() < 2 {
            continue;
        }
        if !haystacks.iter().any(|h| h.contains(&needle)) {
            report.ungrounded.push(UngroundedArg {
                field: (*field).to_string(),
                value: value.trim().to_string(),
            });
        }
    }

    if !report.is_grounded() {
        warn!(
            tool = tool_name,
            fields = ?report.ungrounded.iter().map(|u| u.field.as_str()).collect::<Vec<_>>(),
            "tool arguments not grounded in conversation"
        );
    }
    report
}

/// Corrective system message injected when grounding fails, telling the
/// model to re-read the user's exact wording instead of guessing.
pub fn corrective_message(language: Language, report: &GroundingReport) -> String {
    let values: Vec<&str> = report.ungrounded.iter().map(|u| u.value.as_str()).collect();
    let listed = values.join("\", \"");
    match language {
        Language::De => format!(
            "Korrektur: \"{listed}\" kommt in der Nachricht des Nutzers nicht vor. \
             Lies die Nachricht erneut und verwende ausschließlich Namen, die der \
             Nutzer wörtlich genannt hat."
        ),
        Language::En => format!(
            "Correction: \"{listed}\" does not appear in the user's message. \
             Re-read the message and use only names the user literally wrote."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn grounded_when_names_appear_in_message() {
        let args = json!({"first_name": "Amanda", "last_name": "Lopez"});
        let report = check_arguments(
            "update_contact",
            &args,
            "Please update Amanda Lopez's email",
            &[],
        );
        assert!(report.is_grounded());
    }

    #[test]
    fn case_insensitive_match() {
        let args = json!({"name": "monolith gmbh"});
        let report = check_arguments("get_project", &args, "Status of Monolith GmbH?", &[]);
        assert!(report.is_grounded());
    }

    #[test]
    fn invented_name_is_reported() {
        let args = json!({"first_name": "Jane", "last_name": "Johnson"});
        let report = check_arguments("delete_contact", &args, "Delete Jane Jones please", &[]);
        assert_eq!(
            report.ungrounded,
            vec![UngroundedArg {
                field: "last_name".to_string(),
                value: "Johnson".to_string(),
            }]
        );
    }

    #[test]
    fn recent_context_grounds_a_pronoun_followup() {
        let args = json!({"first_name": "Amanda", "last_name": "Lopez"});
        let report = check_arguments(
            "update_contact",
            &args,
            "Set her stage to QUALIFIED",
            &["Create a contact for Amanda Lopez".to_string()],
        );
        assert!(report.is_grounded());
    }

    #[test]
    fn nested_update_values_are_not_checked() {
        let args = json!({
            "first_name": "Jane",
            "last_name": "Jones",
            "updates": {"last_name": "Completely-New-Name"}
        });
        let report = check_arguments("update_contact", &args, "Rename Jane Jones", &[]);
        assert!(report.is_grounded());
    }

    #[test]
    fn single_character_values_are_skipped() {
        let args = json!({"name": "A"});
        let report = check_arguments("get_project", &args, "what about the z thing", &[]);
        assert!(report.is_grounded());
    }

    #[test]
    fn non_object_arguments_pass() {
        let report = check_arguments("get_contact", &json!(null), "hello", &[]);
        assert!(report.is_grounded());
    }

    #[test]
    fn corrective_message_lists_values_in_both_languages() {
        let report = GroundingReport {
            ungrounded: vec![UngroundedArg {
                field: "last_name".to_string(),
                value: "Johnson".to_string(),
            }],
        };
        let en = corrective_message(Language::En, &report);
        assert!(en.contains("\"Johnson\""));
        assert!(en.contains("literally"));
        let de = corrective_message(Language::De, &report);
        assert!(de.contains("\"Johnson\""));
        assert!(de.contains("wörtlich"));
    }
}
