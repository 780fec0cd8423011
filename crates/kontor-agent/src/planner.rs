// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Planner-response parsing for the zero-tool-call fallback.
//!
//! The fallback call asks the model for exactly one JSON object
//! `{"tool": ..., "args": ...}`. Models wrap that in markdown fences or
//! surrounding prose often enough that the parser cuts from the first
//! `{` to the last `}` before deserializing.

use serde_json::Value;

/// Instruction appended to the transcript for the fallback call.
pub const PLANNER_INSTRUCTION: &str = "The user asked you to perform an action but no tool was \
called. Respond with exactly one JSON object of the form \
{\"tool\": \"<tool_name>\", \"args\": {...}} naming the single tool call that performs the \
requested action. No prose, no explanation.";

/// Extracts `(tool, args)` from the planner response content. Returns
/// `None` when no object with a non-empty `tool` string can be found;
/// a missing or non-object `args` defaults to `{}`.
pub fn parse(content: &str) -> Option<(String, Value)> {
    let trimmed = content.trim();
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end < start {
        return None;
    }
    let parsed: Value = serde_json::from_str(&trimmed[start..=end]).ok()?;

    let tool = parsed.get("tool")?.as_str()?.trim().to_string();
    if tool.is_empty() {
        return None;
    }
    let args = match parsed.get("args") {
        Some(Value::Object(map)) => Value::Object(map.clone()),
        _ => Value::Object(serde_json::Map::new()),
    };
    Some((tool, args))
}
