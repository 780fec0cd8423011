// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Uniform result shape for every tool execution.
//!
//! Whatever happens inside the executor, the model always receives
//! `{success, data?, message, …extras}`. The human-readable `message`
//! is localized and never contains internal row ids; ids the model
//! needs for follow-up calls (disambiguation choices) travel in the
//! structured `data` field instead.

use kontor_core::Language;
use serde_json::{Map, Value, json};

/// Result of one tool execution, consumed twice: serialized as the
/// tool-result payload for the model, and read by the orchestrator for
/// the ledger row and progress events.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub success: bool,
    pub data: Option<Value>,
    pub message: String,
    /// Extra top-level payload fields (`disambiguation`, counts).
    pub extras: Map<String, Value>,
    /// Entity coordinates for the action ledger, when one row was touched.
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    /// One-line summary for the ledger, defaults to `message`.
    pub summary: Option<String>,
}

impl ToolOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: message.into(),
            extras: Map::new(),
            entity_type: None,
            entity_id: None,
            summary: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: message.into(),
            extras: Map::new(),
            entity_type: None,
            entity_id: None,
            summary: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_entity(mut self, entity_type: &str, entity_id: &str) -> Self {
        self.entity_type = Some(entity_type.to_string());
        self.entity_id = Some(entity_id.to_string());
        self
    }

    pub fn with_extra(mut self, key: &str, value: Value) -> Self {
        self.extras.insert(key.to_string(), value);
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Disambiguation outcome: more than one row matched a lookup. Never
    /// a write. `candidates` carry the ids the model needs to retry with
    /// an exact target.
    pub fn disambiguation(message: impl Into<String>, candidates: Vec<Value>) -> Self {
        Self::fail(message)
            .with_extra("disambiguation", Value::Bool(true))
            .with_data(json!({ "candidates": candidates }))
    }

    /// Serializes the payload handed to the model as a tool result.
    pub fn payload(&self) -> Value {
        let mut map = Map::new();
        map.insert("success".to_string(), Value::Bool(self.success));
        if let Some(data) = &self.data {
            map.insert("data".to_string(), data.clone());
        }
        map.insert("message".to_string(), Value::String(self.message.clone()));
        for (k, v) in &self.extras {
            map.insert(k.clone(), v.clone());
        }
        Value::Object(map)
    }

    /// Ledger summary line, falling back to the user-facing message.
    pub fn summary_line(&self) -> &str {
        self.summary.as_deref().unwrap_or(&self.message)
    }

    pub fn is_disambiguation(&self) -> bool {
        matches!(self.extras.get("disambiguation"), Some(Value::Bool(true)))
    }
}

/// Picks the message variant for the request language.
pub fn localized(language: Language, en: impl Into<String>, de: impl Into<String>) -> String {
    match language {
        Language::En => en.into(),
        Language::De => de.into(),
    }
}
