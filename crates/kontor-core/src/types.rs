// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Kontor workspace.
//!
//! The turn transcript is modeled as a tagged-variant message list so role
//! and ordering invariants are enforced by the type system rather than by
//! convention over an untyped array.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Supported response languages. Tool result messages and progress lines
/// are localized to this; the model itself is instructed to answer in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    De,
}

impl Language {
    /// Parse a BCP-47-ish tag or plain language name. Unknown values fall
    /// back to English.
    pub fn from_tag(tag: &str) -> Self {
        let lower = tag.trim().to_lowercase();
        if lower == "de" || lower.starts_with("de-") || lower == "german" || lower == "deutsch" {
            Language::De
        } else {
            Language::En
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::En
    }
}

/// Industry vertical of the tenant. Gates visibility of vertical-specific
/// tools (talent/booking) and selects terminology in the system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Industry {
    General,
    TalentAgency,
}

impl Industry {
    pub fn from_label(label: &str) -> Self {
        let norm: String = label
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();
        match norm.as_str() {
            "talentagency" | "talentagentur" | "talent" => Industry::TalentAgency,
            _ => Industry::General,
        }
    }
}

impl Default for Industry {
    fn default() -> Self {
        Industry::General
    }
}

/// Which wire dialect the tenant's configured LLM backend speaks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    OpenAiCompatible,
    Anthropic,
    Google,
    Local,
}

/// Tool-choice directive passed to the provider. Forced to `Required` when
/// the turn classified as action intent, otherwise left to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolChoice {
    Auto,
    Required,
}

/// Why the provider stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    Other,
}

/// One provider-agnostic chunk of a streamed completion.
///
/// Tool-call fragments arrive keyed by the stream's own index field; the
/// orchestrator accumulates `name`/`arguments` per index and parses the
/// JSON only once the segment is complete.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    ContentDelta(String),
    ToolCallDelta {
        index: usize,
        id: Option<String>,
        name: Option<String>,
        arguments: String,
    },
    Usage {
        prompt_tokens: u64,
        completion_tokens: u64,
    },
    Finish(FinishReason),
}

/// A fully accumulated model-requested tool invocation. `arguments` is the
/// raw JSON string; it must parse before execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// One entry in the turn transcript sent to the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptMessage {
    System { content: String },
    User { content: String },
    Assistant { content: String, tool_calls: Vec<ToolCall> },
    ToolResult { call_id: String, payload: serde_json::Value },
}

impl TranscriptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        TranscriptMessage::System { content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        TranscriptMessage::User { content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        TranscriptMessage::Assistant { content: content.into(), tool_calls: Vec::new() }
    }

    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        TranscriptMessage::Assistant { content: content.into(), tool_calls }
    }

    pub fn tool_result(call_id: impl Into<String>, payload: serde_json::Value) -> Self {
        TranscriptMessage::ToolResult { call_id: call_id.into(), payload }
    }
}

/// Resolved per-turn identity and locale bundle, threaded through context
/// assembly, tool execution, and the ledger.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub conversation_id: String,
    pub user_id: String,
    pub company_id: String,
    pub language: Language,
    pub timezone: String,
    pub currency: String,
    pub industry: Industry,
    pub industry_label: String,
    /// Elevated callers (admin role) bypass the industry tool filter.
    pub elevated: bool,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            conversation_id: String::new(),
            user_id: String::new(),
            company_id: String::new(),
            language: Language::default(),
            timezone: "UTC".to_string(),
            currency: "EUR".to_string(),
            industry: Industry::default(),
            industry_label: "general".to_string(),
            elevated: false,
        }
    }
}

/// Current UTC time as an ISO-8601 string with millisecond precision,
/// matching the format SQLite's `strftime('%Y-%m-%dT%H:%M:%fZ')` emits.
pub fn now_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Fresh random identifier for rows and tool calls.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_tag_parsing() {
        assert_eq!(Language::from_tag("de"), Language::De);
        assert_eq!(Language::from_tag("de-AT"), Language::De);
        assert_eq!(Language::from_tag("Deutsch"), Language::De);
        assert_eq!(Language::from_tag("en"), Language::En);
        assert_eq!(Language::from_tag("fr"), Language::En);
        assert_eq!(Language::from_tag(""), Language::En);
    }

    #[test]
    fn industry_label_normalization() {
        assert_eq!(Industry::from_label("talent_agency"), Industry::TalentAgency);
        assert_eq!(Industry::from_label("Talent Agency"), Industry::TalentAgency);
        assert_eq!(Industry::from_label("Talentagentur"), Industry::TalentAgency);
        assert_eq!(Industry::from_label("real_estate"), Industry::General);
        assert_eq!(Industry::from_label(""), Industry::General);
    }

    #[test]
    fn provider_kind_round_trips() {
        use std::str::FromStr;
        for kind in [
            ProviderKind::OpenAiCompatible,
            ProviderKind::Anthropic,
            ProviderKind::Google,
            ProviderKind::Local,
        ] {
            let s = kind.to_string();
            assert_eq!(ProviderKind::from_str(&s).unwrap(), kind);
        }
        assert_eq!(ProviderKind::OpenAiCompatible.to_string(), "openai_compatible");
    }

    #[test]
    fn transcript_constructors() {
        let msg = TranscriptMessage::assistant_with_tools(
            "",
            vec![ToolCall {
                id: "call-1".into(),
                name: "create_contact".into(),
                arguments: r#"{"first_name":"Amanda"}"#.into(),
            }],
        );
        match msg {
            TranscriptMessage::Assistant { content, tool_calls } => {
                assert!(content.is_empty());
                assert_eq!(tool_calls.len(), 1);
                assert_eq!(tool_calls[0].name, "create_contact");
            }
            _ => panic!("expected assistant variant"),
        }
    }

    #[test]
    fn now_iso_shape() {
        let ts = now_iso();
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), "2026-01-01T00:00:00.000Z".len());
    }
}
