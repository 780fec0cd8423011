// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inline memory tag parsing.
//!
//! When learning is enabled the system prompt asks the model to end its
//! reply with one `[MEMORY: worthy=...; reason="..."]` tag. The tag is
//! stripped before the message is persisted or shown; the parsed verdict
//! rides along as message metadata for the offline consolidation job.

use std::sync::LazyLock;

use regex::Regex;

static MEMORY_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)\[MEMORY:\s*worthy\s*=\s*(true|false)\s*;\s*reason\s*=\s*"([^"]*)"\s*\]\s*$"#)
        .unwrap()
});

/// Parsed verdict from one trailing memory tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryTag {
    pub worthy: bool,
    pub reason: String,
}

/// Splits the final assistant text into displayable content and the
/// optional trailing memory tag. Tags anywhere else in the text are left
/// alone; the model is instructed to emit exactly one, at the end.
pub fn extract(text: &str) -> (String, Option<MemoryTag>) {
    match MEMORY_TAG.captures(text) {
        Some(caps) => {
            let full = caps.get(0).map(|m| m.start()).unwrap_or(text.len());
            let tag = MemoryTag {
                worthy: caps.get(1).map(|m| m.as_str()) == Some("true"),
                reason: caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
            };
            (text[..full].trim_end().to_string(), Some(tag))
        }
        None => (text.trim_end().to_string(), None),
    }
}
