// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! First line of defense for raw user input.
//!
//! Validates length, strips invisible Unicode that can smuggle hidden
//! instructions past a human reviewer, and flags known prompt-injection
//! phrasing. Flags are advisory: the message still reaches the model,
//! but the turn is logged and the system prompt's trust-boundary marker
//! tells the model to treat user text as data.

use kontor_core::KontorError;
use tracing::warn;

/// Hard cap on a single user message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4_000;

/// Phrases that attempt to override prior instructions (English).
const INJECTION_OVERRIDE_EN: &[&str] = &[
    "ignore previous instructions",
    "ignore all previous instructions",
    "ignore the previous instructions",
    "disregard previous instructions",
    "disregard all previous instructions",
    "forget all previous instructions",
];

/// Phrases that attempt to override prior instructions (German).
const INJECTION_OVERRIDE_DE: &[&str] = &[
    "ignoriere alle vorherigen anweisungen",
    "ignoriere die vorherigen anweisungen",
    "ignoriere vorherige anweisungen",
    "vergiss alle vorherigen anweisungen",
    "vergiss deine anweisungen",
];

/// Markers that try to impersonate a system or role switch.
const INJECTION_ROLE: &[&str] = &[
    "system:",
    "[system]",
    "<system>",
    "you are now",
    "du bist jetzt",
    "act as if you are",
];

/// Known jailbreak vocabulary.
const INJECTION_JAILBREAK: &[&str] = &[
    "dan mode",
    "developer mode",
    "entwicklermodus",
    "jailbreak",
];

/// Category of a detected prompt-injection pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum InjectionFlag {
    /// "Ignore previous instructions" and variants.
    InstructionOverride,
    /// Fake system-message or role-switch markers.
    RoleOverride,
    /// Named jailbreak modes.
    Jailbreak,
}

/// A validated, sanitized user message plus any advisory flags.
#[derive(Debug, Clone)]
pub struct SanitizedInput {
    /// Message text with invisible characters removed.
    pub text: String,
    /// Injection patterns detected in the sanitized text.
    pub flags: Vec<InjectionFlag>,
}

impl SanitizedInput {
    /// True when at least one injection pattern was detected.
    pub fn is_flagged(&self) -> bool {
        !self.flags.is_empty()
    }
}

/// Validates and sanitizes a raw user message.
///
/// Rejects empty, whitespace-only and over-length input. Strips
/// zero-width and bidirectional control characters before pattern
/// matching so that `igno\u{200B}re previous instructions` is caught.
/// Injection flags never reject the message.
pub fn sanitize_message(raw: &str) -> Result<SanitizedInput, KontorError> {
    if raw.trim().is_empty() {
        return Err(KontorError::Validation(
            "message must not be empty".to_string(),
        ));
    }
    let char_count = raw.chars().count();
    if char_count > MAX_MESSAGE_CHARS {
        return Err(KontorError::Validation(format!(
            "message is {char_count} characters, limit is {MAX_MESSAGE_CHARS}"
        )));
    }

    let text: String = raw.chars().filter(|c| !is_invisible(*c)).collect();
    if text.trim().is_empty() {
        return Err(KontorError::Validation(
            "message must not be empty".to_string(),
        ));
    }

    let flags = detect_injection(&text);
    if !flags.is_empty() {
        let labels: Vec<String> = flags.iter().map(|f| f.to_string()).collect();
        warn!(flags = ?labels, "injection patterns detected in user message");
    }

    Ok(SanitizedInput { text, flags })
}

/// Zero-width and bidirectional override characters stripped on input.
fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{FEFF}'
    )
}

fn detect_injection(text: &str) -> Vec<InjectionFlag> {
    let lower = text.to_lowercase();
    let mut flags = Vec::new();

    if INJECTION_OVERRIDE_EN
        .iter()
        .chain(INJECTION_OVERRIDE_DE)
        .any(|p| lower.contains(p))
    {
        flags.push(InjectionFlag::InstructionOverride);
    }
    if INJECTION_ROLE.iter().any(|p| lower.contains(p)) {
        flags.push(InjectionFlag::RoleOverride);
    }
    if INJECTION_JAILBREAK.iter().any(|p| lower.contains(p)) {
        flags.push(InjectionFlag::Jailbreak);
    }

    flags
}
