// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Heuristic action-intent classification.
//!
//! Decides whether a user message asks the agent to *do* something
//! (create, update, delete, book) or merely asks a question. Zero-cost
//! keyword rules, no LLM pre-call. The decision controls two things
//! downstream: whether the provider is asked to force a tool call, and
//! whether assistant prose is buffered until the first tool delta.

use std::sync::LazyLock;

use regex::Regex;

/// English verbs that signal a tool-handled request. Listing and
/// counting verbs belong here too: "list all contacts" must go through
/// search_contacts, not a prose guess.
const ACTION_VERBS_EN: &[&str] = &[
    "create", "add", "new", "update", "change", "edit", "set", "delete",
    "remove", "cancel", "schedule", "book", "assign", "mark", "move",
    "rename", "log", "record", "register", "archive", "list", "count",
    "show", "find",
];

/// German verbs that signal a tool-handled request.
const ACTION_VERBS_DE: &[&str] = &[
    "erstelle", "erstellen", "anlegen", "lege", "hinzufügen", "füge",
    "aktualisiere", "aktualisieren", "ändere", "ändern", "bearbeite",
    "lösche", "löschen", "entferne", "storniere", "stornieren", "plane",
    "buche", "buchen", "weise", "markiere", "verschiebe", "benenne",
    "trage", "erfasse", "archiviere", "liste", "zeige", "zähle", "suche",
    "finde",
];

/// English nouns naming an entity the tool catalogue can touch.
const ENTITY_NOUNS_EN: &[&str] = &[
    "contact", "contacts", "lead", "leads", "client", "customer", "task",
    "tasks", "todo", "reminder", "project", "projects", "talent", "model",
    "booking", "bookings", "invoice", "invoices", "expense", "expenses",
    "appointment", "note",
];

/// German nouns naming an entity the tool catalogue can touch.
const ENTITY_NOUNS_DE: &[&str] = &[
    "kontakt", "kontakte", "kunde", "kunden", "aufgabe", "aufgaben",
    "projekt", "projekte", "buchung", "buchungen", "rechnung",
    "rechnungen", "ausgabe", "ausgaben", "termin", "termine", "notiz",
];

/// Monetary amounts: `€500`, `1.200,50 EUR`, `$99`, `250 CHF`.
static AMOUNT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:[€$£]\s*\d+|\d+(?:[.,]\d+)*\s*(?:€|eur|euro|usd|chf|dollars?))").unwrap()
});

/// Street addresses: `Hauptstraße 12`, `42 Baker Street`.
static ADDRESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b\p{L}+(?:straße|strasse|weg|platz|allee|gasse|ring)\s+\d+",
        r"|\b\d+\s+\p{L}+\s+(?:street|st\.|avenue|ave\b|road|rd\.?|lane|drive|boulevard|blvd)",
    ))
    .unwrap()
});

/// Outcome of classifying one user message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntentDecision {
    /// True when the message should be treated as an action request.
    pub action_intent: bool,
    /// Short machine-readable label for logs.
    pub reason: &'static str,
}

impl IntentDecision {
    fn action(reason: &'static str) -> Self {
        Self {
            action_intent: true,
            reason,
        }
    }

    fn conversational() -> Self {
        Self {
            action_intent: false,
            reason: "no_action_signal",
        }
    }
}

/// Pluggable intent classification strategy.
///
/// The orchestrator only consumes this trait, so the keyword rules can
/// be swapped for an embedding or LLM classifier without touching the
/// turn state machine.
pub trait IntentStrategy: Send + Sync {
    fn classify(&self, message: &str) -> IntentDecision;
}

/// Keyword-based bilingual (EN/DE) intent classifier.
///
/// A message is an action request when an action verb co-occurs with an
/// entity noun, or when a monetary amount or street address co-occurs
/// with an action verb ("add €500", "move her to Hauptstraße 12").
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordIntentClassifier;

impl KeywordIntentClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl IntentStrategy for KeywordIntentClassifier {
    fn classify(&self, message: &str) -> IntentDecision {
        let lower = message.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        let has_verb = ACTION_VERBS_EN
            .iter()
            .chain(ACTION_VERBS_DE)
            .any(|v| words.contains(v));
        if !has_verb {
            return IntentDecision::conversational();
        }

        let has_noun = ENTITY_NOUNS_EN
            .iter()
            .chain(ENTITY_NOUNS_DE)
            .any(|n| words.contains(n));
        if has_noun {
            return IntentDecision::action("verb_and_noun");
        }
        if AMOUNT_PATTERN.is_match(&lower) {
            return IntentDecision::action("verb_and_amount");
        }
        if ADDRESS_PATTERN.is_match(message) {
            return IntentDecision::action("verb_and_address");
        }

        IntentDecision::conversational()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(message: &str) -> IntentDecision {
        KeywordIntentClassifier::new().classify(message)
    }

    #[test]
    fn verb_plus_noun_is_action() {
        let d = classify("Create a contact for Amanda Lopez");
        assert!(d.action_intent);
        assert_eq!(d.reason, "verb_and_noun");
    }

    #[test]
    fn german_verb_plus_noun_is_action() {
        let d = classify("Lege einen Kontakt für Amanda Lopez an");
        assert!(d.action_intent);
        assert_eq!(d.reason, "verb_and_noun");
    }

    #[test]
    fn list_and_count_requests_are_action() {
        let d = classify("list all contacts");
        assert!(d.action_intent);
        assert_eq!(d.reason, "verb_and_noun");
        assert!(classify("count my open tasks").action_intent);
        assert!(classify("Liste alle Kontakte auf").action_intent);
        assert!(classify("Zähle meine offenen Aufgaben").action_intent);
    }

    #[test]
    fn question_without_verb_is_conversational() {
        let d = classify("Who is our contact at Monolith GmbH?");
        assert!(!d.action_intent);
        assert_eq!(d.reason, "no_action_signal");
    }

    #[test]
    fn verb_without_object_is_conversational() {
        let d = classify("Please update it");
        assert!(!d.action_intent);
        assert_eq!(d.reason, "no_action_signal");
    }

    #[test]
    fn amount_plus_verb_is_action() {
        let d = classify("Add €500 for the venue deposit");
        assert!(d.action_intent);
        assert_eq!(d.reason, "verb_and_amount");
    }

    #[test]
    fn amount_with_suffix_currency_is_matched() {
        let d = classify("Record 1.200,50 EUR from yesterday");
        assert!(d.action_intent);
        assert_eq!(d.reason, "verb_and_amount");
    }

    #[test]
    fn german_address_plus_verb_is_action() {
        let d = classify("Ändere die Adresse auf Hauptstraße 12");
        assert!(d.action_intent);
        assert_eq!(d.reason, "verb_and_address");
    }

    #[test]
    fn english_address_plus_verb_is_action() {
        let d = classify("Set her address to 42 Baker Street");
        assert!(d.action_intent);
        assert_eq!(d.reason, "verb_and_address");
    }

    #[test]
    fn amount_without_verb_is_conversational() {
        let d = classify("The invoice total was €500, right?");
        // "invoice" is a noun but there is no verb, so no action.
        assert!(!d.action_intent);
    }

    #[test]
    fn verb_embedded_in_longer_word_does_not_match() {
        // "settings" contains "set", "addendum" contains "add".
        let d = classify("Where are the settings for the addendum?");
        assert!(!d.action_intent);
    }

    #[test]
    fn greeting_is_conversational() {
        assert!(!classify("Guten Morgen!").action_intent);
        assert!(!classify("thanks, that was all").action_intent);
    }
}
