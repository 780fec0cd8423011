// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Guard rail stages that run before the model and before every tool.
//!
//! Three independent checks: [`input`] validates and sanitizes the raw
//! user message, [`intent`] classifies whether it asks for an action,
//! and [`grounding`] verifies that name-bearing tool arguments were
//! actually said by the user.

pub mod grounding;
pub mod input;
pub mod intent;

pub use grounding::{GroundingReport, UngroundedArg, check_arguments, corrective_message};
pub use input::{InjectionFlag, SanitizedInput, sanitize_message};
pub use intent::{IntentDecision, IntentStrategy, KeywordIntentClassifier};
