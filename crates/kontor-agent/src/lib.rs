// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kontor's streaming turn orchestrator.
//!
//! Ties the guard, context, provider, tool and ledger crates together
//! into one per-turn state machine. See [`turn::Orchestrator`].

pub mod accumulate;
pub mod memory_tag;
pub mod planner;
pub mod turn;

pub use turn::{Orchestrator, TurnOutcome, derive_title};
