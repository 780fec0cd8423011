// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool registry, argument validation and execution for Kontor.
//!
//! The [`registry`] describes every tool the model may call, [`validate`]
//! checks arguments before anything touches the database, [`dedupe`]
//! derives the key used for the rolling duplicate-action check, and
//! [`exec`] carries the calls out against storage with a read-back
//! verification after every write.

mod catalog;
pub mod dedupe;
pub mod exec;
pub mod outcome;
pub mod registry;
pub mod validate;

pub use dedupe::dedupe_key_for;
pub use exec::ToolExecutor;
pub use outcome::{ToolOutcome, localized};
pub use registry::{ToolKind, ToolRegistry, ToolSpec};
pub use validate::validate_arguments;
