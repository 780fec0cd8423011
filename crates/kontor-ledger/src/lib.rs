// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Action ledger and usage log for Kontor.
//!
//! Every executed non-search tool call leaves one append-only row here;
//! the same table backs the rolling duplicate-action check. Completed
//! turns additionally write a usage row for downstream billing.

pub mod action;
pub mod usage;

pub use action::{ActionLedger, ActionRecord};
pub use usage::{UsageRecord, UsageTotals, record_usage, usage_totals};
