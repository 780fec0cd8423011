// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per entity.
//!
//! Every query that touches business data takes the owning `company_id`
//! and filters by it; no function in this tree can read or write another
//! tenant's rows. Search functions build their WHERE clause dynamically
//! from a per-entity filter struct and bind through `params_from_iter`.

pub mod bookings;
pub mod contacts;
pub mod conversations;
pub mod expenses;
pub mod invoices;
pub mod knowledge;
pub mod llm_settings;
pub mod messages;
pub mod projects;
pub mod talent;
pub mod tasks;
