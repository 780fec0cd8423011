// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant-scoped tool execution.
//!
//! One module per entity family. Every mutating path follows the same
//! shape: resolve the target (id first, fallback search second),
//! refuse to write on ambiguity, write, then re-read and verify that
//! the persisted row actually carries the requested values. Lookup ids
//! travel in structured payloads only; user-facing messages stay free
//! of internal ids.

mod bookings;
mod contacts;
mod expenses;
mod invoices;
mod projects;
mod talent;
mod tasks;
mod verify;

use kontor_core::{KontorError, RequestContext};
use kontor_storage::Database;
use serde_json::Value;
use tracing::debug;

use crate::outcome::ToolOutcome;

/// Result of a target lookup before a mutation.
pub(crate) enum Resolution<T> {
    One(T),
    Many(Vec<T>),
    None,
}

/// Non-empty trimmed string argument.
pub(crate) fn arg_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub(crate) fn arg_string(args: &Value, key: &str) -> Option<String> {
    arg_str(args, key).map(str::to_string)
}

pub(crate) fn arg_f64(args: &Value, key: &str) -> Option<f64> {
    args.get(key).and_then(Value::as_f64)
}

/// Search result cap: defaults to 10 rows, never more than 50.
pub(crate) fn arg_limit(args: &Value) -> usize {
    args.get("limit")
        .and_then(Value::as_u64)
        .map(|n| n.clamp(1, 50) as usize)
        .unwrap_or(10)
}

/// Executes validated, grounded, deduplicated tool calls against the
/// tenant's data.
#[derive(Clone)]
pub struct ToolExecutor {
    db: Database,
}

impl ToolExecutor {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Runs one tool call. Domain failures (not found, ambiguity,
    /// verification mismatch) come back as `success: false` outcomes;
    /// `Err` is reserved for storage faults.
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        tool: &str,
        args: &Value,
    ) -> Result<ToolOutcome, KontorError> {
        debug!(tool, user_id = %ctx.user_id, "executing tool");
        let db = &self.db;
        match tool {
            "create_contact" => contacts::create_contact(db, ctx, args).await,
            "update_contact" => contacts::update_contact(db, ctx, args).await,
            "delete_contact" => contacts::delete_contact(db, ctx, args).await,
            "search_contacts" => contacts::search_contacts(db, ctx, args).await,
            "count_contacts" => contacts::count_contacts(db, ctx, args).await,
            "create_lead" => contacts::create_lead(db, ctx, args).await,
            "update_lead_stage" => contacts::update_lead_stage(db, ctx, args).await,
            "delete_lead" => contacts::delete_lead(db, ctx, args).await,
            "search_leads" => contacts::search_leads(db, ctx, args).await,
            "count_leads" => contacts::count_leads(db, ctx, args).await,
            "create_task" => tasks::create_task(db, ctx, args).await,
            "update_task" => tasks::update_task(db, ctx, args).await,
            "complete_task" => tasks::complete_task(db, ctx, args).await,
            "delete_task" => tasks::delete_task(db, ctx, args).await,
            "bulk_delete_tasks" => tasks::bulk_delete_tasks(db, ctx, args).await,
            "bulk_update_tasks" => tasks::bulk_update_tasks(db, ctx, args).await,
            "search_tasks" => tasks::search_tasks(db, ctx, args).await,
            "create_project" => projects::create_project(db, ctx, args).await,
            "update_project" => projects::update_project(db, ctx, args).await,
            "delete_project" => projects::delete_project(db, ctx, args).await,
            "search_projects" => projects::search_projects(db, ctx, args).await,
            "create_talent" => talent::create_talent(db, ctx, args).await,
            "update_talent" => talent::update_talent(db, ctx, args).await,
            "search_talent" => talent::search_talent(db, ctx, args).await,
            "create_booking" => bookings::create_booking(db, ctx, args).await,
            "update_booking_status" => bookings::update_booking_status(db, ctx, args).await,
            "search_bookings" => bookings::search_bookings(db, ctx, args).await,
            "create_invoice" => invoices::create_invoice(db, ctx, args).await,
            "update_invoice_status" => invoices::update_invoice_status(db, ctx, args).await,
            "search_invoices" => invoices::search_invoices(db, ctx, args).await,
            "create_expense" => expenses::create_expense(db, ctx, args).await,
            "delete_expense" => expenses::delete_expense(db, ctx, args).await,
            "search_expenses" => expenses::search_expenses(db, ctx, args).await,
            other => Err(KontorError::ToolValidation(format!("unknown tool: {other}"))),
        }
    }
}
