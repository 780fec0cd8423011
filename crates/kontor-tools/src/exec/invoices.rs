// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Invoice tools. Invoices carry a human-facing number, so lookups and
//! messages work with the number rather than the row id.

use std::str::FromStr;

use kontor_core::{KontorError, RequestContext};
use kontor_storage::queries::invoices as q;
use kontor_storage::{Invoice, InvoiceStatus};
use serde_json::{Value, json};

use super::verify::mismatched_fields;
use super::{Resolution, arg_f64, arg_limit, arg_str, arg_string, contacts};
use crate::outcome::{ToolOutcome, localized};

fn view(i: &Invoice) -> Value {
    json!({
        "id": i.id,
        "number": i.number,
        "contact_id": i.contact_id,
        "amount": i.amount,
        "currency": i.currency,
        "status": i.status,
        "due_date": i.due_date,
        "issued_at": i.issued_at,
    })
}

fn not_found(ctx: &RequestContext) -> ToolOutcome {
    ToolOutcome::fail(localized(
        ctx.language,
        "I couldn't find a matching invoice.",
        "Ich konnte keine passende Rechnung finden.",
    ))
}

fn ambiguous(ctx: &RequestContext, hits: &[Invoice]) -> ToolOutcome {
    ToolOutcome::disambiguation(
        localized(
            ctx.language,
            format!(
                "I found {} matching invoices. Which one do you mean?",
                hits.len()
            ),
            format!(
                "Ich habe {} passende Rechnungen gefunden. Welche meinst du?",
                hits.len()
            ),
        ),
        hits.iter()
            .map(|i| {
                json!({
                    "id": i.id,
                    "number": i.number,
                    "amount": i.amount,
                    "currency": i.currency,
                    "status": i.status,
                })
            })
            .collect(),
    )
}

fn verification_failed(ctx: &RequestContext) -> ToolOutcome {
    ToolOutcome::fail(localized(
        ctx.language,
        "The invoice could not be verified after writing.",
        "Die Rechnung konnte nach dem Schreiben nicht bestätigt werden.",
    ))
    .with_extra("verification_failed", Value::Bool(true))
}

async fn resolve(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<Resolution<Invoice>, KontorError> {
    if let Some(id) = arg_str(args, "id") {
        return Ok(match q::get_invoice(db, &ctx.company_id, id).await? {
            Some(i) => Resolution::One(i),
            None => Resolution::None,
        });
    }
    let Some(number) = arg_str(args, "number") else {
        return Ok(Resolution::None);
    };
    let filter = q::InvoiceFilter {
        query: Some(number.to_string()),
        ..Default::default()
    };
    let mut hits = q::search_invoices(db, &ctx.company_id, &filter, 10).await?;
    if let Some(pos) = hits.iter().position(|i| i.number.eq_ignore_ascii_case(number)) {
        return Ok(Resolution::One(hits.remove(pos)));
    }
    Ok(match hits.len() {
        0 => Resolution::None,
        1 => Resolution::One(hits.remove(0)),
        _ => Resolution::Many(hits),
    })
}

/// Sequential fallback number when the model passes none.
async fn next_number(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
) -> Result<String, KontorError> {
    let existing = q::count_invoices(db, &ctx.company_id, &q::InvoiceFilter::default()).await?;
    Ok(format!("INV-{:04}", existing + 1))
}

pub(super) async fn create_invoice(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    let amount = arg_f64(args, "amount").unwrap_or(0.0);
    let currency = arg_string(args, "currency").unwrap_or_else(|| ctx.currency.clone());
    let number = match arg_string(args, "number") {
        Some(n) => n,
        None => next_number(db, ctx).await?,
    };

    let mut invoice = Invoice::new(&ctx.company_id, &ctx.user_id, number, amount, currency);
    invoice.due_date = arg_string(args, "due_date");
    if let Some(id) = arg_string(args, "contact_id") {
        invoice.contact_id = Some(id);
    } else if let Some(contact_name) = arg_str(args, "contact_name") {
        match contacts::find_by_name(db, ctx, contact_name).await? {
            Resolution::One(c) => invoice.contact_id = Some(c.id),
            Resolution::Many(hits) => return Ok(contacts::ambiguous(ctx, &hits)),
            Resolution::None => return Ok(contacts::not_found(ctx)),
        }
    }

    q::insert_invoice(db, &invoice).await?;

    let Some(persisted) = q::get_invoice(db, &ctx.company_id, &invoice.id).await? else {
        return Ok(verification_failed(ctx));
    };
    let requested = view(&invoice).as_object().cloned().unwrap_or_default();
    if !mismatched_fields(&requested, &view(&persisted)).is_empty() {
        return Ok(verification_failed(ctx));
    }

    Ok(ToolOutcome::ok(localized(
        ctx.language,
        format!(
            "Created invoice {} over {:.2} {}.",
            persisted.number, persisted.amount, persisted.currency
        ),
        format!(
            "Rechnung {} über {:.2} {} wurde erstellt.",
            persisted.number, persisted.amount, persisted.currency
        ),
    ))
    .with_data(view(&persisted))
    .with_entity("invoice", &persisted.id)
    .with_summary(format!("created invoice {}", persisted.number)))
}

pub(super) async fn update_invoice_status(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    let raw = arg_str(args, "status").unwrap_or_default();
    let Ok(status) = InvoiceStatus::from_str(raw) else {
        return Ok(ToolOutcome::fail(format!("invalid invoice status: {raw}")));
    };

    let mut invoice = match resolve(db, ctx, args).await? {
        Resolution::One(i) => i,
        Resolution::Many(hits) => return Ok(ambiguous(ctx, &hits)),
        Resolution::None => return Ok(not_found(ctx)),
    };
    invoice.status = status;

    if !q::update_invoice(db, &invoice).await? {
        return Ok(not_found(ctx));
    }
    let Some(persisted) = q::get_invoice(db, &ctx.company_id, &invoice.id).await? else {
        return Ok(not_found(ctx));
    };
    if persisted.status != status {
        return Ok(verification_failed(ctx));
    }

    Ok(ToolOutcome::ok(localized(
        ctx.language,
        format!("Invoice {} is now {status}.", persisted.number),
        format!("Rechnung {} hat jetzt den Status {status}.", persisted.number),
    ))
    .with_data(view(&persisted))
    .with_entity("invoice", &persisted.id)
    .with_summary(format!("set invoice {} to {status}", persisted.number)))
}

pub(super) async fn search_invoices(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    let filter = q::InvoiceFilter {
        query: arg_string(args, "query"),
        status: arg_str(args, "status").and_then(|s| InvoiceStatus::from_str(s).ok()),
        ..Default::default()
    };

    let hits = q::search_invoices(db, &ctx.company_id, &filter, arg_limit(args)).await?;
    let message = if hits.is_empty() {
        localized(ctx.language, "No invoices matched.", "Keine passenden Rechnungen gefunden.")
    } else {
        localized(
            ctx.language,
            format!("Found {} invoices.", hits.len()),
            format!("{} Rechnungen gefunden.", hits.len()),
        )
    };
    Ok(ToolOutcome::ok(message).with_data(json!({
        "count": hits.len(),
        "invoices": hits.iter().map(view).collect::<Vec<_>>(),
    })))
}
