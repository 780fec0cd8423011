// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Booking tools (talent-agency vertical). Bookings reference a talent
//! row, so lookups resolve the talent first and messages carry the
//! talent's name, never a booking id.

use std::str::FromStr;

use kontor_core::{KontorError, RequestContext};
use kontor_storage::queries::{bookings as q, talent as talent_q};
use kontor_storage::{Booking, BookingStatus};
use serde_json::{Value, json};

use super::verify::mismatched_fields;
use super::{Resolution, arg_f64, arg_limit, arg_str, arg_string, contacts, projects, talent};
use crate::outcome::{ToolOutcome, localized};

fn view(b: &Booking) -> Value {
    json!({
        "id": b.id,
        "talent_id": b.talent_id,
        "contact_id": b.contact_id,
        "project_id": b.project_id,
        "status": b.status,
        "start_date": b.start_date,
        "end_date": b.end_date,
        "location": b.location,
        "fee": b.fee,
    })
}

fn not_found(ctx: &RequestContext) -> ToolOutcome {
    ToolOutcome::fail(localized(
        ctx.language,
        "I couldn't find a matching booking.",
        "Ich konnte keine passende Buchung finden.",
    ))
}

fn verification_failed(ctx: &RequestContext) -> ToolOutcome {
    ToolOutcome::fail(localized(
        ctx.language,
        "The booking could not be verified after writing.",
        "Die Buchung konnte nach dem Schreiben nicht bestätigt werden.",
    ))
    .with_extra("verification_failed", Value::Bool(true))
}

fn ambiguous(ctx: &RequestContext, hits: &[Booking]) -> ToolOutcome {
    ToolOutcome::disambiguation(
        localized(
            ctx.language,
            format!(
                "I found {} matching bookings. Which one do you mean?",
                hits.len()
            ),
            format!(
                "Ich habe {} passende Buchungen gefunden. Welche meinst du?",
                hits.len()
            ),
        ),
        hits.iter()
            .map(|b| {
                json!({
                    "id": b.id,
                    "status": b.status,
                    "start_date": b.start_date,
                    "end_date": b.end_date,
                    "location": b.location,
                })
            })
            .collect(),
    )
}

/// Booking lookup: by id, else all bookings of the named talent,
/// narrowed by start_date when given.
async fn resolve(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<Resolution<Booking>, KontorError> {
    if let Some(id) = arg_str(args, "id") {
        return Ok(match q::get_booking(db, &ctx.company_id, id).await? {
            Some(b) => Resolution::One(b),
            None => Resolution::None,
        });
    }
    let Some(name) = arg_str(args, "talent_name") else {
        return Ok(Resolution::None);
    };
    let talent_row = match talent::find_by_name(db, ctx, name).await? {
        Resolution::One(t) => t,
        Resolution::Many(_) | Resolution::None => return Ok(Resolution::None),
    };
    let filter = q::BookingFilter {
        talent_id: Some(talent_row.id),
        ..Default::default()
    };
    let mut hits = q::search_bookings(db, &ctx.company_id, &filter, 20).await?;
    if let Some(start) = arg_str(args, "start_date") {
        hits.retain(|b| b.start_date.as_deref() == Some(start));
    }
    Ok(match hits.len() {
        0 => Resolution::None,
        1 => Resolution::One(hits.remove(0)),
        _ => Resolution::Many(hits),
    })
}

pub(super) async fn create_booking(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    let talent_row = if let Some(id) = arg_str(args, "talent_id") {
        match talent_q::get_talent(db, &ctx.company_id, id).await? {
            Some(t) => t,
            None => return Ok(talent::not_found(ctx)),
        }
    } else {
        let name = arg_str(args, "talent_name").unwrap_or_default();
        match talent::find_by_name(db, ctx, name).await? {
            Resolution::One(t) => t,
            Resolution::Many(hits) => return Ok(talent::ambiguous(ctx, &hits)),
            Resolution::None => return Ok(talent::not_found(ctx)),
        }
    };

    let mut booking = Booking::new(&ctx.company_id, &ctx.user_id, &talent_row.id);
    booking.start_date = arg_string(args, "start_date");
    booking.end_date = arg_string(args, "end_date");
    booking.location = arg_string(args, "location");
    booking.fee = arg_f64(args, "fee");
    if let Some(contact_name) = arg_str(args, "contact_name") {
        match contacts::find_by_name(db, ctx, contact_name).await? {
            Resolution::One(c) => booking.contact_id = Some(c.id),
            Resolution::Many(hits) => return Ok(contacts::ambiguous(ctx, &hits)),
            Resolution::None => return Ok(contacts::not_found(ctx)),
        }
    }
    if let Some(project_name) = arg_str(args, "project_name") {
        match projects::find_by_name(db, ctx, project_name).await? {
            Resolution::One(p) => booking.project_id = Some(p.id),
            Resolution::Many(hits) => return Ok(projects::ambiguous(ctx, &hits)),
            Resolution::None => return Ok(projects::not_found(ctx)),
        }
    }

    q::insert_booking(db, &booking).await?;

    let Some(persisted) = q::get_booking(db, &ctx.company_id, &booking.id).await? else {
        return Ok(verification_failed(ctx));
    };
    let requested = view(&booking).as_object().cloned().unwrap_or_default();
    if !mismatched_fields(&requested, &view(&persisted)).is_empty() {
        return Ok(verification_failed(ctx));
    }

    let when = persisted
        .start_date
        .clone()
        .unwrap_or_else(|| localized(ctx.language, "an open date", "einen offenen Termin"));
    Ok(ToolOutcome::ok(localized(
        ctx.language,
        format!("Booked {} for {when} ({} status).", talent_row.name, persisted.status),
        format!("{} wurde für {when} gebucht (Status {}).", talent_row.name, persisted.status),
    ))
    .with_data(view(&persisted))
    .with_entity("booking", &persisted.id)
    .with_summary(format!("created booking for {}", talent_row.name)))
}

pub(super) async fn update_booking_status(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    let raw = arg_str(args, "status").unwrap_or_default();
    let Ok(status) = BookingStatus::from_str(raw) else {
        return Ok(ToolOutcome::fail(format!("invalid booking status: {raw}")));
    };

    let mut booking = match resolve(db, ctx, args).await? {
        Resolution::One(b) => b,
        Resolution::Many(hits) => return Ok(ambiguous(ctx, &hits)),
        Resolution::None => return Ok(not_found(ctx)),
    };
    booking.status = status;

    if !q::update_booking(db, &booking).await? {
        return Ok(not_found(ctx));
    }
    let Some(persisted) = q::get_booking(db, &ctx.company_id, &booking.id).await? else {
        return Ok(not_found(ctx));
    };
    if persisted.status != status {
        return Ok(ToolOutcome::fail(localized(
            ctx.language,
            "The status change could not be verified.",
            "Die Statusänderung konnte nicht bestätigt werden.",
        ))
        .with_extra("verification_failed", Value::Bool(true)));
    }

    let talent_name = talent_q::get_talent(db, &ctx.company_id, &persisted.talent_id)
        .await?
        .map(|t| t.name)
        .unwrap_or_else(|| localized(ctx.language, "the talent", "das Talent"));
    Ok(ToolOutcome::ok(localized(
        ctx.language,
        format!("The booking for {talent_name} is now {status}."),
        format!("Die Buchung für {talent_name} hat jetzt den Status {status}."),
    ))
    .with_data(view(&persisted))
    .with_entity("booking", &persisted.id)
    .with_summary(format!("set booking for {talent_name} to {status}")))
}

pub(super) async fn search_bookings(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    let mut filter = q::BookingFilter {
        status: arg_str(args, "status").and_then(|s| BookingStatus::from_str(s).ok()),
        ..Default::default()
    };
    if let Some(name) = arg_str(args, "talent_name") {
        match talent::find_by_name(db, ctx, name).await? {
            Resolution::One(t) => filter.talent_id = Some(t.id),
            Resolution::Many(hits) => return Ok(talent::ambiguous(ctx, &hits)),
            Resolution::None => return Ok(talent::not_found(ctx)),
        }
    }

    let hits = q::search_bookings(db, &ctx.company_id, &filter, arg_limit(args)).await?;
    let message = if hits.is_empty() {
        localized(ctx.language, "No bookings matched.", "Keine passenden Buchungen gefunden.")
    } else {
        localized(
            ctx.language,
            format!("Found {} bookings.", hits.len()),
            format!("{} Buchungen gefunden.", hits.len()),
        )
    };
    Ok(ToolOutcome::ok(message).with_data(json!({
        "count": hits.len(),
        "bookings": hits.iter().map(view).collect::<Vec<_>>(),
    })))
}
