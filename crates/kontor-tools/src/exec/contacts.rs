// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact and lead tools. Leads are contacts with a pipeline stage,
//! so both tool families resolve against the same table.

use std::str::FromStr;

use kontor_core::{KontorError, RequestContext};
use kontor_storage::queries::contacts as q;
use kontor_storage::{Contact, LeadStage};
use serde_json::{Map, Value, json};

use super::{Resolution, arg_f64, arg_limit, arg_str, arg_string};
use crate::exec::verify::mismatched_fields;
use crate::outcome::{ToolOutcome, localized};

fn view(c: &Contact) -> Value {
    json!({
        "id": c.id,
        "first_name": c.first_name,
        "last_name": c.last_name,
        "email": c.email,
        "phone": c.phone,
        "organization": c.organization,
        "address": c.address,
        "city": c.city,
        "notes": c.notes,
        "lead_stage": c.lead_stage,
        "lead_source": c.lead_source,
        "lead_value": c.lead_value,
    })
}

fn candidate(c: &Contact) -> Value {
    json!({
        "id": c.id,
        "label": match &c.email {
            Some(email) => format!("{} ({email})", c.full_name()),
            None => c.full_name(),
        },
        "organization": c.organization,
        "city": c.city,
    })
}

/// Resolve a contact by id, else by email, else by name search.
async fn resolve(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<Resolution<Contact>, KontorError> {
    if let Some(id) = arg_str(args, "id") {
        return Ok(match q::get_contact(db, &ctx.company_id, id).await? {
            Some(c) => Resolution::One(c),
            None => Resolution::None,
        });
    }

    if let Some(email) = arg_string(args, "email") {
        let filter = q::ContactFilter {
            email: Some(email),
            ..Default::default()
        };
        let mut hits = q::search_contacts(db, &ctx.company_id, &filter, 10).await?;
        match hits.len() {
            0 => {}
            1 => return Ok(Resolution::One(hits.remove(0))),
            _ => return Ok(Resolution::Many(hits)),
        }
    }

    let name_query: String = [arg_str(args, "first_name"), arg_str(args, "last_name")]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    if name_query.is_empty() {
        return Ok(Resolution::None);
    }
    let filter = q::ContactFilter {
        query: Some(name_query),
        ..Default::default()
    };
    let mut hits = q::search_contacts(db, &ctx.company_id, &filter, 10).await?;
    Ok(match hits.len() {
        0 => Resolution::None,
        1 => Resolution::One(hits.remove(0)),
        _ => Resolution::Many(hits),
    })
}

/// Name-only lookup used when other entities link a contact by name.
pub(super) async fn find_by_name(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    name: &str,
) -> Result<Resolution<Contact>, KontorError> {
    let filter = q::ContactFilter {
        query: Some(name.to_string()),
        ..Default::default()
    };
    let mut hits = q::search_contacts(db, &ctx.company_id, &filter, 10).await?;
    Ok(match hits.len() {
        0 => Resolution::None,
        1 => Resolution::One(hits.remove(0)),
        _ => Resolution::Many(hits),
    })
}

pub(super) fn not_found(ctx: &RequestContext) -> ToolOutcome {
    ToolOutcome::fail(localized(
        ctx.language,
        "I couldn't find a matching contact.",
        "Ich konnte keinen passenden Kontakt finden.",
    ))
}

pub(super) fn ambiguous(ctx: &RequestContext, hits: &[Contact]) -> ToolOutcome {
    ToolOutcome::disambiguation(
        localized(
            ctx.language,
            format!(
                "I found {} matching contacts. Which one do you mean?",
                hits.len()
            ),
            format!(
                "Ich habe {} passende Kontakte gefunden. Welchen meinst du?",
                hits.len()
            ),
        ),
        hits.iter().map(candidate).collect(),
    )
}

fn verification_failed(ctx: &RequestContext, fields: &[String]) -> ToolOutcome {
    ToolOutcome::fail(localized(
        ctx.language,
        format!(
            "The write could not be verified; these fields did not persist: {}.",
            fields.join(", ")
        ),
        format!(
            "Die Änderung konnte nicht bestätigt werden; diese Felder wurden nicht übernommen: {}.",
            fields.join(", ")
        ),
    ))
    .with_extra("verification_failed", Value::Bool(true))
}

/// Applies `updates` to the row and returns the view-aligned map used
/// for verification. Unknown keys are dropped; an invalid enum value
/// aborts with a model-facing error.
fn apply_updates(
    contact: &mut Contact,
    updates: &Map<String, Value>,
) -> Result<Map<String, Value>, String> {
    let mut requested = Map::new();
    for (key, value) in updates {
        match key.as_str() {
            "first_name" => {
                if let Some(s) = value.as_str() {
                    contact.first_name = s.trim().to_string();
                    requested.insert(key.clone(), json!(contact.first_name));
                }
            }
            "last_name" => {
                if let Some(s) = value.as_str() {
                    contact.last_name = s.trim().to_string();
                    requested.insert(key.clone(), json!(contact.last_name));
                }
            }
            "email" => {
                contact.email = opt_string(value);
                requested.insert(key.clone(), json!(contact.email));
            }
            "phone" => {
                contact.phone = opt_string(value);
                requested.insert(key.clone(), json!(contact.phone));
            }
            "organization" => {
                contact.organization = opt_string(value);
                requested.insert(key.clone(), json!(contact.organization));
            }
            "address" => {
                contact.address = opt_string(value);
                requested.insert(key.clone(), json!(contact.address));
            }
            "city" => {
                contact.city = opt_string(value);
                requested.insert(key.clone(), json!(contact.city));
            }
            "notes" => {
                contact.notes = opt_string(value);
                requested.insert(key.clone(), json!(contact.notes));
            }
            "lead_value" => {
                contact.lead_value = value.as_f64();
                requested.insert(key.clone(), json!(contact.lead_value));
            }
            _ => {}
        }
    }
    if requested.is_empty() {
        return Err("updates contained no recognized contact fields".to_string());
    }
    Ok(requested)
}

fn opt_string(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub(super) async fn create_contact(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    create_row(db, ctx, args, false).await
}

pub(super) async fn create_lead(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    create_row(db, ctx, args, true).await
}

async fn create_row(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
    as_lead: bool,
) -> Result<ToolOutcome, KontorError> {
    let first = arg_str(args, "first_name").unwrap_or_default();
    let last = arg_str(args, "last_name").unwrap_or_default();
    let mut contact = Contact::new(&ctx.company_id, &ctx.user_id, first, last);
    contact.email = arg_string(args, "email");
    contact.phone = arg_string(args, "phone");
    contact.organization = arg_string(args, "organization");
    contact.address = arg_string(args, "address");
    contact.city = arg_string(args, "city");
    contact.notes = arg_string(args, "notes");
    if as_lead {
        contact.lead_stage = match arg_str(args, "stage") {
            Some(s) => match LeadStage::from_str(s) {
                Ok(stage) => stage,
                Err(_) => return Ok(ToolOutcome::fail(format!("invalid lead stage: {s}"))),
            },
            None => LeadStage::New,
        };
        contact.lead_source = arg_string(args, "source");
        contact.lead_value = arg_f64(args, "value");
    }

    q::insert_contact(db, &contact).await?;

    let Some(persisted) = q::get_contact(db, &ctx.company_id, &contact.id).await? else {
        return Ok(verification_failed(ctx, &["id".to_string()]));
    };
    let requested = view(&contact)
        .as_object()
        .cloned()
        .unwrap_or_default();
    let mismatches = mismatched_fields(&requested, &view(&persisted));
    if !mismatches.is_empty() {
        return Ok(verification_failed(ctx, &mismatches));
    }

    let name = persisted.full_name();
    let message = if as_lead {
        localized(
            ctx.language,
            format!("Created lead {name} ({} stage).", persisted.lead_stage),
            format!("Lead {name} wurde angelegt (Phase {}).", persisted.lead_stage),
        )
    } else {
        localized(
            ctx.language,
            format!("Created contact {name}."),
            format!("Kontakt {name} wurde angelegt."),
        )
    };
    Ok(ToolOutcome::ok(message)
        .with_data(view(&persisted))
        .with_entity("contact", &persisted.id)
        .with_summary(format!(
            "created {} {name}",
            if as_lead { "lead" } else { "contact" }
        )))
}

pub(super) async fn update_contact(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    let mut contact = match resolve(db, ctx, args).await? {
        Resolution::One(c) => c,
        Resolution::Many(hits) => return Ok(ambiguous(ctx, &hits)),
        Resolution::None => return Ok(not_found(ctx)),
    };
    let updates = args
        .get("updates")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let requested = match apply_updates(&mut contact, &updates) {
        Ok(r) => r,
        Err(msg) => return Ok(ToolOutcome::fail(msg)),
    };

    if !q::update_contact(db, &contact).await? {
        return Ok(not_found(ctx));
    }
    let Some(persisted) = q::get_contact(db, &ctx.company_id, &contact.id).await? else {
        return Ok(not_found(ctx));
    };
    let mismatches = mismatched_fields(&requested, &view(&persisted));
    if !mismatches.is_empty() {
        return Ok(verification_failed(ctx, &mismatches));
    }

    let name = persisted.full_name();
    Ok(ToolOutcome::ok(localized(
        ctx.language,
        format!("Updated {name}."),
        format!("{name} wurde aktualisiert."),
    ))
    .with_data(view(&persisted))
    .with_entity("contact", &persisted.id)
    .with_summary(format!("updated contact {name}")))
}

pub(super) async fn delete_contact(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    let contact = match resolve(db, ctx, args).await? {
        Resolution::One(c) => c,
        Resolution::Many(hits) => return Ok(ambiguous(ctx, &hits)),
        Resolution::None => return Ok(not_found(ctx)),
    };
    let name = contact.full_name();

    if !q::delete_contact(db, &ctx.company_id, &contact.id).await? {
        return Ok(not_found(ctx));
    }
    // Deletion verifies by absence.
    if q::get_contact(db, &ctx.company_id, &contact.id).await?.is_some() {
        return Ok(verification_failed(ctx, &["id".to_string()]));
    }

    Ok(ToolOutcome::ok(localized(
        ctx.language,
        format!("Deleted contact {name}."),
        format!("Kontakt {name} wurde gelöscht."),
    ))
    .with_entity("contact", &contact.id)
    .with_summary(format!("deleted contact {name}")))
}

pub(super) async fn update_lead_stage(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    let stage_raw = arg_str(args, "stage").unwrap_or_default();
    let Ok(stage) = LeadStage::from_str(stage_raw) else {
        return Ok(ToolOutcome::fail(format!("invalid lead stage: {stage_raw}")));
    };

    let mut contact = match resolve(db, ctx, args).await? {
        Resolution::One(c) => c,
        Resolution::Many(hits) => return Ok(ambiguous(ctx, &hits)),
        Resolution::None => return Ok(not_found(ctx)),
    };
    contact.lead_stage = stage;

    if !q::update_contact(db, &contact).await? {
        return Ok(not_found(ctx));
    }
    let Some(persisted) = q::get_contact(db, &ctx.company_id, &contact.id).await? else {
        return Ok(not_found(ctx));
    };
    if persisted.lead_stage != stage {
        return Ok(verification_failed(ctx, &["lead_stage".to_string()]));
    }

    let name = persisted.full_name();
    Ok(ToolOutcome::ok(localized(
        ctx.language,
        format!("Moved {name} to the {stage} stage."),
        format!("{name} ist jetzt in der Phase {stage}."),
    ))
    .with_data(view(&persisted))
    .with_entity("contact", &persisted.id)
    .with_summary(format!("moved lead {name} to {stage}")))
}

pub(super) async fn delete_lead(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    let mut contact = match resolve(db, ctx, args).await? {
        Resolution::One(c) => c,
        Resolution::Many(hits) => return Ok(ambiguous(ctx, &hits)),
        Resolution::None => return Ok(not_found(ctx)),
    };
    let name = contact.full_name();
    if contact.lead_stage == LeadStage::None {
        return Ok(ToolOutcome::fail(localized(
            ctx.language,
            format!("{name} is not in the lead pipeline."),
            format!("{name} ist nicht in der Lead-Pipeline."),
        )));
    }

    contact.lead_stage = LeadStage::None;
    if !q::update_contact(db, &contact).await? {
        return Ok(not_found(ctx));
    }
    let Some(persisted) = q::get_contact(db, &ctx.company_id, &contact.id).await? else {
        return Ok(not_found(ctx));
    };
    if persisted.lead_stage != LeadStage::None {
        return Ok(verification_failed(ctx, &["lead_stage".to_string()]));
    }

    Ok(ToolOutcome::ok(localized(
        ctx.language,
        format!("Removed {name} from the lead pipeline. The contact is kept."),
        format!("{name} wurde aus der Lead-Pipeline entfernt. Der Kontakt bleibt erhalten."),
    ))
    .with_entity("contact", &contact.id)
    .with_summary(format!("removed lead {name}")))
}

fn search_filter(args: &Value, lead_only: bool) -> q::ContactFilter {
    // Unparseable stage filters are dropped rather than failing a read.
    let stage = arg_str(args, "stage")
        .or_else(|| arg_str(args, "lead_stage"))
        .and_then(|s| LeadStage::from_str(s).ok());
    q::ContactFilter {
        query: arg_string(args, "query"),
        email: arg_string(args, "email"),
        city: arg_string(args, "city"),
        lead_only,
        stage,
        source: arg_string(args, "source").or_else(|| arg_string(args, "lead_source")),
    }
}

pub(super) async fn search_contacts(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    search_rows(db, ctx, args, false).await
}

pub(super) async fn search_leads(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    search_rows(db, ctx, args, true).await
}

async fn search_rows(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
    lead_only: bool,
) -> Result<ToolOutcome, KontorError> {
    let filter = search_filter(args, lead_only);
    let hits = q::search_contacts(db, &ctx.company_id, &filter, arg_limit(args)).await?;
    let noun_en = if lead_only { "leads" } else { "contacts" };
    let noun_de = if lead_only { "Leads" } else { "Kontakte" };
    let message = if hits.is_empty() {
        localized(
            ctx.language,
            format!("No {noun_en} matched."),
            format!("Keine passenden {noun_de} gefunden."),
        )
    } else {
        localized(
            ctx.language,
            format!("Found {} {noun_en}.", hits.len()),
            format!("{} {noun_de} gefunden.", hits.len()),
        )
    };
    Ok(ToolOutcome::ok(message).with_data(json!({
        "count": hits.len(),
        "contacts": hits.iter().map(view).collect::<Vec<_>>(),
    })))
}

pub(super) async fn count_contacts(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    count_rows(db, ctx, args, false).await
}

pub(super) async fn count_leads(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    count_rows(db, ctx, args, true).await
}

async fn count_rows(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
    lead_only: bool,
) -> Result<ToolOutcome, KontorError> {
    let filter = search_filter(args, lead_only);
    let count = q::count_contacts(db, &ctx.company_id, &filter).await?;
    let message = if lead_only {
        localized(
            ctx.language,
            format!("There are {count} leads."),
            format!("Es gibt {count} Leads."),
        )
    } else {
        localized(
            ctx.language,
            format!("There are {count} contacts."),
            format!("Es gibt {count} Kontakte."),
        )
    };
    Ok(ToolOutcome::ok(message).with_data(json!({ "count": count })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::ToolExecutor;
    use kontor_storage::Database;

    async fn setup() -> (Database, ToolExecutor, RequestContext) {
        let db = Database::open_in_memory().await.unwrap();
        let executor = ToolExecutor::new(db.clone());
        let ctx = RequestContext {
            conversation_id: "conv-1".to_string(),
            user_id: "user-1".to_string(),
            company_id: "co-1".to_string(),
            ..Default::default()
        };
        (db, executor, ctx)
    }

    #[tokio::test]
    async fn create_contact_persists_and_verifies() {
        let (db, executor, ctx) = setup().await;
        let outcome = executor
            .execute(
                &ctx,
                "create_contact",
                &json!({"first_name": "Amanda", "last_name": "Lopez", "email": "amanda@acme.test"}),
            )
            .await
            .unwrap();
        assert!(outcome.success, "{}", outcome.message);
        assert!(outcome.message.contains("Amanda Lopez"));
        assert_eq!(outcome.entity_type.as_deref(), Some("contact"));

        let id = outcome.data.unwrap()["id"].as_str().unwrap().to_string();
        let row = q::get_contact(&db, "co-1", &id).await.unwrap().unwrap();
        assert_eq!(row.email.as_deref(), Some("amanda@acme.test"));
        assert_eq!(row.created_by, "user-1");
    }

    #[tokio::test]
    async fn update_by_name_changes_only_requested_fields() {
        let (db, executor, ctx) = setup().await;
        let mut contact = Contact::new("co-1", "user-1", "Amanda", "Lopez");
        contact.phone = Some("+49 30 1234".to_string());
        q::insert_contact(&db, &contact).await.unwrap();

        let outcome = executor
            .execute(
                &ctx,
                "update_contact",
                &json!({"first_name": "Amanda", "last_name": "Lopez", "updates": {"city": "Berlin"}}),
            )
            .await
            .unwrap();
        assert!(outcome.success, "{}", outcome.message);

        let row = q::get_contact(&db, "co-1", &contact.id).await.unwrap().unwrap();
        assert_eq!(row.city.as_deref(), Some("Berlin"));
        assert_eq!(row.phone.as_deref(), Some("+49 30 1234"));
    }

    #[tokio::test]
    async fn two_matches_come_back_as_disambiguation_without_writing() {
        let (db, executor, ctx) = setup().await;
        let mut a = Contact::new("co-1", "user-1", "Jane", "Jones");
        a.email = Some("jane@alpha.test".to_string());
        let b = Contact::new("co-1", "user-1", "Jane", "Jones");
        q::insert_contact(&db, &a).await.unwrap();
        q::insert_contact(&db, &b).await.unwrap();

        let outcome = executor
            .execute(
                &ctx,
                "update_contact",
                &json!({"first_name": "Jane", "last_name": "Jones", "updates": {"city": "Berlin"}}),
            )
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(outcome.is_disambiguation());
        let data = outcome.data.unwrap();
        assert_eq!(data["candidates"].as_array().unwrap().len(), 2);
        // The human-readable message carries no row ids.
        assert!(!outcome.message.contains(&a.id));

        // Nothing was written.
        let row = q::get_contact(&db, "co-1", &a.id).await.unwrap().unwrap();
        assert!(row.city.is_none());
    }

    #[tokio::test]
    async fn delete_contact_verifies_absence() {
        let (db, executor, ctx) = setup().await;
        let contact = Contact::new("co-1", "user-1", "Max", "Muster");
        q::insert_contact(&db, &contact).await.unwrap();

        let outcome = executor
            .execute(&ctx, "delete_contact", &json!({"first_name": "Max", "last_name": "Muster"}))
            .await
            .unwrap();
        assert!(outcome.success);
        assert!(q::get_contact(&db, "co-1", &contact.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lead_stage_moves_and_messages_are_localized() {
        let (db, executor, mut ctx) = setup().await;
        ctx.language = kontor_core::Language::De;
        let mut lead = Contact::new("co-1", "user-1", "Erika", "Muster");
        lead.lead_stage = LeadStage::New;
        q::insert_contact(&db, &lead).await.unwrap();

        let outcome = executor
            .execute(
                &ctx,
                "update_lead_stage",
                &json!({"first_name": "Erika", "last_name": "Muster", "stage": "QUALIFIED"}),
            )
            .await
            .unwrap();
        assert!(outcome.success);
        assert!(outcome.message.contains("Phase QUALIFIED"), "{}", outcome.message);

        let row = q::get_contact(&db, "co-1", &lead.id).await.unwrap().unwrap();
        assert_eq!(row.lead_stage, LeadStage::Qualified);
    }

    #[tokio::test]
    async fn delete_lead_resets_stage_but_keeps_contact() {
        let (db, executor, ctx) = setup().await;
        let mut lead = Contact::new("co-1", "user-1", "Erika", "Muster");
        lead.lead_stage = LeadStage::Proposal;
        q::insert_contact(&db, &lead).await.unwrap();

        let outcome = executor
            .execute(&ctx, "delete_lead", &json!({"first_name": "Erika", "last_name": "Muster"}))
            .await
            .unwrap();
        assert!(outcome.success);

        let row = q::get_contact(&db, "co-1", &lead.id).await.unwrap().unwrap();
        assert_eq!(row.lead_stage, LeadStage::None);
    }

    #[tokio::test]
    async fn delete_lead_on_plain_contact_fails_cleanly() {
        let (db, executor, ctx) = setup().await;
        let contact = Contact::new("co-1", "user-1", "Max", "Muster");
        q::insert_contact(&db, &contact).await.unwrap();

        let outcome = executor
            .execute(&ctx, "delete_lead", &json!({"first_name": "Max", "last_name": "Muster"}))
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(outcome.message.contains("not in the lead pipeline"));
    }

    #[tokio::test]
    async fn search_and_count_scope_to_leads() {
        let (db, executor, ctx) = setup().await;
        let mut lead = Contact::new("co-1", "user-1", "Lena", "Vogel");
        lead.lead_stage = LeadStage::New;
        q::insert_contact(&db, &lead).await.unwrap();
        q::insert_contact(&db, &Contact::new("co-1", "user-1", "Max", "Muster"))
            .await
            .unwrap();

        let searched = executor
            .execute(&ctx, "search_leads", &json!({}))
            .await
            .unwrap();
        assert!(searched.success);
        assert_eq!(searched.data.unwrap()["count"], json!(1));

        let counted = executor
            .execute(&ctx, "count_contacts", &json!({}))
            .await
            .unwrap();
        assert_eq!(counted.data.unwrap()["count"], json!(2));
    }

    #[tokio::test]
    async fn unknown_contact_reports_not_found() {
        let (_db, executor, ctx) = setup().await;
        let outcome = executor
            .execute(&ctx, "delete_contact", &json!({"first_name": "Nobody", "last_name": "Here"}))
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(!outcome.is_disambiguation());
    }
}
