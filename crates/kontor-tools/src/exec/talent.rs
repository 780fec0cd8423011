// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Talent roster tools (talent-agency vertical).

use std::str::FromStr;

use kontor_core::{KontorError, RequestContext};
use kontor_storage::queries::talent as q;
use kontor_storage::{Talent, TalentStatus};
use serde_json::{Map, Value, json};

use super::{Resolution, arg_f64, arg_limit, arg_str, arg_string};
use crate::exec::verify::mismatched_fields;
use crate::outcome::{ToolOutcome, localized};

fn view(t: &Talent) -> Value {
    json!({
        "id": t.id,
        "name": t.name,
        "email": t.email,
        "phone": t.phone,
        "category": t.category,
        "daily_rate": t.daily_rate,
        "city": t.city,
        "status": t.status,
        "notes": t.notes,
    })
}

/// Name lookup shared with the booking tools.
pub(super) async fn find_by_name(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    name: &str,
) -> Result<Resolution<Talent>, KontorError> {
    let filter = q::TalentFilter {
        query: Some(name.to_string()),
        ..Default::default()
    };
    let mut hits = q::search_talent(db, &ctx.company_id, &filter, 10).await?;
    Ok(match hits.len() {
        0 => Resolution::None,
        1 => Resolution::One(hits.remove(0)),
        _ => Resolution::Many(hits),
    })
}

async fn resolve(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<Resolution<Talent>, KontorError> {
    if let Some(id) = arg_str(args, "id") {
        return Ok(match q::get_talent(db, &ctx.company_id, id).await? {
            Some(t) => Resolution::One(t),
            None => Resolution::None,
        });
    }
    match arg_str(args, "name") {
        Some(name) => find_by_name(db, ctx, name).await,
        None => Ok(Resolution::None),
    }
}

pub(super) fn not_found(ctx: &RequestContext) -> ToolOutcome {
    ToolOutcome::fail(localized(
        ctx.language,
        "I couldn't find a matching talent.",
        "Ich konnte kein passendes Talent finden.",
    ))
}

pub(super) fn ambiguous(ctx: &RequestContext, hits: &[Talent]) -> ToolOutcome {
    ToolOutcome::disambiguation(
        localized(
            ctx.language,
            format!(
                "I found {} matching talents. Which one do you mean?",
                hits.len()
            ),
            format!(
                "Ich habe {} passende Talente gefunden. Welches meinst du?",
                hits.len()
            ),
        ),
        hits.iter()
            .map(|t| json!({"id": t.id, "label": t.name, "category": t.category, "city": t.city}))
            .collect(),
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

fn apply_updates(
    talent: &mut Talent,
    updates: &Map<String, Value>,
) -> Result<Map<String, Value>, String> {
    let mut requested = Map::new();
    for (key, value) in updates {
        match key.as_str() {
            "name" => {
                if let Some(s) = value.as_str() {
                    talent.name = s.trim().to_string();
                    requested.insert(key.clone(), json!(talent.name));
                }
            }
            "email" => {
                talent.email = opt_string(value);
                requested.insert(key.clone(), json!(talent.email));
            }
            "phone" => {
                talent.phone = opt_string(value);
                requested.insert(key.clone(), json!(talent.phone));
            }
            "category" => {
                talent.category = opt_string(value);
                requested.insert(key.clone(), json!(talent.category));
            }
            "city" => {
                talent.city = opt_string(value);
                requested.insert(key.clone(), json!(talent.city));
            }
            "daily_rate" => {
                talent.daily_rate = value.as_f64();
                requested.insert(key.clone(), json!(talent.daily_rate));
            }
            "status" => {
                let raw = value.as_str().unwrap_or_default();
                let status = TalentStatus::from_str(raw)
                    .map_err(|_| format!("invalid talent status: {raw}"))?;
                talent.status = status;
                requested.insert(key.clone(), json!(status));
            }
            "notes" => {
                talent.notes = opt_string(value);
                requested.insert(key.clone(), json!(talent.notes));
            }
            _ => {}
        }
    }
    if requested.is_empty() {
        return Err("updates contained no recognized talent fields".to_string());
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

pub(super) async fn create_talent(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    let name = arg_str(args, "name").unwrap_or_default();
    let mut talent = Talent::new(&ctx.company_id, &ctx.user_id, name);
    talent.email = arg_string(args, "email");
    talent.phone = arg_string(args, "phone");
    talent.category = arg_string(args, "category");
    talent.city = arg_string(args, "city");
    talent.daily_rate = arg_f64(args, "daily_rate");
    talent.notes = arg_string(args, "notes");

    q::insert_talent(db, &talent).await?;

    let Some(persisted) = q::get_talent(db, &ctx.company_id, &talent.id).await? else {
        return Ok(verification_failed(ctx, &["id".to_string()]));
    };
    let requested = view(&talent).as_object().cloned().unwrap_or_default();
    let mismatches = mismatched_fields(&requested, &view(&persisted));
    if !mismatches.is_empty() {
        return Ok(verification_failed(ctx, &mismatches));
    }

    Ok(ToolOutcome::ok(localized(
        ctx.language,
        format!("Added {} to the talent roster.", persisted.name),
        format!("{} wurde in die Talentkartei aufgenommen.", persisted.name),
    ))
    .with_data(view(&persisted))
    .with_entity("talent", &persisted.id)
    .with_summary(format!("created talent {}", persisted.name)))
}

pub(super) async fn update_talent(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    let mut talent = match resolve(db, ctx, args).await? {
        Resolution::One(t) => t,
        Resolution::Many(hits) => return Ok(ambiguous(ctx, &hits)),
        Resolution::None => return Ok(not_found(ctx)),
    };
    let updates = args
        .get("updates")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let requested = match apply_updates(&mut talent, &updates) {
        Ok(r) => r,
        Err(msg) => return Ok(ToolOutcome::fail(msg)),
    };

    if !q::update_talent(db, &talent).await? {
        return Ok(not_found(ctx));
    }
    let Some(persisted) = q::get_talent(db, &ctx.company_id, &talent.id).await? else {
        return Ok(not_found(ctx));
    };
    let mismatches = mismatched_fields(&requested, &view(&persisted));
    if !mismatches.is_empty() {
        return Ok(verification_failed(ctx, &mismatches));
    }

    Ok(ToolOutcome::ok(localized(
        ctx.language,
        format!("Updated {}.", persisted.name),
        format!("{} wurde aktualisiert.", persisted.name),
    ))
    .with_data(view(&persisted))
    .with_entity("talent", &persisted.id)
    .with_summary(format!("updated talent {}", persisted.name)))
}

pub(super) async fn search_talent(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    let filter = q::TalentFilter {
        query: arg_string(args, "query"),
        category: arg_string(args, "category"),
        city: arg_string(args, "city"),
        status: arg_str(args, "status").and_then(|s| TalentStatus::from_str(s).ok()),
    };
    let hits = q::search_talent(db, &ctx.company_id, &filter, arg_limit(args)).await?;
    let message = if hits.is_empty() {
        localized(ctx.language, "No talents matched.", "Keine passenden Talente gefunden.")
    } else {
        localized(
            ctx.language,
            format!("Found {} talents.", hits.len()),
            format!("{} Talente gefunden.", hits.len()),
        )
    };
    Ok(ToolOutcome::ok(message).with_data(json!({
        "count": hits.len(),
        "talent": hits.iter().map(view).collect::<Vec<_>>(),
    })))
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
            industry: kontor_core::Industry::TalentAgency,
            ..Default::default()
        };
        (db, executor, ctx)
    }

    #[tokio::test]
    async fn create_and_update_by_name() {
        let (db, executor, ctx) = setup().await;
        let created = executor
            .execute(
                &ctx,
                "create_talent",
                &json!({"name": "Mia Ray", "category": "model", "daily_rate": 1800.0}),
            )
            .await
            .unwrap();
        assert!(created.success, "{}", created.message);
        let id = created.data.unwrap()["id"].as_str().unwrap().to_string();

        let updated = executor
            .execute(
                &ctx,
                "update_talent",
                &json!({"name": "Mia Ray", "updates": {"status": "ENGAGED", "city": "Berlin"}}),
            )
            .await
            .unwrap();
        assert!(updated.success, "{}", updated.message);

        let row = q::get_talent(&db, "co-1", &id).await.unwrap().unwrap();
        assert_eq!(row.status, TalentStatus::Engaged);
        assert_eq!(row.city.as_deref(), Some("Berlin"));
    }

    #[tokio::test]
    async fn search_filters_by_category() {
        let (db, executor, ctx) = setup().await;
        let mut model = Talent::new("co-1", "user-1", "Mia Ray");
        model.category = Some("model".to_string());
        q::insert_talent(&db, &model).await.unwrap();
        let mut photographer = Talent::new("co-1", "user-1", "Jo Kim");
        photographer.category = Some("photographer".to_string());
        q::insert_talent(&db, &photographer).await.unwrap();

        let outcome = executor
            .execute(&ctx, "search_talent", &json!({"category": "model"}))
            .await
            .unwrap();
        let data = outcome.data.unwrap();
        assert_eq!(data["count"], json!(1));
        assert_eq!(data["talent"][0]["name"], json!("Mia Ray"));
    }
}
