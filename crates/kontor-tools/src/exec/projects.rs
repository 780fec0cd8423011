// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Project tools.

use std::str::FromStr;

use kontor_core::{KontorError, RequestContext};
use kontor_storage::queries::projects as q;
use kontor_storage::{Project, ProjectStatus};
use serde_json::{Map, Value, json};

use super::{Resolution, arg_f64, arg_limit, arg_str, arg_string, contacts};
use crate::exec::verify::mismatched_fields;
use crate::outcome::{ToolOutcome, localized};

fn view(p: &Project) -> Value {
    json!({
        "id": p.id,
        "name": p.name,
        "description": p.description,
        "status": p.status,
        "contact_id": p.contact_id,
        "start_date": p.start_date,
        "end_date": p.end_date,
        "budget": p.budget,
    })
}

/// Name-only lookup used when tasks, bookings and expenses link a
/// project by name.
pub(super) async fn find_by_name(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    name: &str,
) -> Result<Resolution<Project>, KontorError> {
    let filter = q::ProjectFilter {
        query: Some(name.to_string()),
        ..Default::default()
    };
    let mut hits = q::search_projects(db, &ctx.company_id, &filter, 10).await?;
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
) -> Result<Resolution<Project>, KontorError> {
    if let Some(id) = arg_str(args, "id") {
        return Ok(match q::get_project(db, &ctx.company_id, id).await? {
            Some(p) => Resolution::One(p),
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
        "I couldn't find a matching project.",
        "Ich konnte kein passendes Projekt finden.",
    ))
}

pub(super) fn ambiguous(ctx: &RequestContext, hits: &[Project]) -> ToolOutcome {
    ToolOutcome::disambiguation(
        localized(
            ctx.language,
            format!(
                "I found {} matching projects. Which one do you mean?",
                hits.len()
            ),
            format!(
                "Ich habe {} passende Projekte gefunden. Welches meinst du?",
                hits.len()
            ),
        ),
        hits.iter()
            .map(|p| json!({"id": p.id, "label": p.name, "status": p.status}))
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
    project: &mut Project,
    updates: &Map<String, Value>,
) -> Result<Map<String, Value>, String> {
    let mut requested = Map::new();
    for (key, value) in updates {
        match key.as_str() {
            "name" => {
                if let Some(s) = value.as_str() {
                    project.name = s.trim().to_string();
                    requested.insert(key.clone(), json!(project.name));
                }
            }
            "description" => {
                project.description = opt_string(value);
                requested.insert(key.clone(), json!(project.description));
            }
            "status" => {
                let raw = value.as_str().unwrap_or_default();
                let status = ProjectStatus::from_str(raw)
                    .map_err(|_| format!("invalid project status: {raw}"))?;
                project.status = status;
                requested.insert(key.clone(), json!(status));
            }
            "start_date" => {
                project.start_date = opt_string(value);
                requested.insert(key.clone(), json!(project.start_date));
            }
            "end_date" => {
                project.end_date = opt_string(value);
                requested.insert(key.clone(), json!(project.end_date));
            }
            "budget" => {
                project.budget = value.as_f64();
                requested.insert(key.clone(), json!(project.budget));
            }
            _ => {}
        }
    }
    if requested.is_empty() {
        return Err("updates contained no recognized project fields".to_string());
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

pub(super) async fn create_project(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    let name = arg_str(args, "name").unwrap_or_default();
    let mut project = Project::new(&ctx.company_id, &ctx.user_id, name);
    project.description = arg_string(args, "description");
    project.start_date = arg_string(args, "start_date");
    project.end_date = arg_string(args, "end_date");
    project.budget = arg_f64(args, "budget");
    if let Some(raw) = arg_str(args, "status") {
        project.status = match ProjectStatus::from_str(raw) {
            Ok(s) => s,
            Err(_) => return Ok(ToolOutcome::fail(format!("invalid project status: {raw}"))),
        };
    }
    if let Some(contact_name) = arg_str(args, "contact_name") {
        match contacts::find_by_name(db, ctx, contact_name).await? {
            Resolution::One(c) => project.contact_id = Some(c.id),
            Resolution::Many(hits) => return Ok(contacts::ambiguous(ctx, &hits)),
            Resolution::None => return Ok(contacts::not_found(ctx)),
        }
    }

    q::insert_project(db, &project).await?;

    let Some(persisted) = q::get_project(db, &ctx.company_id, &project.id).await? else {
        return Ok(verification_failed(ctx, &["id".to_string()]));
    };
    let requested = view(&project).as_object().cloned().unwrap_or_default();
    let mismatches = mismatched_fields(&requested, &view(&persisted));
    if !mismatches.is_empty() {
        return Ok(verification_failed(ctx, &mismatches));
    }

    Ok(ToolOutcome::ok(localized(
        ctx.language,
        format!("Created project \"{}\".", persisted.name),
        format!("Projekt \"{}\" wurde angelegt.", persisted.name),
    ))
    .with_data(view(&persisted))
    .with_entity("project", &persisted.id)
    .with_summary(format!("created project \"{}\"", persisted.name)))
}

pub(super) async fn update_project(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    let mut project = match resolve(db, ctx, args).await? {
        Resolution::One(p) => p,
        Resolution::Many(hits) => return Ok(ambiguous(ctx, &hits)),
        Resolution::None => return Ok(not_found(ctx)),
    };
    let updates = args
        .get("updates")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let requested = match apply_updates(&mut project, &updates) {
        Ok(r) => r,
        Err(msg) => return Ok(ToolOutcome::fail(msg)),
    };

    if !q::update_project(db, &project).await? {
        return Ok(not_found(ctx));
    }
    let Some(persisted) = q::get_project(db, &ctx.company_id, &project.id).await? else {
        return Ok(not_found(ctx));
    };
    let mismatches = mismatched_fields(&requested, &view(&persisted));
    if !mismatches.is_empty() {
        return Ok(verification_failed(ctx, &mismatches));
    }

    Ok(ToolOutcome::ok(localized(
        ctx.language,
        format!("Updated project \"{}\".", persisted.name),
        format!("Projekt \"{}\" wurde aktualisiert.", persisted.name),
    ))
    .with_data(view(&persisted))
    .with_entity("project", &persisted.id)
    .with_summary(format!("updated project \"{}\"", persisted.name)))
}

pub(super) async fn delete_project(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    let project = match resolve(db, ctx, args).await? {
        Resolution::One(p) => p,
        Resolution::Many(hits) => return Ok(ambiguous(ctx, &hits)),
        Resolution::None => return Ok(not_found(ctx)),
    };

    if !q::delete_project(db, &ctx.company_id, &project.id).await? {
        return Ok(not_found(ctx));
    }
    if q::get_project(db, &ctx.company_id, &project.id).await?.is_some() {
        return Ok(verification_failed(ctx, &["id".to_string()]));
    }

    Ok(ToolOutcome::ok(localized(
        ctx.language,
        format!("Deleted project \"{}\".", project.name),
        format!("Projekt \"{}\" wurde gelöscht.", project.name),
    ))
    .with_entity("project", &project.id)
    .with_summary(format!("deleted project \"{}\"", project.name)))
}

pub(super) async fn search_projects(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    let filter = q::ProjectFilter {
        query: arg_string(args, "query"),
        status: arg_str(args, "status").and_then(|s| ProjectStatus::from_str(s).ok()),
        ..Default::default()
    };
    let hits = q::search_projects(db, &ctx.company_id, &filter, arg_limit(args)).await?;
    let message = if hits.is_empty() {
        localized(ctx.language, "No projects matched.", "Keine passenden Projekte gefunden.")
    } else {
        localized(
            ctx.language,
            format!("Found {} projects.", hits.len()),
            format!("{} Projekte gefunden.", hits.len()),
        )
    };
    Ok(ToolOutcome::ok(message).with_data(json!({
        "count": hits.len(),
        "projects": hits.iter().map(view).collect::<Vec<_>>(),
    })))
}
