// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Task tools, including the two bulk operations. Bulk calls iterate
//! per id, never abort on a failure, and report aggregate counts.

use std::str::FromStr;

use kontor_core::{KontorError, RequestContext};
use kontor_storage::queries::tasks as q;
use kontor_storage::{Task, TaskPriority, TaskStatus};
use serde_json::{Map, Value, json};

use super::{Resolution, arg_limit, arg_str, arg_string, contacts, projects};
use crate::exec::verify::mismatched_fields;
use crate::outcome::{ToolOutcome, localized};

fn view(t: &Task) -> Value {
    json!({
        "id": t.id,
        "title": t.title,
        "description": t.description,
        "status": t.status,
        "priority": t.priority,
        "due_date": t.due_date,
        "contact_id": t.contact_id,
        "project_id": t.project_id,
    })
}

async fn resolve(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<Resolution<Task>, KontorError> {
    if let Some(id) = arg_str(args, "id") {
        return Ok(match q::get_task(db, &ctx.company_id, id).await? {
            Some(t) => Resolution::One(t),
            None => Resolution::None,
        });
    }
    let Some(title) = arg_string(args, "title") else {
        return Ok(Resolution::None);
    };
    let filter = q::TaskFilter {
        query: Some(title),
        ..Default::default()
    };
    let mut hits = q::search_tasks(db, &ctx.company_id, &filter, 10).await?;
    Ok(match hits.len() {
        0 => Resolution::None,
        1 => Resolution::One(hits.remove(0)),
        _ => Resolution::Many(hits),
    })
}

fn not_found(ctx: &RequestContext) -> ToolOutcome {
    ToolOutcome::fail(localized(
        ctx.language,
        "I couldn't find a matching task.",
        "Ich konnte keine passende Aufgabe finden.",
    ))
}

fn ambiguous(ctx: &RequestContext, hits: &[Task]) -> ToolOutcome {
    ToolOutcome::disambiguation(
        localized(
            ctx.language,
            format!("I found {} matching tasks. Which one do you mean?", hits.len()),
            format!(
                "Ich habe {} passende Aufgaben gefunden. Welche meinst du?",
                hits.len()
            ),
        ),
        hits.iter()
            .map(|t| {
                json!({
                    "id": t.id,
                    "label": t.title,
                    "status": t.status,
                    "due_date": t.due_date,
                })
            })
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

/// Applies `updates` to the task, returning the view-aligned map used
/// for verification, or a model-facing error for a bad enum value.
fn apply_updates(
    task: &mut Task,
    updates: &Map<String, Value>,
) -> Result<Map<String, Value>, String> {
    let mut requested = Map::new();
    for (key, value) in updates {
        match key.as_str() {
            "title" => {
                if let Some(s) = value.as_str() {
                    task.title = s.trim().to_string();
                    requested.insert(key.clone(), json!(task.title));
                }
            }
            "description" => {
                task.description = value
                    .as_str()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
                requested.insert(key.clone(), json!(task.description));
            }
            "status" => {
                let raw = value.as_str().unwrap_or_default();
                let status = TaskStatus::from_str(raw)
                    .map_err(|_| format!("invalid task status: {raw}"))?;
                task.status = status;
                requested.insert(key.clone(), json!(status));
            }
            "priority" => {
                let raw = value.as_str().unwrap_or_default();
                let priority = TaskPriority::from_str(raw)
                    .map_err(|_| format!("invalid task priority: {raw}"))?;
                task.priority = priority;
                requested.insert(key.clone(), json!(priority));
            }
            "due_date" => {
                task.due_date = value
                    .as_str()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
                requested.insert(key.clone(), json!(task.due_date));
            }
            _ => {}
        }
    }
    if requested.is_empty() {
        return Err("updates contained no recognized task fields".to_string());
    }
    Ok(requested)
}

pub(super) async fn create_task(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    let title = arg_str(args, "title").unwrap_or_default();
    let mut task = Task::new(&ctx.company_id, &ctx.user_id, title);
    task.description = arg_string(args, "description");
    task.due_date = arg_string(args, "due_date");
    if let Some(raw) = arg_str(args, "priority") {
        task.priority = match TaskPriority::from_str(raw) {
            Ok(p) => p,
            Err(_) => return Ok(ToolOutcome::fail(format!("invalid task priority: {raw}"))),
        };
    }

    if let Some(name) = arg_str(args, "contact_name") {
        match contacts::find_by_name(db, ctx, name).await? {
            Resolution::One(c) => task.contact_id = Some(c.id),
            Resolution::Many(hits) => return Ok(contacts::ambiguous(ctx, &hits)),
            Resolution::None => return Ok(contacts::not_found(ctx)),
        }
    }
    if let Some(name) = arg_str(args, "project_name") {
        match projects::find_by_name(db, ctx, name).await? {
            Resolution::One(p) => task.project_id = Some(p.id),
            Resolution::Many(hits) => return Ok(projects::ambiguous(ctx, &hits)),
            Resolution::None => return Ok(projects::not_found(ctx)),
        }
    }

    q::insert_task(db, &task).await?;

    let Some(persisted) = q::get_task(db, &ctx.company_id, &task.id).await? else {
        return Ok(verification_failed(ctx, &["id".to_string()]));
    };
    let requested = view(&task).as_object().cloned().unwrap_or_default();
    let mismatches = mismatched_fields(&requested, &view(&persisted));
    if !mismatches.is_empty() {
        return Ok(verification_failed(ctx, &mismatches));
    }

    Ok(ToolOutcome::ok(localized(
        ctx.language,
        format!("Created task \"{}\".", persisted.title),
        format!("Aufgabe \"{}\" wurde angelegt.", persisted.title),
    ))
    .with_data(view(&persisted))
    .with_entity("task", &persisted.id)
    .with_summary(format!("created task \"{}\"", persisted.title)))
}

pub(super) async fn update_task(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    let mut task = match resolve(db, ctx, args).await? {
        Resolution::One(t) => t,
        Resolution::Many(hits) => return Ok(ambiguous(ctx, &hits)),
        Resolution::None => return Ok(not_found(ctx)),
    };
    let updates = args
        .get("updates")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let requested = match apply_updates(&mut task, &updates) {
        Ok(r) => r,
        Err(msg) => return Ok(ToolOutcome::fail(msg)),
    };

    if !q::update_task(db, &task).await? {
        return Ok(not_found(ctx));
    }
    let Some(persisted) = q::get_task(db, &ctx.company_id, &task.id).await? else {
        return Ok(not_found(ctx));
    };
    let mismatches = mismatched_fields(&requested, &view(&persisted));
    if !mismatches.is_empty() {
        return Ok(verification_failed(ctx, &mismatches));
    }

    Ok(ToolOutcome::ok(localized(
        ctx.language,
        format!("Updated task \"{}\".", persisted.title),
        format!("Aufgabe \"{}\" wurde aktualisiert.", persisted.title),
    ))
    .with_data(view(&persisted))
    .with_entity("task", &persisted.id)
    .with_summary(format!("updated task \"{}\"", persisted.title)))
}

pub(super) async fn complete_task(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    let mut task = match resolve(db, ctx, args).await? {
        Resolution::One(t) => t,
        Resolution::Many(hits) => return Ok(ambiguous(ctx, &hits)),
        Resolution::None => return Ok(not_found(ctx)),
    };
    task.status = TaskStatus::Completed;

    if !q::update_task(db, &task).await? {
        return Ok(not_found(ctx));
    }
    let Some(persisted) = q::get_task(db, &ctx.company_id, &task.id).await? else {
        return Ok(not_found(ctx));
    };
    if persisted.status != TaskStatus::Completed {
        return Ok(verification_failed(ctx, &["status".to_string()]));
    }

    Ok(ToolOutcome::ok(localized(
        ctx.language,
        format!("Marked \"{}\" as completed.", persisted.title),
        format!("\"{}\" wurde als erledigt markiert.", persisted.title),
    ))
    .with_data(view(&persisted))
    .with_entity("task", &persisted.id)
    .with_summary(format!("completed task \"{}\"", persisted.title)))
}

pub(super) async fn delete_task(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    let task = match resolve(db, ctx, args).await? {
        Resolution::One(t) => t,
        Resolution::Many(hits) => return Ok(ambiguous(ctx, &hits)),
        Resolution::None => return Ok(not_found(ctx)),
    };

    if !q::delete_task(db, &ctx.company_id, &task.id).await? {
        return Ok(not_found(ctx));
    }
    if q::get_task(db, &ctx.company_id, &task.id).await?.is_some() {
        return Ok(verification_failed(ctx, &["id".to_string()]));
    }

    Ok(ToolOutcome::ok(localized(
        ctx.language,
        format!("Deleted task \"{}\".", task.title),
        format!("Aufgabe \"{}\" wurde gelöscht.", task.title),
    ))
    .with_entity("task", &task.id)
    .with_summary(format!("deleted task \"{}\"", task.title)))
}

fn arg_ids(args: &Value) -> Vec<String> {
    args.get("ids")
        .and_then(Value::as_array)
        .map(|a| {
            a.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub(super) async fn bulk_delete_tasks(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    let ids = arg_ids(args);
    let total = ids.len();
    let mut deleted = 0usize;
    let mut failures: Vec<Value> = Vec::new();

    for id in &ids {
        if q::delete_task(db, &ctx.company_id, id).await? {
            deleted += 1;
        } else {
            failures.push(json!({"id": id, "reason": "not_found"}));
        }
    }

    let failed = failures.len();
    let message = if failed == 0 {
        localized(
            ctx.language,
            format!("Deleted {deleted} tasks."),
            format!("{deleted} Aufgaben gelöscht."),
        )
    } else {
        localized(
            ctx.language,
            format!("Deleted {deleted} of {total} tasks; {failed} could not be found."),
            format!("{deleted} von {total} Aufgaben gelöscht; {failed} wurden nicht gefunden."),
        )
    };

    let mut outcome = if deleted > 0 {
        ToolOutcome::ok(message)
    } else {
        ToolOutcome::fail(message)
    };
    outcome = outcome
        .with_data(json!({"deleted": deleted, "failed": failed, "failures": failures}))
        .with_summary(format!("bulk deleted {deleted}/{total} tasks"));
    outcome.entity_type = Some("task".to_string());
    Ok(outcome)
}

pub(super) async fn bulk_update_tasks(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    let ids = arg_ids(args);
    let total = ids.len();
    let updates = args
        .get("updates")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let mut updated = 0usize;
    let mut failures: Vec<Value> = Vec::new();

    for id in &ids {
        let Some(mut task) = q::get_task(db, &ctx.company_id, id).await? else {
            failures.push(json!({"id": id, "reason": "not_found"}));
            continue;
        };
        let requested = match apply_updates(&mut task, &updates) {
            Ok(r) => r,
            Err(msg) => return Ok(ToolOutcome::fail(msg)),
        };
        if !q::update_task(db, &task).await? {
            failures.push(json!({"id": id, "reason": "not_found"}));
            continue;
        }
        match q::get_task(db, &ctx.company_id, id).await? {
            Some(persisted) if mismatched_fields(&requested, &view(&persisted)).is_empty() => {
                updated += 1;
            }
            _ => failures.push(json!({"id": id, "reason": "verification_failed"})),
        }
    }

    let failed = failures.len();
    let message = if failed == 0 {
        localized(
            ctx.language,
            format!("Updated {updated} tasks."),
            format!("{updated} Aufgaben aktualisiert."),
        )
    } else {
        localized(
            ctx.language,
            format!("Updated {updated} of {total} tasks; {failed} failed."),
            format!("{updated} von {total} Aufgaben aktualisiert; {failed} fehlgeschlagen."),
        )
    };

    let mut outcome = if updated > 0 {
        ToolOutcome::ok(message)
    } else {
        ToolOutcome::fail(message)
    };
    outcome = outcome
        .with_data(json!({"updated": updated, "failed": failed, "failures": failures}))
        .with_summary(format!("bulk updated {updated}/{total} tasks"));
    outcome.entity_type = Some("task".to_string());
    Ok(outcome)
}

pub(super) async fn search_tasks(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    let filter = q::TaskFilter {
        query: arg_string(args, "query"),
        status: arg_str(args, "status").and_then(|s| TaskStatus::from_str(s).ok()),
        priority: arg_str(args, "priority").and_then(|s| TaskPriority::from_str(s).ok()),
        due_before: arg_string(args, "due_before"),
        ..Default::default()
    };
    let hits = q::search_tasks(db, &ctx.company_id, &filter, arg_limit(args)).await?;
    let message = if hits.is_empty() {
        localized(ctx.language, "No tasks matched.", "Keine passenden Aufgaben gefunden.")
    } else {
        localized(
            ctx.language,
            format!("Found {} tasks.", hits.len()),
            format!("{} Aufgaben gefunden.", hits.len()),
        )
    };
    Ok(ToolOutcome::ok(message).with_data(json!({
        "count": hits.len(),
        "tasks": hits.iter().map(view).collect::<Vec<_>>(),
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
            ..Default::default()
        };
        (db, executor, ctx)
    }

    #[tokio::test]
    async fn create_and_complete_by_title() {
        let (db, executor, ctx) = setup().await;
        let created = executor
            .execute(
                &ctx,
                "create_task",
                &json!({"title": "Call Amanda", "priority": "HIGH", "due_date": "2026-09-01"}),
            )
            .await
            .unwrap();
        assert!(created.success, "{}", created.message);

        let completed = executor
            .execute(&ctx, "complete_task", &json!({"title": "Call Amanda"}))
            .await
            .unwrap();
        assert!(completed.success);

        let id = completed.data.unwrap()["id"].as_str().unwrap().to_string();
        let row = q::get_task(&db, "co-1", &id).await.unwrap().unwrap();
        assert_eq!(row.status, TaskStatus::Completed);
        assert_eq!(row.priority, TaskPriority::High);
    }

    #[tokio::test]
    async fn bulk_delete_reports_partial_failure() {
        let (db, executor, ctx) = setup().await;
        let a = Task::new("co-1", "user-1", "one");
        let b = Task::new("co-1", "user-1", "two");
        q::insert_task(&db, &a).await.unwrap();
        q::insert_task(&db, &b).await.unwrap();

        let outcome = executor
            .execute(
                &ctx,
                "bulk_delete_tasks",
                &json!({"ids": [a.id, b.id, "missing-task"]}),
            )
            .await
            .unwrap();
        assert!(outcome.success);
        let data = outcome.data.unwrap();
        assert_eq!(data["deleted"], json!(2));
        assert_eq!(data["failed"], json!(1));
        assert_eq!(data["failures"][0]["reason"], json!("not_found"));
    }

    #[tokio::test]
    async fn bulk_update_applies_same_change_to_all() {
        let (db, executor, ctx) = setup().await;
        let a = Task::new("co-1", "user-1", "one");
        let b = Task::new("co-1", "user-1", "two");
        q::insert_task(&db, &a).await.unwrap();
        q::insert_task(&db, &b).await.unwrap();

        let outcome = executor
            .execute(
                &ctx,
                "bulk_update_tasks",
                &json!({"ids": [a.id, b.id], "updates": {"status": "IN_PROGRESS"}}),
            )
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.data.unwrap()["updated"], json!(2));

        let row = q::get_task(&db, "co-1", &b.id).await.unwrap().unwrap();
        assert_eq!(row.status, TaskStatus::InProgress);
    }

    #[tokio::test]
    async fn invalid_status_in_bulk_update_fails_before_writing() {
        let (db, executor, ctx) = setup().await;
        let a = Task::new("co-1", "user-1", "one");
        q::insert_task(&db, &a).await.unwrap();

        let outcome = executor
            .execute(
                &ctx,
                "bulk_update_tasks",
                &json!({"ids": [a.id], "updates": {"status": "DONE-ISH"}}),
            )
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(outcome.message.contains("invalid task status"));

        let row = q::get_task(&db, "co-1", &a.id).await.unwrap().unwrap();
        assert_eq!(row.status, TaskStatus::Open);
    }

    #[tokio::test]
    async fn create_task_links_contact_by_name() {
        let (db, executor, ctx) = setup().await;
        let contact = kontor_storage::Contact::new("co-1", "user-1", "Amanda", "Lopez");
        kontor_storage::queries::contacts::insert_contact(&db, &contact)
            .await
            .unwrap();

        let outcome = executor
            .execute(
                &ctx,
                "create_task",
                &json!({"title": "Send offer", "contact_name": "Amanda Lopez"}),
            )
            .await
            .unwrap();
        assert!(outcome.success, "{}", outcome.message);
        assert_eq!(outcome.data.unwrap()["contact_id"], json!(contact.id));
    }

    #[tokio::test]
    async fn search_tasks_filters_by_status() {
        let (db, executor, ctx) = setup().await;
        let mut done = Task::new("co-1", "user-1", "done one");
        done.status = TaskStatus::Completed;
        q::insert_task(&db, &done).await.unwrap();
        q::insert_task(&db, &Task::new("co-1", "user-1", "open one"))
            .await
            .unwrap();

        let outcome = executor
            .execute(&ctx, "search_tasks", &json!({"status": "OPEN"}))
            .await
            .unwrap();
        let data = outcome.data.unwrap();
        assert_eq!(data["count"], json!(1));
        assert_eq!(data["tasks"][0]["title"], json!("open one"));
    }
}
