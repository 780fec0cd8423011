// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Expense tools.

use kontor_core::{KontorError, RequestContext};
use kontor_storage::Expense;
use kontor_storage::queries::expenses as q;
use serde_json::{Value, json};

use super::verify::mismatched_fields;
use super::{Resolution, arg_f64, arg_limit, arg_str, arg_string, projects};
use crate::outcome::{ToolOutcome, localized};

fn view(e: &Expense) -> Value {
    json!({
        "id": e.id,
        "description": e.description,
        "amount": e.amount,
        "currency": e.currency,
        "category": e.category,
        "expense_date": e.expense_date,
        "project_id": e.project_id,
    })
}

fn not_found(ctx: &RequestContext) -> ToolOutcome {
    ToolOutcome::fail(localized(
        ctx.language,
        "I couldn't find a matching expense.",
        "Ich konnte keine passende Ausgabe finden.",
    ))
}

fn ambiguous(ctx: &RequestContext, hits: &[Expense]) -> ToolOutcome {
    ToolOutcome::disambiguation(
        localized(
            ctx.language,
            format!(
                "I found {} matching expenses. Which one do you mean?",
                hits.len()
            ),
            format!(
                "Ich habe {} passende Ausgaben gefunden. Welche meinst du?",
                hits.len()
            ),
        ),
        hits.iter()
            .map(|e| {
                json!({
                    "id": e.id,
                    "description": e.description,
                    "amount": e.amount,
                    "currency": e.currency,
                    "expense_date": e.expense_date,
                })
            })
            .collect(),
    )
}

fn verification_failed(ctx: &RequestContext) -> ToolOutcome {
    ToolOutcome::fail(localized(
        ctx.language,
        "The expense could not be verified after writing.",
        "Die Ausgabe konnte nach dem Schreiben nicht bestätigt werden.",
    ))
    .with_extra("verification_failed", Value::Bool(true))
}

async fn resolve(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<Resolution<Expense>, KontorError> {
    if let Some(id) = arg_str(args, "id") {
        return Ok(match q::get_expense(db, &ctx.company_id, id).await? {
            Some(e) => Resolution::One(e),
            None => Resolution::None,
        });
    }
    let Some(description) = arg_str(args, "description") else {
        return Ok(Resolution::None);
    };
    let filter = q::ExpenseFilter {
        query: Some(description.to_string()),
        ..Default::default()
    };
    let mut hits = q::search_expenses(db, &ctx.company_id, &filter, 10).await?;
    Ok(match hits.len() {
        0 => Resolution::None,
        1 => Resolution::One(hits.remove(0)),
        _ => Resolution::Many(hits),
    })
}

pub(super) async fn create_expense(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    let description = arg_str(args, "description").unwrap_or_default();
    let amount = arg_f64(args, "amount").unwrap_or(0.0);
    let currency = arg_string(args, "currency").unwrap_or_else(|| ctx.currency.clone());

    let mut expense = Expense::new(&ctx.company_id, &ctx.user_id, description, amount, currency);
    expense.category = arg_string(args, "category");
    expense.expense_date = arg_string(args, "expense_date");
    if let Some(project_name) = arg_str(args, "project_name") {
        match projects::find_by_name(db, ctx, project_name).await? {
            Resolution::One(p) => expense.project_id = Some(p.id),
            Resolution::Many(hits) => return Ok(projects::ambiguous(ctx, &hits)),
            Resolution::None => return Ok(projects::not_found(ctx)),
        }
    }

    q::insert_expense(db, &expense).await?;

    let Some(persisted) = q::get_expense(db, &ctx.company_id, &expense.id).await? else {
        return Ok(verification_failed(ctx));
    };
    let requested = view(&expense).as_object().cloned().unwrap_or_default();
    if !mismatched_fields(&requested, &view(&persisted)).is_empty() {
        return Ok(verification_failed(ctx));
    }

    Ok(ToolOutcome::ok(localized(
        ctx.language,
        format!(
            "Recorded expense \"{}\" over {:.2} {}.",
            persisted.description, persisted.amount, persisted.currency
        ),
        format!(
            "Ausgabe \"{}\" über {:.2} {} wurde erfasst.",
            persisted.description, persisted.amount, persisted.currency
        ),
    ))
    .with_data(view(&persisted))
    .with_entity("expense", &persisted.id)
    .with_summary(format!("recorded expense {}", persisted.description)))
}

pub(super) async fn delete_expense(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    let expense = match resolve(db, ctx, args).await? {
        Resolution::One(e) => e,
        Resolution::Many(hits) => return Ok(ambiguous(ctx, &hits)),
        Resolution::None => return Ok(not_found(ctx)),
    };

    if !q::delete_expense(db, &ctx.company_id, &expense.id).await? {
        return Ok(not_found(ctx));
    }
    if q::get_expense(db, &ctx.company_id, &expense.id).await?.is_some() {
        return Ok(ToolOutcome::fail(localized(
            ctx.language,
            "The expense is still present after deleting.",
            "Die Ausgabe ist nach dem Löschen weiterhin vorhanden.",
        ))
        .with_extra("verification_failed", Value::Bool(true)));
    }

    Ok(ToolOutcome::ok(localized(
        ctx.language,
        format!("Deleted expense \"{}\".", expense.description),
        format!("Ausgabe \"{}\" wurde gelöscht.", expense.description),
    ))
    .with_entity("expense", &expense.id)
    .with_summary(format!("deleted expense {}", expense.description)))
}

pub(super) async fn search_expenses(
    db: &kontor_storage::Database,
    ctx: &RequestContext,
    args: &Value,
) -> Result<ToolOutcome, KontorError> {
    let filter = q::ExpenseFilter {
        query: arg_string(args, "query"),
        category: arg_string(args, "category"),
        ..Default::default()
    };

    let hits = q::search_expenses(db, &ctx.company_id, &filter, arg_limit(args)).await?;
    let total: f64 = hits.iter().map(|e| e.amount).sum();
    let message = if hits.is_empty() {
        localized(ctx.language, "No expenses matched.", "Keine passenden Ausgaben gefunden.")
    } else {
        localized(
            ctx.language,
            format!("Found {} expenses totalling {total:.2}.", hits.len()),
            format!("{} Ausgaben mit Summe {total:.2} gefunden.", hits.len()),
        )
    };
    Ok(ToolOutcome::ok(message).with_data(json!({
        "count": hits.len(),
        "total": total,
        "expenses": hits.iter().map(view).collect::<Vec<_>>(),
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
    async fn create_then_delete_by_description() {
        let (db, executor, ctx) = setup().await;
        let created = executor
            .execute(
                &ctx,
                "create_expense",
                &json!({"description": "Studio rental", "amount": 450.0, "category": "production"}),
            )
            .await
            .unwrap();
        assert!(created.success, "{}", created.message);
        let id = created.data.unwrap()["id"].as_str().unwrap().to_string();

        let deleted = executor
            .execute(&ctx, "delete_expense", &json!({"description": "Studio rental"}))
            .await
            .unwrap();
        assert!(deleted.success, "{}", deleted.message);
        assert!(q::get_expense(&db, "co-1", &id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn search_reports_the_total() {
        let (db, executor, ctx) = setup().await;
        q::insert_expense(&db, &Expense::new("co-1", "user-1", "Taxi", 32.5, "EUR"))
            .await
            .unwrap();
        q::insert_expense(&db, &Expense::new("co-1", "user-1", "Catering", 210.0, "EUR"))
            .await
            .unwrap();

        let outcome = executor.execute(&ctx, "search_expenses", &json!({})).await.unwrap();
        let data = outcome.data.unwrap();
        assert_eq!(data["count"], 2);
        assert!((data["total"].as_f64().unwrap() - 242.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn ambiguous_description_deletes_nothing() {
        let (db, executor, ctx) = setup().await;
        q::insert_expense(&db, &Expense::new("co-1", "user-1", "Travel Berlin", 80.0, "EUR"))
            .await
            .unwrap();
        q::insert_expense(&db, &Expense::new("co-1", "user-1", "Travel Hamburg", 95.0, "EUR"))
            .await
            .unwrap();

        let outcome = executor
            .execute(&ctx, "delete_expense", &json!({"description": "Travel"}))
            .await
            .unwrap();
        assert!(outcome.is_disambiguation());
        let remaining =
            q::count_expenses(&db, "co-1", &q::ExpenseFilter::default()).await.unwrap();
        assert_eq!(remaining, 2);
    }
}
