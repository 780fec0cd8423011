// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Expense row operations.

use kontor_core::KontorError;
use rusqlite::types::ToSql;
use rusqlite::{OptionalExtension, params, params_from_iter};

use crate::database::{Database, map_tr_err};
use crate::models::Expense;

/// Search filter for expenses. Unset fields do not constrain the query.
#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    /// Matches the description.
    pub query: Option<String>,
    pub category: Option<String>,
    pub project_id: Option<String>,
}

pub async fn insert_expense(db: &Database, expense: &Expense) -> Result<(), KontorError> {
    let e = expense.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO expenses
                 (id, company_id, created_by, description, amount, currency, category,
                  expense_date, project_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    e.id,
                    e.company_id,
                    e.created_by,
                    e.description,
                    e.amount,
                    e.currency,
                    e.category,
                    e.expense_date,
                    e.project_id,
                    e.created_at,
                    e.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_expense(
    db: &Database,
    company_id: &str,
    id: &str,
) -> Result<Option<Expense>, KontorError> {
    let company_id = company_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let expense = conn
                .query_row(
                    &format!("SELECT {COLUMNS} FROM expenses WHERE id = ?1 AND company_id = ?2"),
                    params![id, company_id],
                    map_row,
                )
                .optional()?;
            Ok(expense)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn delete_expense(db: &Database, company_id: &str, id: &str) -> Result<bool, KontorError> {
    let company_id = company_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "DELETE FROM expenses WHERE id = ?1 AND company_id = ?2",
                params![id, company_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn search_expenses(
    db: &Database,
    company_id: &str,
    filter: &ExpenseFilter,
    limit: usize,
) -> Result<Vec<Expense>, KontorError> {
    let company_id = company_id.to_string();
    let filter = filter.clone();
    db.connection()
        .call(move |conn| {
            let mut sql = format!("SELECT {COLUMNS} FROM expenses WHERE company_id = ?");
            let mut binds: Vec<Box<dyn ToSql>> = vec![Box::new(company_id)];
            push_filter(&mut sql, &mut binds, &filter);
            sql.push_str(" ORDER BY updated_at DESC LIMIT ?");
            binds.push(Box::new(limit as i64));

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(binds.iter().map(|b| b.as_ref())), map_row)?;
            let mut expenses = Vec::new();
            for row in rows {
                expenses.push(row?);
            }
            Ok(expenses)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn count_expenses(
    db: &Database,
    company_id: &str,
    filter: &ExpenseFilter,
) -> Result<i64, KontorError> {
    let company_id = company_id.to_string();
    let filter = filter.clone();
    db.connection()
        .call(move |conn| {
            let mut sql = String::from("SELECT COUNT(*) FROM expenses WHERE company_id = ?");
            let mut binds: Vec<Box<dyn ToSql>> = vec![Box::new(company_id)];
            push_filter(&mut sql, &mut binds, &filter);

            let count = conn.query_row(
                &sql,
                params_from_iter(binds.iter().map(|b| b.as_ref())),
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(map_tr_err)
}

const COLUMNS: &str = "id, company_id, created_by, description, amount, currency, category, \
                       expense_date, project_id, created_at, updated_at";

fn push_filter(sql: &mut String, binds: &mut Vec<Box<dyn ToSql>>, filter: &ExpenseFilter) {
    if let Some(q) = &filter.query {
        sql.push_str(" AND description LIKE ?");
        binds.push(Box::new(format!("%{}%", q.trim())));
    }
    if let Some(category) = &filter.category {
        sql.push_str(" AND category LIKE ?");
        binds.push(Box::new(format!("%{}%", category.trim())));
    }
    if let Some(project_id) = &filter.project_id {
        sql.push_str(" AND project_id = ?");
        binds.push(Box::new(project_id.clone()));
    }
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Expense> {
    Ok(Expense {
        id: row.get(0)?,
        company_id: row.get(1)?,
        created_by: row.get(2)?,
        description: row.get(3)?,
        amount: row.get(4)?,
        currency: row.get(5)?,
        category: row.get(6)?,
        expense_date: row.get(7)?,
        project_id: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_search_delete() {
        let db = Database::open_in_memory().await.unwrap();
        let mut e = Expense::new("co-1", "user-1", "Studio rental", 450.0, "EUR");
        e.category = Some("Production".to_string());
        insert_expense(&db, &e).await.unwrap();
        insert_expense(&db, &Expense::new("co-1", "user-1", "Taxi", 32.5, "EUR"))
            .await
            .unwrap();

        let filter = ExpenseFilter { category: Some("production".to_string()), ..Default::default() };
        let hits = search_expenses(&db, "co-1", &filter, 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].description, "Studio rental");

        assert!(delete_expense(&db, "co-1", &e.id).await.unwrap());
        assert_eq!(count_expenses(&db, "co-1", &ExpenseFilter::default()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn get_is_tenant_scoped() {
        let db = Database::open_in_memory().await.unwrap();
        let e = Expense::new("co-1", "user-1", "Lunch", 18.0, "EUR");
        insert_expense(&db, &e).await.unwrap();

        assert!(get_expense(&db, "co-1", &e.id).await.unwrap().is_some());
        assert!(get_expense(&db, "co-2", &e.id).await.unwrap().is_none());
    }
}
