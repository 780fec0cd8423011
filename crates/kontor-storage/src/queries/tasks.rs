// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Task row operations.

use std::str::FromStr;

use kontor_core::KontorError;
use rusqlite::types::ToSql;
use rusqlite::{OptionalExtension, params, params_from_iter};

use crate::database::{Database, map_tr_err};
use crate::models::{Task, TaskPriority, TaskStatus};

/// Search filter for tasks. Unset fields do not constrain the query.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// Matches title or description.
    pub query: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub contact_id: Option<String>,
    pub project_id: Option<String>,
    /// ISO date upper bound on due_date (inclusive).
    pub due_before: Option<String>,
}

pub async fn insert_task(db: &Database, task: &Task) -> Result<(), KontorError> {
    let t = task.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO tasks
                 (id, company_id, created_by, title, description, status, priority, due_date,
                  contact_id, project_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    t.id,
                    t.company_id,
                    t.created_by,
                    t.title,
                    t.description,
                    t.status.to_string(),
                    t.priority.to_string(),
                    t.due_date,
                    t.contact_id,
                    t.project_id,
                    t.created_at,
                    t.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_task(db: &Database, company_id: &str, id: &str) -> Result<Option<Task>, KontorError> {
    let company_id = company_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let task = conn
                .query_row(
                    &format!("SELECT {COLUMNS} FROM tasks WHERE id = ?1 AND company_id = ?2"),
                    params![id, company_id],
                    map_row,
                )
                .optional()?;
            Ok(task)
        })
        .await
        .map_err(map_tr_err)
}

/// Write every mutable field back by id, scoped to tenant.
pub async fn update_task(db: &Database, task: &Task) -> Result<bool, KontorError> {
    let t = task.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE tasks SET
                     title = ?1, description = ?2, status = ?3, priority = ?4, due_date = ?5,
                     contact_id = ?6, project_id = ?7, updated_at = ?8
                 WHERE id = ?9 AND company_id = ?10",
                params![
                    t.title,
                    t.description,
                    t.status.to_string(),
                    t.priority.to_string(),
                    t.due_date,
                    t.contact_id,
                    t.project_id,
                    t.updated_at,
                    t.id,
                    t.company_id,
                ],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn delete_task(db: &Database, company_id: &str, id: &str) -> Result<bool, KontorError> {
    let company_id = company_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "DELETE FROM tasks WHERE id = ?1 AND company_id = ?2",
                params![id, company_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn search_tasks(
    db: &Database,
    company_id: &str,
    filter: &TaskFilter,
    limit: usize,
) -> Result<Vec<Task>, KontorError> {
    let company_id = company_id.to_string();
    let filter = filter.clone();
    db.connection()
        .call(move |conn| {
            let mut sql = format!("SELECT {COLUMNS} FROM tasks WHERE company_id = ?");
            let mut binds: Vec<Box<dyn ToSql>> = vec![Box::new(company_id)];
            push_filter(&mut sql, &mut binds, &filter);
            sql.push_str(" ORDER BY updated_at DESC LIMIT ?");
            binds.push(Box::new(limit as i64));

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(binds.iter().map(|b| b.as_ref())), map_row)?;
            let mut tasks = Vec::new();
            for row in rows {
                tasks.push(row?);
            }
            Ok(tasks)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn count_tasks(
    db: &Database,
    company_id: &str,
    filter: &TaskFilter,
) -> Result<i64, KontorError> {
    let company_id = company_id.to_string();
    let filter = filter.clone();
    db.connection()
        .call(move |conn| {
            let mut sql = String::from("SELECT COUNT(*) FROM tasks WHERE company_id = ?");
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

const COLUMNS: &str = "id, company_id, created_by, title, description, status, priority, \
                       due_date, contact_id, project_id, created_at, updated_at";

fn push_filter(sql: &mut String, binds: &mut Vec<Box<dyn ToSql>>, filter: &TaskFilter) {
    if let Some(q) = &filter.query {
        sql.push_str(" AND (title LIKE ? OR description LIKE ?)");
        let like = format!("%{}%", q.trim());
        binds.push(Box::new(like.clone()));
        binds.push(Box::new(like));
    }
    if let Some(status) = filter.status {
        sql.push_str(" AND status = ?");
        binds.push(Box::new(status.to_string()));
    }
    if let Some(priority) = filter.priority {
        sql.push_str(" AND priority = ?");
        binds.push(Box::new(priority.to_string()));
    }
    if let Some(contact_id) = &filter.contact_id {
        sql.push_str(" AND contact_id = ?");
        binds.push(Box::new(contact_id.clone()));
    }
    if let Some(project_id) = &filter.project_id {
        sql.push_str(" AND project_id = ?");
        binds.push(Box::new(project_id.clone()));
    }
    if let Some(due) = &filter.due_before {
        sql.push_str(" AND due_date IS NOT NULL AND due_date <= ?");
        binds.push(Box::new(due.clone()));
    }
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    let status: String = row.get(5)?;
    let priority: String = row.get(6)?;
    Ok(Task {
        id: row.get(0)?,
        company_id: row.get(1)?,
        created_by: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        status: TaskStatus::from_str(&status).unwrap_or_default(),
        priority: TaskPriority::from_str(&priority).unwrap_or_default(),
        due_date: row.get(7)?,
        contact_id: row.get(8)?,
        project_id: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}
