// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Project row operations.

use std::str::FromStr;

use kontor_core::KontorError;
use rusqlite::types::ToSql;
use rusqlite::{OptionalExtension, params, params_from_iter};

use crate::database::{Database, map_tr_err};
use crate::models::{Project, ProjectStatus};

/// Search filter for projects. Unset fields do not constrain the query.
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    /// Matches name or description.
    pub query: Option<String>,
    pub status: Option<ProjectStatus>,
    pub contact_id: Option<String>,
}

pub async fn insert_project(db: &Database, project: &Project) -> Result<(), KontorError> {
    let p = project.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO projects
                 (id, company_id, created_by, name, description, status, contact_id,
                  start_date, end_date, budget, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    p.id,
                    p.company_id,
                    p.created_by,
                    p.name,
                    p.description,
                    p.status.to_string(),
                    p.contact_id,
                    p.start_date,
                    p.end_date,
                    p.budget,
                    p.created_at,
                    p.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_project(
    db: &Database,
    company_id: &str,
    id: &str,
) -> Result<Option<Project>, KontorError> {
    let company_id = company_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let project = conn
                .query_row(
                    &format!("SELECT {COLUMNS} FROM projects WHERE id = ?1 AND company_id = ?2"),
                    params![id, company_id],
                    map_row,
                )
                .optional()?;
            Ok(project)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn update_project(db: &Database, project: &Project) -> Result<bool, KontorError> {
    let p = project.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE projects SET
                     name = ?1, description = ?2, status = ?3, contact_id = ?4,
                     start_date = ?5, end_date = ?6, budget = ?7, updated_at = ?8
                 WHERE id = ?9 AND company_id = ?10",
                params![
                    p.name,
                    p.description,
                    p.status.to_string(),
                    p.contact_id,
                    p.start_date,
                    p.end_date,
                    p.budget,
                    p.updated_at,
                    p.id,
                    p.company_id,
                ],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn delete_project(db: &Database, company_id: &str, id: &str) -> Result<bool, KontorError> {
    let company_id = company_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "DELETE FROM projects WHERE id = ?1 AND company_id = ?2",
                params![id, company_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn search_projects(
    db: &Database,
    company_id: &str,
    filter: &ProjectFilter,
    limit: usize,
) -> Result<Vec<Project>, KontorError> {
    let company_id = company_id.to_string();
    let filter = filter.clone();
    db.connection()
        .call(move |conn| {
            let mut sql = format!("SELECT {COLUMNS} FROM projects WHERE company_id = ?");
            let mut binds: Vec<Box<dyn ToSql>> = vec![Box::new(company_id)];
            push_filter(&mut sql, &mut binds, &filter);
            sql.push_str(" ORDER BY updated_at DESC LIMIT ?");
            binds.push(Box::new(limit as i64));

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(binds.iter().map(|b| b.as_ref())), map_row)?;
            let mut projects = Vec::new();
            for row in rows {
                projects.push(row?);
            }
            Ok(projects)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn count_projects(
    db: &Database,
    company_id: &str,
    filter: &ProjectFilter,
) -> Result<i64, KontorError> {
    let company_id = company_id.to_string();
    let filter = filter.clone();
    db.connection()
        .call(move |conn| {
            let mut sql = String::from("SELECT COUNT(*) FROM projects WHERE company_id = ?");
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

const COLUMNS: &str = "id, company_id, created_by, name, description, status, contact_id, \
                       start_date, end_date, budget, created_at, updated_at";

fn push_filter(sql: &mut String, binds: &mut Vec<Box<dyn ToSql>>, filter: &ProjectFilter) {
    if let Some(q) = &filter.query {
        sql.push_str(" AND (name LIKE ? OR description LIKE ?)");
        let like = format!("%{}%", q.trim());
        binds.push(Box::new(like.clone()));
        binds.push(Box::new(like));
    }
    if let Some(status) = filter.status {
        sql.push_str(" AND status = ?");
        binds.push(Box::new(status.to_string()));
    }
    if let Some(contact_id) = &filter.contact_id {
        sql.push_str(" AND contact_id = ?");
        binds.push(Box::new(contact_id.clone()));
    }
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    let status: String = row.get(5)?;
    Ok(Project {
        id: row.get(0)?,
        company_id: row.get(1)?,
        created_by: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        status: ProjectStatus::from_str(&status).unwrap_or_default(),
        contact_id: row.get(6)?,
        start_date: row.get(7)?,
        end_date: row.get(8)?,
        budget: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn crud_roundtrip() {
        let db = Database::open_in_memory().await.unwrap();
        let mut p = Project::new("co-1", "user-1", "Website Relaunch");
        p.budget = Some(25_000.0);
        insert_project(&db, &p).await.unwrap();

        p.status = ProjectStatus::Active;
        assert!(update_project(&db, &p).await.unwrap());

        let found = get_project(&db, "co-1", &p.id).await.unwrap().unwrap();
        assert_eq!(found.status, ProjectStatus::Active);
        assert_eq!(found.budget, Some(25_000.0));

        assert!(delete_project(&db, "co-1", &p.id).await.unwrap());
        assert!(get_project(&db, "co-1", &p.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn search_by_status() {
        let db = Database::open_in_memory().await.unwrap();
        let mut active = Project::new("co-1", "user-1", "Campaign");
        active.status = ProjectStatus::Active;
        insert_project(&db, &active).await.unwrap();
        insert_project(&db, &Project::new("co-1", "user-1", "Backlog item")).await.unwrap();

        let filter = ProjectFilter { status: Some(ProjectStatus::Active), ..Default::default() };
        let hits = search_projects(&db, "co-1", &filter, 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Campaign");
        assert_eq!(count_projects(&db, "co-1", &ProjectFilter::default()).await.unwrap(), 2);
    }
}
