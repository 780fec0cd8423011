// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Talent roster operations (talent-agency vertical).

use std::str::FromStr;

use kontor_core::KontorError;
use rusqlite::types::ToSql;
use rusqlite::{OptionalExtension, params, params_from_iter};

use crate::database::{Database, map_tr_err};
use crate::models::{Talent, TalentStatus};

/// Search filter for talent. Unset fields do not constrain the query.
#[derive(Debug, Clone, Default)]
pub struct TalentFilter {
    /// Matches name or email.
    pub query: Option<String>,
    pub category: Option<String>,
    pub city: Option<String>,
    pub status: Option<TalentStatus>,
}

pub async fn insert_talent(db: &Database, talent: &Talent) -> Result<(), KontorError> {
    let t = talent.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO talent
                 (id, company_id, created_by, name, email, phone, category, daily_rate, city,
                  status, notes, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    t.id,
                    t.company_id,
                    t.created_by,
                    t.name,
                    t.email,
                    t.phone,
                    t.category,
                    t.daily_rate,
                    t.city,
                    t.status.to_string(),
                    t.notes,
                    t.created_at,
                    t.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_talent(
    db: &Database,
    company_id: &str,
    id: &str,
) -> Result<Option<Talent>, KontorError> {
    let company_id = company_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let talent = conn
                .query_row(
                    &format!("SELECT {COLUMNS} FROM talent WHERE id = ?1 AND company_id = ?2"),
                    params![id, company_id],
                    map_row,
                )
                .optional()?;
            Ok(talent)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn update_talent(db: &Database, talent: &Talent) -> Result<bool, KontorError> {
    let t = talent.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE talent SET
                     name = ?1, email = ?2, phone = ?3, category = ?4, daily_rate = ?5,
                     city = ?6, status = ?7, notes = ?8, updated_at = ?9
                 WHERE id = ?10 AND company_id = ?11",
                params![
                    t.name,
                    t.email,
                    t.phone,
                    t.category,
                    t.daily_rate,
                    t.city,
                    t.status.to_string(),
                    t.notes,
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

pub async fn search_talent(
    db: &Database,
    company_id: &str,
    filter: &TalentFilter,
    limit: usize,
) -> Result<Vec<Talent>, KontorError> {
    let company_id = company_id.to_string();
    let filter = filter.clone();
    db.connection()
        .call(move |conn| {
            let mut sql = format!("SELECT {COLUMNS} FROM talent WHERE company_id = ?");
            let mut binds: Vec<Box<dyn ToSql>> = vec![Box::new(company_id)];
            push_filter(&mut sql, &mut binds, &filter);
            sql.push_str(" ORDER BY updated_at DESC LIMIT ?");
            binds.push(Box::new(limit as i64));

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(binds.iter().map(|b| b.as_ref())), map_row)?;
            let mut talent = Vec::new();
            for row in rows {
                talent.push(row?);
            }
            Ok(talent)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn count_talent(
    db: &Database,
    company_id: &str,
    filter: &TalentFilter,
) -> Result<i64, KontorError> {
    let company_id = company_id.to_string();
    let filter = filter.clone();
    db.connection()
        .call(move |conn| {
            let mut sql = String::from("SELECT COUNT(*) FROM talent WHERE company_id = ?");
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

const COLUMNS: &str = "id, company_id, created_by, name, email, phone, category, daily_rate, \
                       city, status, notes, created_at, updated_at";

fn push_filter(sql: &mut String, binds: &mut Vec<Box<dyn ToSql>>, filter: &TalentFilter) {
    if let Some(q) = &filter.query {
        sql.push_str(" AND (name LIKE ? OR email LIKE ?)");
        let like = format!("%{}%", q.trim());
        binds.push(Box::new(like.clone()));
        binds.push(Box::new(like));
    }
    if let Some(category) = &filter.category {
        sql.push_str(" AND category LIKE ?");
        binds.push(Box::new(format!("%{}%", category.trim())));
    }
    if let Some(city) = &filter.city {
        sql.push_str(" AND city LIKE ?");
        binds.push(Box::new(format!("%{}%", city.trim())));
    }
    if let Some(status) = filter.status {
        sql.push_str(" AND status = ?");
        binds.push(Box::new(status.to_string()));
    }
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Talent> {
    let status: String = row.get(9)?;
    Ok(Talent {
        id: row.get(0)?,
        company_id: row.get(1)?,
        created_by: row.get(2)?,
        name: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        category: row.get(6)?,
        daily_rate: row.get(7)?,
        city: row.get(8)?,
        status: TalentStatus::from_str(&status).unwrap_or_default(),
        notes: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}
