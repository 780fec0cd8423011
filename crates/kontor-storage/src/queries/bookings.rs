// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Booking row operations (talent-agency vertical).

use std::str::FromStr;

use kontor_core::KontorError;
use rusqlite::types::ToSql;
use rusqlite::{OptionalExtension, params, params_from_iter};

use crate::database::{Database, map_tr_err};
use crate::models::{Booking, BookingStatus};

/// Search filter for bookings. Unset fields do not constrain the query.
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub talent_id: Option<String>,
    pub contact_id: Option<String>,
    pub project_id: Option<String>,
}

pub async fn insert_booking(db: &Database, booking: &Booking) -> Result<(), KontorError> {
    let b = booking.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO bookings
                 (id, company_id, created_by, talent_id, contact_id, project_id, status,
                  start_date, end_date, location, fee, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    b.id,
                    b.company_id,
                    b.created_by,
                    b.talent_id,
                    b.contact_id,
                    b.project_id,
                    b.status.to_string(),
                    b.start_date,
                    b.end_date,
                    b.location,
                    b.fee,
                    b.created_at,
                    b.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_booking(
    db: &Database,
    company_id: &str,
    id: &str,
) -> Result<Option<Booking>, KontorError> {
    let company_id = company_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let booking = conn
                .query_row(
                    &format!("SELECT {COLUMNS} FROM bookings WHERE id = ?1 AND company_id = ?2"),
                    params![id, company_id],
                    map_row,
                )
                .optional()?;
            Ok(booking)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn update_booking(db: &Database, booking: &Booking) -> Result<bool, KontorError> {
    let b = booking.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE bookings SET
                     talent_id = ?1, contact_id = ?2, project_id = ?3, status = ?4,
                     start_date = ?5, end_date = ?6, location = ?7, fee = ?8, updated_at = ?9
                 WHERE id = ?10 AND company_id = ?11",
                params![
                    b.talent_id,
                    b.contact_id,
                    b.project_id,
                    b.status.to_string(),
                    b.start_date,
                    b.end_date,
                    b.location,
                    b.fee,
                    b.updated_at,
                    b.id,
                    b.company_id,
                ],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn search_bookings(
    db: &Database,
    company_id: &str,
    filter: &BookingFilter,
    limit: usize,
) -> Result<Vec<Booking>, KontorError> {
    let company_id = company_id.to_string();
    let filter = filter.clone();
    db.connection()
        .call(move |conn| {
            let mut sql = format!("SELECT {COLUMNS} FROM bookings WHERE company_id = ?");
            let mut binds: Vec<Box<dyn ToSql>> = vec![Box::new(company_id)];
            push_filter(&mut sql, &mut binds, &filter);
            sql.push_str(" ORDER BY updated_at DESC LIMIT ?");
            binds.push(Box::new(limit as i64));

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(binds.iter().map(|b| b.as_ref())), map_row)?;
            let mut bookings = Vec::new();
            for row in rows {
                bookings.push(row?);
            }
            Ok(bookings)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn count_bookings(
    db: &Database,
    company_id: &str,
    filter: &BookingFilter,
) -> Result<i64, KontorError> {
    let company_id = company_id.to_string();
    let filter = filter.clone();
    db.connection()
        .call(move |conn| {
            let mut sql = String::from("SELECT COUNT(*) FROM bookings WHERE company_id = ?");
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

const COLUMNS: &str = "id, company_id, created_by, talent_id, contact_id, project_id, status, \
                       start_date, end_date, location, fee, created_at, updated_at";

fn push_filter(sql: &mut String, binds: &mut Vec<Box<dyn ToSql>>, filter: &BookingFilter) {
    if let Some(status) = filter.status {
        sql.push_str(" AND status = ?");
        binds.push(Box::new(status.to_string()));
    }
    if let Some(talent_id) = &filter.talent_id {
        sql.push_str(" AND talent_id = ?");
        binds.push(Box::new(talent_id.clone()));
    }
    if let Some(contact_id) = &filter.contact_id {
        sql.push_str(" AND contact_id = ?");
        binds.push(Box::new(contact_id.clone()));
    }
    if let Some(project_id) = &filter.project_id {
        sql.push_str(" AND project_id = ?");
        binds.push(Box::new(project_id.clone()));
    }
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Booking> {
    let status: String = row.get(6)?;
    Ok(Booking {
        id: row.get(0)?,
        company_id: row.get(1)?,
        created_by: row.get(2)?,
        talent_id: row.get(3)?,
        contact_id: row.get(4)?,
        project_id: row.get(5)?,
        status: BookingStatus::from_str(&status).unwrap_or_default(),
        start_date: row.get(7)?,
        end_date: row.get(8)?,
        location: row.get(9)?,
        fee: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}
