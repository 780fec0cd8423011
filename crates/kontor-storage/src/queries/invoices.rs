// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Invoice row operations.

use std::str::FromStr;

use kontor_core::KontorError;
use rusqlite::types::ToSql;
use rusqlite::{OptionalExtension, params, params_from_iter};

use crate::database::{Database, map_tr_err};
use crate::models::{Invoice, InvoiceStatus};

/// Search filter for invoices. Unset fields do not constrain the query.
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    /// Matches the invoice number.
    pub query: Option<String>,
    pub status: Option<InvoiceStatus>,
    pub contact_id: Option<String>,
}

pub async fn insert_invoice(db: &Database, invoice: &Invoice) -> Result<(), KontorError> {
    let i = invoice.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO invoices
                 (id, company_id, created_by, number, contact_id, amount, currency, status,
                  due_date, issued_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    i.id,
                    i.company_id,
                    i.created_by,
                    i.number,
                    i.contact_id,
                    i.amount,
                    i.currency,
                    i.status.to_string(),
                    i.due_date,
                    i.issued_at,
                    i.created_at,
                    i.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_invoice(
    db: &Database,
    company_id: &str,
    id: &str,
) -> Result<Option<Invoice>, KontorError> {
    let company_id = company_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let invoice = conn
                .query_row(
                    &format!("SELECT {COLUMNS} FROM invoices WHERE id = ?1 AND company_id = ?2"),
                    params![id, company_id],
                    map_row,
                )
                .optional()?;
            Ok(invoice)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn update_invoice(db: &Database, invoice: &Invoice) -> Result<bool, KontorError> {
    let i = invoice.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE invoices SET
                     number = ?1, contact_id = ?2, amount = ?3, currency = ?4, status = ?5,
                     due_date = ?6, issued_at = ?7, updated_at = ?8
                 WHERE id = ?9 AND company_id = ?10",
                params![
                    i.number,
                    i.contact_id,
                    i.amount,
                    i.currency,
                    i.status.to_string(),
                    i.due_date,
                    i.issued_at,
                    i.updated_at,
                    i.id,
                    i.company_id,
                ],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn search_invoices(
    db: &Database,
    company_id: &str,
    filter: &InvoiceFilter,
    limit: usize,
) -> Result<Vec<Invoice>, KontorError> {
    let company_id = company_id.to_string();
    let filter = filter.clone();
    db.connection()
        .call(move |conn| {
            let mut sql = format!("SELECT {COLUMNS} FROM invoices WHERE company_id = ?");
            let mut binds: Vec<Box<dyn ToSql>> = vec![Box::new(company_id)];
            push_filter(&mut sql, &mut binds, &filter);
            sql.push_str(" ORDER BY updated_at DESC LIMIT ?");
            binds.push(Box::new(limit as i64));

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(binds.iter().map(|b| b.as_ref())), map_row)?;
            let mut invoices = Vec::new();
            for row in rows {
                invoices.push(row?);
            }
            Ok(invoices)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn count_invoices(
    db: &Database,
    company_id: &str,
    filter: &InvoiceFilter,
) -> Result<i64, KontorError> {
    let company_id = company_id.to_string();
    let filter = filter.clone();
    db.connection()
        .call(move |conn| {
            let mut sql = String::from("SELECT COUNT(*) FROM invoices WHERE company_id = ?");
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

const COLUMNS: &str = "id, company_id, created_by, number, contact_id, amount, currency, status, \
                       due_date, issued_at, created_at, updated_at";

fn push_filter(sql: &mut String, binds: &mut Vec<Box<dyn ToSql>>, filter: &InvoiceFilter) {
    if let Some(q) = &filter.query {
        sql.push_str(" AND number LIKE ?");
        binds.push(Box::new(format!("%{}%", q.trim())));
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

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Invoice> {
    let status: String = row.get(7)?;
    Ok(Invoice {
        id: row.get(0)?,
        company_id: row.get(1)?,
        created_by: row.get(2)?,
        number: row.get(3)?,
        contact_id: row.get(4)?,
        amount: row.get(5)?,
        currency: row.get(6)?,
        status: InvoiceStatus::from_str(&status).unwrap_or_default(),
        due_date: row.get(8)?,
        issued_at: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}
