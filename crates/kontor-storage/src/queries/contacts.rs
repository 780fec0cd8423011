// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact row operations.
//!
//! Leads are not a table of their own: a contact with a non-NONE
//! `lead_stage` is a lead. Lead searches and counts go through the same
//! functions with `lead_only` set on the filter.

use std::str::FromStr;

use kontor_core::KontorError;
use rusqlite::types::ToSql;
use rusqlite::{OptionalExtension, params, params_from_iter};

use crate::database::{Database, map_tr_err};
use crate::models::{Contact, LeadStage};

/// Search filter for contacts. Unset fields do not constrain the query.
#[derive(Debug, Clone, Default)]
pub struct ContactFilter {
    /// Matches first name, last name, full name, email, or organization.
    pub query: Option<String>,
    pub email: Option<String>,
    pub city: Option<String>,
    /// Restrict to contacts whose lead stage is not NONE.
    pub lead_only: bool,
    pub stage: Option<LeadStage>,
    pub source: Option<String>,
}

pub async fn insert_contact(db: &Database, contact: &Contact) -> Result<(), KontorError> {
    let c = contact.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO contacts
                 (id, company_id, created_by, first_name, last_name, email, phone, organization,
                  address, city, notes, lead_stage, lead_source, lead_value, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    c.id,
                    c.company_id,
                    c.created_by,
                    c.first_name,
                    c.last_name,
                    c.email,
                    c.phone,
                    c.organization,
                    c.address,
                    c.city,
                    c.notes,
                    c.lead_stage.to_string(),
                    c.lead_source,
                    c.lead_value,
                    c.created_at,
                    c.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_contact(
    db: &Database,
    company_id: &str,
    id: &str,
) -> Result<Option<Contact>, KontorError> {
    let company_id = company_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let contact = conn
                .query_row(
                    &format!("SELECT {COLUMNS} FROM contacts WHERE id = ?1 AND company_id = ?2"),
                    params![id, company_id],
                    map_row,
                )
                .optional()?;
            Ok(contact)
        })
        .await
        .map_err(map_tr_err)
}

/// Write every mutable field of the contact back by id, scoped to tenant.
/// Returns false when no row matched.
pub async fn update_contact(db: &Database, contact: &Contact) -> Result<bool, KontorError> {
    let c = contact.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE contacts SET
                     first_name = ?1, last_name = ?2, email = ?3, phone = ?4,
                     organization = ?5, address = ?6, city = ?7, notes = ?8,
                     lead_stage = ?9, lead_source = ?10, lead_value = ?11, updated_at = ?12
                 WHERE id = ?13 AND company_id = ?14",
                params![
                    c.first_name,
                    c.last_name,
                    c.email,
                    c.phone,
                    c.organization,
                    c.address,
                    c.city,
                    c.notes,
                    c.lead_stage.to_string(),
                    c.lead_source,
                    c.lead_value,
                    c.updated_at,
                    c.id,
                    c.company_id,
                ],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn delete_contact(db: &Database, company_id: &str, id: &str) -> Result<bool, KontorError> {
    let company_id = company_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "DELETE FROM contacts WHERE id = ?1 AND company_id = ?2",
                params![id, company_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Most recently updated contacts matching the filter.
pub async fn search_contacts(
    db: &Database,
    company_id: &str,
    filter: &ContactFilter,
    limit: usize,
) -> Result<Vec<Contact>, KontorError> {
    let company_id = company_id.to_string();
    let filter = filter.clone();
    db.connection()
        .call(move |conn| {
            let mut sql = format!("SELECT {COLUMNS} FROM contacts WHERE company_id = ?");
            let mut binds: Vec<Box<dyn ToSql>> = vec![Box::new(company_id)];
            push_filter(&mut sql, &mut binds, &filter);
            sql.push_str(" ORDER BY updated_at DESC LIMIT ?");
            binds.push(Box::new(limit as i64));

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(binds.iter().map(|b| b.as_ref())), map_row)?;
            let mut contacts = Vec::new();
            for row in rows {
                contacts.push(row?);
            }
            Ok(contacts)
        })
        .await
        .map_err(map_tr_err)
}

/// Count of contacts matching the filter.
pub async fn count_contacts(
    db: &Database,
    company_id: &str,
    filter: &ContactFilter,
) -> Result<i64, KontorError> {
    let company_id = company_id.to_string();
    let filter = filter.clone();
    db.connection()
        .call(move |conn| {
            let mut sql = String::from("SELECT COUNT(*) FROM contacts WHERE company_id = ?");
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

const COLUMNS: &str = "id, company_id, created_by, first_name, last_name, email, phone, \
                       organization, address, city, notes, lead_stage, lead_source, lead_value, \
                       created_at, updated_at";

fn push_filter(sql: &mut String, binds: &mut Vec<Box<dyn ToSql>>, filter: &ContactFilter) {
    if let Some(q) = &filter.query {
        sql.push_str(
            " AND (first_name LIKE ? OR last_name LIKE ? \
               OR (first_name || ' ' || last_name) LIKE ? \
               OR email LIKE ? OR organization LIKE ?)",
        );
        let like = format!("%{}%", q.trim());
        for _ in 0..5 {
            binds.push(Box::new(like.clone()));
        }
    }
    if let Some(email) = &filter.email {
        sql.push_str(" AND email = ? COLLATE NOCASE");
        binds.push(Box::new(email.clone()));
    }
    if let Some(city) = &filter.city {
        sql.push_str(" AND city LIKE ?");
        binds.push(Box::new(format!("%{}%", city.trim())));
    }
    if filter.lead_only {
        sql.push_str(" AND lead_stage != 'NONE'");
    }
    if let Some(stage) = filter.stage {
        sql.push_str(" AND lead_stage = ?");
        binds.push(Box::new(stage.to_string()));
    }
    if let Some(source) = &filter.source {
        sql.push_str(" AND lead_source LIKE ?");
        binds.push(Box::new(format!("%{}%", source.trim())));
    }
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Contact> {
    let stage: String = row.get(11)?;
    Ok(Contact {
        id: row.get(0)?,
        company_id: row.get(1)?,
        created_by: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        email: row.get(5)?,
        phone: row.get(6)?,
        organization: row.get(7)?,
        address: row.get(8)?,
        city: row.get(9)?,
        notes: row.get(10)?,
        lead_stage: LeadStage::from_str(&stage).unwrap_or_default(),
        lead_source: row.get(12)?,
        lead_value: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_contact(first: &str, last: &str) -> Contact {
        Contact::new("co-1", "user-1", first, last)
    }

    #[tokio::test]
    async fn insert_get_roundtrip() {
        let db = Database::open_in_memory().await.unwrap();
        let mut c = make_contact("Amanda", "Lopez");
        c.email = Some("amanda@example.com".to_string());
        insert_contact(&db, &c).await.unwrap();

        let found = get_contact(&db, "co-1", &c.id).await.unwrap().unwrap();
        assert_eq!(found, c);
        assert!(get_contact(&db, "co-2", &c.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_writes_all_fields() {
        let db = Database::open_in_memory().await.unwrap();
        let mut c = make_contact("Jane", "Jones");
        insert_contact(&db, &c).await.unwrap();

        c.email = Some("jane@corp.example".to_string());
        c.lead_stage = LeadStage::Qualified;
        c.lead_value = Some(12_000.0);
        assert!(update_contact(&db, &c).await.unwrap());

        let found = get_contact(&db, "co-1", &c.id).await.unwrap().unwrap();
        assert_eq!(found.email.as_deref(), Some("jane@corp.example"));
        assert_eq!(found.lead_stage, LeadStage::Qualified);
        assert_eq!(found.lead_value, Some(12_000.0));
    }

    #[tokio::test]
    async fn update_outside_tenant_is_noop() {
        let db = Database::open_in_memory().await.unwrap();
        let mut c = make_contact("Jane", "Jones");
        insert_contact(&db, &c).await.unwrap();

        c.company_id = "co-2".to_string();
        c.first_name = "Hacked".to_string();
        assert!(!update_contact(&db, &c).await.unwrap());

        let found = get_contact(&db, "co-1", &c.id).await.unwrap().unwrap();
        assert_eq!(found.first_name, "Jane");
    }

    #[tokio::test]
    async fn search_by_name_fragments() {
        let db = Database::open_in_memory().await.unwrap();
        insert_contact(&db, &make_contact("Amanda", "Lopez")).await.unwrap();
        insert_contact(&db, &make_contact("Jane", "Jones")).await.unwrap();

        let filter = ContactFilter {
            query: Some("amanda lopez".to_string()),
            ..Default::default()
        };
        let hits = search_contacts(&db, "co-1", &filter, 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].first_name, "Amanda");

        let filter = ContactFilter { query: Some("Jon".to_string()), ..Default::default() };
        let hits = search_contacts(&db, "co-1", &filter, 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].last_name, "Jones");
    }

    #[tokio::test]
    async fn lead_filters_and_counts() {
        let db = Database::open_in_memory().await.unwrap();
        let mut lead = make_contact("Kim", "Weber");
        lead.lead_stage = LeadStage::New;
        lead.lead_source = Some("Website".to_string());
        insert_contact(&db, &lead).await.unwrap();
        insert_contact(&db, &make_contact("Plain", "Contact")).await.unwrap();

        let all = ContactFilter::default();
        assert_eq!(count_contacts(&db, "co-1", &all).await.unwrap(), 2);

        let leads = ContactFilter { lead_only: true, ..Default::default() };
        assert_eq!(count_contacts(&db, "co-1", &leads).await.unwrap(), 1);

        let by_source = ContactFilter {
            lead_only: true,
            source: Some("Website".to_string()),
            ..Default::default()
        };
        let hits = search_contacts(&db, "co-1", &by_source, 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].first_name, "Kim");

        let by_stage = ContactFilter {
            stage: Some(LeadStage::Won),
            ..Default::default()
        };
        assert_eq!(count_contacts(&db, "co-1", &by_stage).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_scoped_to_tenant() {
        let db = Database::open_in_memory().await.unwrap();
        let c = make_contact("Amanda", "Lopez");
        insert_contact(&db, &c).await.unwrap();

        assert!(!delete_contact(&db, "co-2", &c.id).await.unwrap());
        assert!(delete_contact(&db, "co-1", &c.id).await.unwrap());
        assert!(get_contact(&db, "co-1", &c.id).await.unwrap().is_none());
    }
}
