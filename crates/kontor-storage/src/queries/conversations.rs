// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation row operations.

use kontor_core::{KontorError, now_iso};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::Conversation;

/// Insert a new conversation.
pub async fn insert_conversation(db: &Database, conv: &Conversation) -> Result<(), KontorError> {
    let conv = conv.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversations
                 (id, company_id, user_id, title, learnings_extracted, deleted_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    conv.id,
                    conv.company_id,
                    conv.user_id,
                    conv.title,
                    conv.learnings_extracted,
                    conv.deleted_at,
                    conv.created_at,
                    conv.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a conversation by id within the tenant. Soft-deleted rows are
/// invisible here.
pub async fn get_conversation(
    db: &Database,
    company_id: &str,
    id: &str,
) -> Result<Option<Conversation>, KontorError> {
    let company_id = company_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let conv = conn
                .query_row(
                    "SELECT id, company_id, user_id, title, learnings_extracted, deleted_at,
                            created_at, updated_at
                     FROM conversations
                     WHERE id = ?1 AND company_id = ?2 AND deleted_at IS NULL",
                    params![id, company_id],
                    map_row,
                )
                .optional()?;
            Ok(conv)
        })
        .await
        .map_err(map_tr_err)
}

/// Bump `updated_at` after a completed turn.
pub async fn touch_conversation(db: &Database, company_id: &str, id: &str) -> Result<(), KontorError> {
    let company_id = company_id.to_string();
    let id = id.to_string();
    let now = now_iso();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET updated_at = ?1 WHERE id = ?2 AND company_id = ?3",
                params![now, id, company_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Soft-delete a conversation. Returns false when no visible row matched.
/// Purging soft-deleted rows is an external job's business.
pub async fn soft_delete_conversation(
    db: &Database,
    company_id: &str,
    id: &str,
) -> Result<bool, KontorError> {
    let company_id = company_id.to_string();
    let id = id.to_string();
    let now = now_iso();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE conversations SET deleted_at = ?1
                 WHERE id = ?2 AND company_id = ?3 AND deleted_at IS NULL",
                params![now, id, company_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        company_id: row.get(1)?,
        user_id: row.get(2)?,
        title: row.get(3)?,
        learnings_extracted: row.get(4)?,
        deleted_at: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}
