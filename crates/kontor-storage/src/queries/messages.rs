// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message row operations.
//!
//! Messages are immutable once written; there is no update path.

use kontor_core::KontorError;
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::models::StoredMessage;

/// Insert a message.
pub async fn insert_message(db: &Database, msg: &StoredMessage) -> Result<(), KontorError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (id, conversation_id, role, content, metadata, model, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    msg.id,
                    msg.conversation_id,
                    msg.role,
                    msg.content,
                    msg.metadata,
                    msg.model,
                    msg.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The time-boxed history window for context assembly: messages newer than
/// `since_iso`, capped at the `limit` most recent, returned oldest first.
/// Assistant messages with empty content are filtered out.
pub async fn history_window(
    db: &Database,
    conversation_id: &str,
    since_iso: &str,
    limit: usize,
) -> Result<Vec<StoredMessage>, KontorError> {
    let conversation_id = conversation_id.to_string();
    let since_iso = since_iso.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, role, content, metadata, model, created_at
                 FROM messages
                 WHERE conversation_id = ?1 AND created_at >= ?2
                   AND NOT (role = 'assistant' AND content = '')
                 ORDER BY created_at DESC LIMIT ?3",
            )?;
            let rows = stmt.query_map(params![conversation_id, since_iso, limit as i64], map_row)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            // Fetched newest-first to apply the cap; flip to chronological.
            messages.reverse();
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

/// All messages of a conversation in chronological order. Audit/export use.
pub async fn get_messages(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<StoredMessage>, KontorError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, role, content, metadata, model, created_at
                 FROM messages WHERE conversation_id = ?1 ORDER BY created_at ASC",
            )?;
            let rows = stmt.query_map(params![conversation_id], map_row)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredMessage> {
    Ok(StoredMessage {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        role: row.get(2)?,
        content: row.get(3)?,
        metadata: row.get(4)?,
        model: row.get(5)?,
        created_at: row.get(6)?,
    })
}
