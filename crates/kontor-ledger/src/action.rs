// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only ledger of executed tool calls.
//!
//! One row per executed non-search call (one aggregate row for bulk
//! operations). Rows are write-once: there is no update or delete path.
//! The rolling duplicate-action check reads the same table through the
//! `(user_id, dedupe_key, created_at)` index.

use kontor_core::{KontorError, new_id, now_iso};
use kontor_storage::Database;
use kontor_storage::database::map_tr_err;
use rusqlite::{OptionalExtension, params};
use serde_json::Value;
use tracing::info;

/// One executed action as recorded for audit and duplicate suppression.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRecord {
    pub id: String,
    pub conversation_id: String,
    pub user_id: String,
    pub company_id: String,
    pub tool_name: String,
    pub arguments: Value,
    pub result: Value,
    pub success: bool,
    pub error_message: Option<String>,
    /// Human-readable one-liner, e.g. "Created contact Amanda Lopez".
    pub summary: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub dedupe_key: Option<String>,
    pub created_at: String,
}

impl ActionRecord {
    pub fn new(
        conversation_id: impl Into<String>,
        user_id: impl Into<String>,
        company_id: impl Into<String>,
        tool_name: impl Into<String>,
        arguments: Value,
        result: Value,
        success: bool,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            conversation_id: conversation_id.into(),
            user_id: user_id.into(),
            company_id: company_id.into(),
            tool_name: tool_name.into(),
            arguments,
            result,
            success,
            error_message: None,
            summary: summary.into(),
            entity_type: None,
            entity_id: None,
            dedupe_key: None,
            created_at: now_iso(),
        }
    }
}

/// Ledger handle. Cheap to clone; shares the workspace database.
#[derive(Clone)]
pub struct ActionLedger {
    db: Database,
}

impl ActionLedger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Append one action row.
    pub async fn record(&self, record: &ActionRecord) -> Result<(), KontorError> {
        let r = record.clone();
        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO actions
                     (id, conversation_id, user_id, company_id, tool_name, arguments, result,
                      success, error_message, summary, entity_type, entity_id, dedupe_key, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                    params![
                        r.id,
                        r.conversation_id,
                        r.user_id,
                        r.company_id,
                        r.tool_name,
                        r.arguments.to_string(),
                        r.result.to_string(),
                        r.success,
                        r.error_message,
                        r.summary,
                        r.entity_type,
                        r.entity_id,
                        r.dedupe_key,
                        r.created_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;

        info!(
            tool = %record.tool_name,
            success = record.success,
            company_id = %record.company_id,
            "action recorded"
        );
        Ok(())
    }

    /// Most recent successful action of this user with the given dedupe key
    /// inside the rolling window, if any. A hit short-circuits execution.
    pub async fn find_duplicate(
        &self,
        user_id: &str,
        dedupe_key: &str,
        window_secs: u64,
    ) -> Result<Option<ActionRecord>, KontorError> {
        let user_id = user_id.to_string();
        let dedupe_key = dedupe_key.to_string();
        let cutoff = (chrono::Utc::now() - chrono::Duration::seconds(window_secs as i64))
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string();
        self.db
            .connection()
            .call(move |conn| {
                let row = conn
                    .query_row(
                        &format!(
                            "SELECT {COLUMNS} FROM actions
                             WHERE user_id = ?1 AND dedupe_key = ?2 AND success = 1
                               AND created_at >= ?3
                             ORDER BY created_at DESC LIMIT 1"
                        ),
                        params![user_id, dedupe_key, cutoff],
                        map_row,
                    )
                    .optional()?;
                Ok(row)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Latest actions of a tenant, newest first. Audit surface.
    pub async fn recent_actions(
        &self,
        company_id: &str,
        limit: usize,
    ) -> Result<Vec<ActionRecord>, KontorError> {
        let company_id = company_id.to_string();
        self.db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {COLUMNS} FROM actions WHERE company_id = ?1
                     ORDER BY created_at DESC LIMIT ?2"
                ))?;
                let rows = stmt.query_map(params![company_id, limit as i64], map_row)?;
                let mut actions = Vec::new();
                for row in rows {
                    actions.push(row?);
                }
                Ok(actions)
            })
            .await
            .map_err(map_tr_err)
    }
}

const COLUMNS: &str = "id, conversation_id, user_id, company_id, tool_name, arguments, result, \
                       success, error_message, summary, entity_type, entity_id, dedupe_key, \
                       created_at";

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ActionRecord> {
    let arguments: String = row.get(5)?;
    let result: String = row.get(6)?;
    Ok(ActionRecord {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        user_id: row.get(2)?,
        company_id: row.get(3)?,
        tool_name: row.get(4)?,
        arguments: serde_json::from_str(&arguments).unwrap_or(Value::Null),
        result: serde_json::from_str(&result).unwrap_or(Value::Null),
        success: row.get(7)?,
        error_message: row.get(8)?,
        summary: row.get(9)?,
        entity_type: row.get(10)?,
        entity_id: row.get(11)?,
        dedupe_key: row.get(12)?,
        created_at: row.get(13)?,
    })
}
