// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Usage log: one row per completed turn with non-empty final content.
//!
//! Character counts stand in for token counts because provider usage
//! reporting differs per backend; the billing job downstream normalizes.

use kontor_core::{KontorError, new_id, now_iso};
use kontor_storage::Database;
use kontor_storage::database::map_tr_err;
use rusqlite::params;

/// One completed turn's usage.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageRecord {
    pub id: String,
    pub conversation_id: String,
    pub user_id: String,
    pub company_id: String,
    pub provider: String,
    pub model: String,
    pub input_chars: u64,
    pub output_chars: u64,
    pub tool_calls: u32,
    pub created_at: String,
}

impl UsageRecord {
    pub fn new(
        conversation_id: impl Into<String>,
        user_id: impl Into<String>,
        company_id: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            conversation_id: conversation_id.into(),
            user_id: user_id.into(),
            company_id: company_id.into(),
            provider: provider.into(),
            model: model.into(),
            input_chars: 0,
            output_chars: 0,
            tool_calls: 0,
            created_at: now_iso(),
        }
    }
}

/// Aggregate per-tenant usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UsageTotals {
    pub turns: i64,
    pub input_chars: i64,
    pub output_chars: i64,
    pub tool_calls: i64,
}

/// Append one usage row.
pub async fn record_usage(db: &Database, record: &UsageRecord) -> Result<(), KontorError> {
    let r = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO usage_log
                 (id, conversation_id, user_id, company_id, provider, model,
                  input_chars, output_chars, tool_calls, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    r.id,
                    r.conversation_id,
                    r.user_id,
                    r.company_id,
                    r.provider,
                    r.model,
                    r.input_chars as i64,
                    r.output_chars as i64,
                    r.tool_calls as i64,
                    r.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Tenant-wide usage totals.
pub async fn usage_totals(db: &Database, company_id: &str) -> Result<UsageTotals, KontorError> {
    let company_id = company_id.to_string();
    db.connection()
        .call(move |conn| {
            let totals = conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(input_chars), 0),
                        COALESCE(SUM(output_chars), 0),
                        COALESCE(SUM(tool_calls), 0)
                 FROM usage_log WHERE company_id = ?1",
                params![company_id],
                |row| {
                    Ok(UsageTotals {
                        turns: row.get(0)?,
                        input_chars: row.get(1)?,
                        output_chars: row.get(2)?,
                        tool_calls: row.get(3)?,
                    })
                },
            )?;
            Ok(totals)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_usage(company: &str, input: u64, output: u64, tools: u32) -> UsageRecord {
        let mut r = UsageRecord::new("conv-1", "user-1", company, "anthropic", "claude-sonnet-4-5");
        r.input_chars = input;
        r.output_chars = output;
        r.tool_calls = tools;
        r
    }

    #[tokio::test]
    async fn totals_sum_per_tenant() {
        let db = Database::open_in_memory().await.unwrap();
        record_usage(&db, &sample_usage("co-1", 100, 50, 2)).await.unwrap();
        record_usage(&db, &sample_usage("co-1", 200, 75, 0)).await.unwrap();
        record_usage(&db, &sample_usage("co-2", 999, 999, 9)).await.unwrap();

        let totals = usage_totals(&db, "co-1").await.unwrap();
        assert_eq!(totals.turns, 2);
        assert_eq!(totals.input_chars, 300);
        assert_eq!(totals.output_chars, 125);
        assert_eq!(totals.tool_calls, 2);
    }

    #[tokio::test]
    async fn empty_tenant_totals_are_zero() {
        let db = Database::open_in_memory().await.unwrap();
        let totals = usage_totals(&db, "co-none").await.unwrap();
        assert_eq!(totals, UsageTotals::default());
    }
}
