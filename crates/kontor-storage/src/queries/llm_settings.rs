// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-tenant LLM settings.
//!
//! Absence of a row means the tenant has not configured an LLM backend;
//! callers translate that into the `no_llm_configured` error code.

use std::str::FromStr;

use kontor_core::{KontorError, ProviderKind, now_iso};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::LlmSettings;

pub async fn get_llm_settings(
    db: &Database,
    company_id: &str,
) -> Result<Option<LlmSettings>, KontorError> {
    let company_id = company_id.to_string();
    db.connection()
        .call(move |conn| {
            let settings = conn
                .query_row(
                    "SELECT company_id, provider, model, base_url, credential_id, max_tokens
                     FROM llm_settings WHERE company_id = ?1",
                    params![company_id],
                    |row| {
                        let provider: String = row.get(1)?;
                        Ok(LlmSettings {
                            company_id: row.get(0)?,
                            provider: ProviderKind::from_str(&provider)
                                .unwrap_or(ProviderKind::OpenAiCompatible),
                            model: row.get(2)?,
                            base_url: row.get(3)?,
                            credential_id: row.get(4)?,
                            max_tokens: row.get::<_, i64>(5)? as u32,
                        })
                    },
                )
                .optional()?;
            Ok(settings)
        })
        .await
        .map_err(map_tr_err)
}

/// Insert or replace the tenant's LLM settings. Operator/admin surface.
pub async fn upsert_llm_settings(db: &Database, settings: &LlmSettings) -> Result<(), KontorError> {
    let s = settings.clone();
    let now = now_iso();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO llm_settings (company_id, provider, model, base_url, credential_id, max_tokens, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(company_id) DO UPDATE SET
                     provider = excluded.provider,
                     model = excluded.model,
                     base_url = excluded.base_url,
                     credential_id = excluded.credential_id,
                     max_tokens = excluded.max_tokens,
                     updated_at = excluded.updated_at",
                params![
                    s.company_id,
                    s.provider.to_string(),
                    s.model,
                    s.base_url,
                    s.credential_id,
                    s.max_tokens as i64,
                    now,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absent_row_is_none() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(get_llm_settings(&db, "co-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_then_get() {
        let db = Database::open_in_memory().await.unwrap();
        let settings = LlmSettings {
            company_id: "co-1".to_string(),
            provider: ProviderKind::Anthropic,
            model: "claude-sonnet-4-5".to_string(),
            base_url: None,
            credential_id: Some("cred-1".to_string()),
            max_tokens: 4096,
        };
        upsert_llm_settings(&db, &settings).await.unwrap();

        let found = get_llm_settings(&db, "co-1").await.unwrap().unwrap();
        assert_eq!(found, settings);

        // Replacing the provider keeps one row per tenant.
        let mut changed = settings.clone();
        changed.provider = ProviderKind::Local;
        changed.base_url = Some("http://localhost:11434/v1".to_string());
        changed.credential_id = None;
        upsert_llm_settings(&db, &changed).await.unwrap();

        let found = get_llm_settings(&db, "co-1").await.unwrap().unwrap();
        assert_eq!(found.provider, ProviderKind::Local);
        assert!(found.credential_id.is_none());
    }
}
