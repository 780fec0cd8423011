// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge store operations.
//!
//! Entries are written by the offline extractor (and admin tooling); the
//! orchestrator only retrieves them by embedding similarity and bumps
//! `last_accessed_at`. The per-tenant cap is enforced on insert by
//! evicting least-recently-accessed entries, so a tenant's store stays
//! bounded no matter how long the extractor runs.

use kontor_core::{KontorError, now_iso};
use rusqlite::{params, params_from_iter};

use crate::database::{Database, map_tr_err};
use crate::models::{KnowledgeEntry, blob_to_vec, vec_to_blob};

/// Insert an entry, evicting least-recently-accessed entries of the same
/// tenant while the store is at or over `max_entries`.
pub async fn insert_entry(
    db: &Database,
    entry: &KnowledgeEntry,
    max_entries: usize,
) -> Result<(), KontorError> {
    let e = entry.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let count: i64 = tx.query_row(
                "SELECT COUNT(*) FROM knowledge_entries WHERE company_id = ?1",
                params![e.company_id],
                |row| row.get(0),
            )?;
            let over = (count + 1).saturating_sub(max_entries as i64);
            if over > 0 {
                tx.execute(
                    "DELETE FROM knowledge_entries WHERE id IN (
                         SELECT id FROM knowledge_entries WHERE company_id = ?1
                         ORDER BY last_accessed_at ASC LIMIT ?2)",
                    params![e.company_id, over],
                )?;
            }
            tx.execute(
                "INSERT INTO knowledge_entries
                 (id, company_id, user_id, title, content, category, embedding,
                  last_accessed_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    e.id,
                    e.company_id,
                    e.user_id,
                    e.title,
                    e.content,
                    e.category,
                    vec_to_blob(&e.embedding),
                    e.last_accessed_at,
                    e.created_at,
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Entries of the tenant ranked by cosine similarity to `query_embedding`,
/// floored at `similarity_floor`, capped at `top_k`, best first.
pub async fn similar_entries(
    db: &Database,
    company_id: &str,
    query_embedding: &[f32],
    similarity_floor: f32,
    top_k: usize,
) -> Result<Vec<(KnowledgeEntry, f32)>, KontorError> {
    let company_id = company_id.to_string();
    let query = query_embedding.to_vec();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, company_id, user_id, title, content, category, embedding,
                        last_accessed_at, created_at
                 FROM knowledge_entries WHERE company_id = ?1",
            )?;
            let rows = stmt.query_map(params![company_id], |row| {
                let blob: Vec<u8> = row.get(6)?;
                Ok(KnowledgeEntry {
                    id: row.get(0)?,
                    company_id: row.get(1)?,
                    user_id: row.get(2)?,
                    title: row.get(3)?,
                    content: row.get(4)?,
                    category: row.get(5)?,
                    embedding: blob_to_vec(&blob),
                    last_accessed_at: row.get(7)?,
                    created_at: row.get(8)?,
                })
            })?;

            let mut scored = Vec::new();
            for row in rows {
                let entry = row?;
                let score = cosine_similarity(&query, &entry.embedding);
                if score >= similarity_floor {
                    scored.push((entry, score));
                }
            }
            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            scored.truncate(top_k);
            Ok(scored)
        })
        .await
        .map_err(map_tr_err)
}

/// Best-effort access-time bump for retrieved entries.
pub async fn touch_entries(db: &Database, ids: &[String]) -> Result<(), KontorError> {
    if ids.is_empty() {
        return Ok(());
    }
    let ids = ids.to_vec();
    let now = now_iso();
    db.connection()
        .call(move |conn| {
            let placeholders = vec!["?"; ids.len()].join(",");
            let sql = format!(
                "UPDATE knowledge_entries SET last_accessed_at = ? WHERE id IN ({placeholders})"
            );
            conn.execute(&sql, params_from_iter(std::iter::once(&now).chain(ids.iter())))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_entry(company: &str, title: &str, embedding: Vec<f32>) -> KnowledgeEntry {
        KnowledgeEntry::new(company, title, format!("{title} content"), embedding)
    }

    #[tokio::test]
    async fn similarity_ranking_with_floor() {
        let db = Database::open_in_memory().await.unwrap();
        insert_entry(&db, &make_entry("co-1", "exact", vec![1.0, 0.0, 0.0]), 100)
            .await
            .unwrap();
        insert_entry(&db, &make_entry("co-1", "close", vec![0.9, 0.1, 0.0]), 100)
            .await
            .unwrap();
        insert_entry(&db, &make_entry("co-1", "orthogonal", vec![0.0, 1.0, 0.0]), 100)
            .await
            .unwrap();

        let hits = similar_entries(&db, "co-1", &[1.0, 0.0, 0.0], 0.35, 5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0.title, "exact");
        assert!(hits[0].1 > hits[1].1);
        assert_eq!(hits[1].0.title, "close");
    }

    #[tokio::test]
    async fn top_k_truncates() {
        let db = Database::open_in_memory().await.unwrap();
        for i in 0..5 {
            insert_entry(&db, &make_entry("co-1", &format!("e{i}"), vec![1.0, 0.0]), 100)
                .await
                .unwrap();
        }
        let hits = similar_entries(&db, "co-1", &[1.0, 0.0], 0.0, 3).await.unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[tokio::test]
    async fn retrieval_is_tenant_scoped() {
        let db = Database::open_in_memory().await.unwrap();
        insert_entry(&db, &make_entry("co-1", "mine", vec![1.0, 0.0]), 100)
            .await
            .unwrap();
        insert_entry(&db, &make_entry("co-2", "theirs", vec![1.0, 0.0]), 100)
            .await
            .unwrap();

        let hits = similar_entries(&db, "co-1", &[1.0, 0.0], 0.0, 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.title, "mine");
    }

    #[tokio::test]
    async fn cap_evicts_least_recently_accessed() {
        let db = Database::open_in_memory().await.unwrap();
        let mut stale = make_entry("co-1", "stale", vec![1.0]);
        stale.last_accessed_at = "2026-01-01T00:00:00.000Z".to_string();
        insert_entry(&db, &stale, 2).await.unwrap();
        let mut fresh = make_entry("co-1", "fresh", vec![1.0]);
        fresh.last_accessed_at = "2026-06-01T00:00:00.000Z".to_string();
        insert_entry(&db, &fresh, 2).await.unwrap();

        insert_entry(&db, &make_entry("co-1", "newest", vec![1.0]), 2).await.unwrap();

        let hits = similar_entries(&db, "co-1", &[1.0], 0.0, 10).await.unwrap();
        let titles: Vec<&str> = hits.iter().map(|(e, _)| e.title.as_str()).collect();
        assert_eq!(hits.len(), 2);
        assert!(titles.contains(&"fresh"));
        assert!(titles.contains(&"newest"));
        assert!(!titles.contains(&"stale"));
    }

    #[tokio::test]
    async fn touch_bumps_access_time() {
        let db = Database::open_in_memory().await.unwrap();
        let mut e = make_entry("co-1", "entry", vec![1.0]);
        e.last_accessed_at = "2026-01-01T00:00:00.000Z".to_string();
        insert_entry(&db, &e, 100).await.unwrap();

        touch_entries(&db, &[e.id.clone()]).await.unwrap();
        let hits = similar_entries(&db, "co-1", &[1.0], 0.0, 10).await.unwrap();
        assert!(hits[0].0.last_accessed_at.as_str() > "2026-01-01T00:00:00.000Z");
    }

    #[test]
    fn cosine_edge_cases() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }
}
