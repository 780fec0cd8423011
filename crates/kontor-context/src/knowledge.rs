// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge retrieval for the system prompt.
//!
//! Embeds the current user message against an OpenAI-compatible
//! `/embeddings` endpoint and ranks the tenant's knowledge entries by
//! cosine similarity. Embedding failures degrade to an empty block so
//! the turn proceeds without knowledge context.

use std::time::Duration;

use kontor_config::model::KnowledgeConfig;
use kontor_core::{KontorError, RequestContext};
use kontor_storage::Database;
use kontor_storage::queries::knowledge as q;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

/// Client for the embeddings endpoint. The base URL comes straight from
/// `knowledge.embeddings_base_url`; tests point it at a mock server.
#[derive(Debug, Clone)]
pub struct EmbeddingsClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

impl EmbeddingsClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<SecretString>,
    ) -> Result<Self, KontorError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| KontorError::Provider {
                kind: kontor_core::ProviderErrorKind::Other,
                message: format!("failed to build embeddings client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            model: model.into(),
            api_key,
        })
    }

    /// Embeds one text. Returns the raw vector; dimensionality is
    /// whatever the configured model produces.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, KontorError> {
        let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
        let mut req = self
            .http
            .post(&url)
            .json(&json!({ "model": self.model, "input": text }));
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key.expose_secret());
        }

        let response = req.send().await.map_err(|e| KontorError::Provider {
            kind: kontor_core::ProviderErrorKind::Other,
            message: format!("embeddings request failed: {e}"),
            source: Some(Box::new(e)),
        })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KontorError::from_provider_status(status.as_u16(), body));
        }

        let parsed: EmbeddingsResponse =
            response.json().await.map_err(|e| KontorError::Provider {
                kind: kontor_core::ProviderErrorKind::Other,
                message: format!("failed to parse embeddings response: {e}"),
                source: Some(Box::new(e)),
            })?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|row| row.embedding)
            .ok_or_else(|| KontorError::Provider {
                kind: kontor_core::ProviderErrorKind::Other,
                message: "embeddings response contained no vectors".to_string(),
                source: None,
            })
    }
}

/// Retrieved knowledge rendered for the prompt, plus the entry ids for
/// the access-time bump.
#[derive(Debug, Default)]
pub struct KnowledgeBlock {
    pub text: String,
    pub entry_ids: Vec<String>,
}

impl KnowledgeBlock {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Top-k knowledge entries for the current message. A `None` client or a
/// failed embedding yields an empty block; storage faults still surface.
pub async fn retrieve(
    db: &Database,
    ctx: &RequestContext,
    config: &KnowledgeConfig,
    client: Option<&EmbeddingsClient>,
    message: &str,
) -> Result<KnowledgeBlock, KontorError> {
    let Some(client) = client else {
        return Ok(KnowledgeBlock::default());
    };

    let query_embedding = match client.embed(message).await {
        Ok(vector) => vector,
        Err(error) => {
            warn!(%error, "embedding failed; continuing without knowledge context");
            return Ok(KnowledgeBlock::default());
        }
    };

    let top_k = config.top_k.clamp(3, 10);
    let scored = q::similar_entries(
        db,
        &ctx.company_id,
        &query_embedding,
        config.similarity_floor,
        top_k,
    )
    .await?;
    if scored.is_empty() {
        return Ok(KnowledgeBlock::default());
    }

    let mut text = String::new();
    let mut entry_ids = Vec::with_capacity(scored.len());
    for (entry, score) in &scored {
        debug!(entry_id = %entry.id, score, "knowledge entry retrieved");
        text.push_str(&format!("- {}: {}\n", entry.title, entry.content));
        entry_ids.push(entry.id.clone());
    }

    if let Err(error) = q::touch_entries(db, &entry_ids).await {
        warn!(%error, "failed to bump knowledge access times");
    }

    Ok(KnowledgeBlock { text, entry_ids })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kontor_storage::KnowledgeEntry;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ctx() -> RequestContext {
        RequestContext {
            company_id: "co-1".to_string(),
            user_id: "user-1".to_string(),
            ..Default::default()
        }
    }

    fn entry(id: &str, title: &str, embedding: Vec<f32>) -> KnowledgeEntry {
        KnowledgeEntry {
            id: id.to_string(),
            company_id: "co-1".to_string(),
            user_id: None,
            title: title.to_string(),
            content: format!("{title} details"),
            category: None,
            embedding,
            last_accessed_at: kontor_core::now_iso(),
            created_at: kontor_core::now_iso(),
        }
    }

    #[tokio::test]
    async fn no_client_means_no_knowledge() {
        let db = Database::open_in_memory().await.unwrap();
        let block = retrieve(&db, &ctx(), &KnowledgeConfig::default(), None, "hello")
            .await
            .unwrap();
        assert!(block.is_empty());
    }

    #[tokio::test]
    async fn embedding_failure_degrades_gracefully() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let db = Database::open_in_memory().await.unwrap();
        let client =
            EmbeddingsClient::new(server.uri(), "text-embedding-3-small", None).unwrap();
        let block = retrieve(&db, &ctx(), &KnowledgeConfig::default(), Some(&client), "hello")
            .await
            .unwrap();
        assert!(block.is_empty());
    }

    #[tokio::test]
    async fn retrieves_similar_entries_and_bumps_access() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"embedding": [1.0, 0.0]}]
            })))
            .mount(&server)
            .await;

        let db = Database::open_in_memory().await.unwrap();
        q::insert_entry(&db, &entry("k-close", "Billing policy", vec![0.9, 0.1]), 100)
            .await
            .unwrap();
        q::insert_entry(&db, &entry("k-far", "Unrelated", vec![0.0, 1.0]), 100)
            .await
            .unwrap();

        let client =
            EmbeddingsClient::new(server.uri(), "text-embedding-3-small", None).unwrap();
        let block = retrieve(&db, &ctx(), &KnowledgeConfig::default(), Some(&client), "billing")
            .await
            .unwrap();
        assert!(block.text.contains("Billing policy"));
        assert!(!block.text.contains("Unrelated"));
        assert_eq!(block.entry_ids, vec!["k-close".to_string()]);
    }
}
