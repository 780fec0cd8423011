// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context assembly for Kontor turns.
//!
//! Three bounded sources feed the prompt: the per-tenant business
//! [`snapshot`], the recent conversation history, and retrieved
//! [`knowledge`] entries. They are independent reads and fetched
//! concurrently; the result is one system prompt plus the history
//! window as transcript messages.

pub mod knowledge;
pub mod prompt;
pub mod snapshot;

use chrono::{Duration, Utc};
use kontor_config::model::{AgentConfig, KnowledgeConfig};
use kontor_core::{KontorError, RequestContext, TranscriptMessage};
use kontor_storage::Database;
use kontor_storage::queries::messages;
use tracing::debug;

pub use knowledge::{EmbeddingsClient, KnowledgeBlock};
pub use prompt::{TRUST_BOUNDARY, build_system_prompt};
pub use snapshot::business_snapshot;

/// Everything the orchestrator needs from context assembly.
#[derive(Debug)]
pub struct AssembledContext {
    pub system_prompt: String,
    /// Oldest-first history window, already filtered and capped.
    pub history: Vec<TranscriptMessage>,
    /// Ids of the retrieved knowledge entries, for observability.
    pub knowledge_entry_ids: Vec<String>,
}

/// Assembles per-turn context from storage and the embeddings endpoint.
#[derive(Clone)]
pub struct ContextAssembler {
    db: Database,
    agent: AgentConfig,
    knowledge: KnowledgeConfig,
    embeddings: Option<EmbeddingsClient>,
}

impl ContextAssembler {
    pub fn new(
        db: Database,
        agent: AgentConfig,
        knowledge: KnowledgeConfig,
        embeddings: Option<EmbeddingsClient>,
    ) -> Self {
        Self {
            db,
            agent,
            knowledge,
            embeddings,
        }
    }

    /// Fetches snapshot, history and knowledge concurrently and renders
    /// the system prompt.
    pub async fn assemble(
        &self,
        ctx: &RequestContext,
        message: &str,
    ) -> Result<AssembledContext, KontorError> {
        let since = (Utc::now() - Duration::seconds(self.agent.history_window_secs as i64))
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string();

        let (snapshot, history, knowledge) = tokio::join!(
            snapshot::business_snapshot(&self.db, ctx, self.agent.snapshot_rows),
            messages::history_window(
                &self.db,
                &ctx.conversation_id,
                &since,
                self.agent.history_max_messages,
            ),
            knowledge::retrieve(
                &self.db,
                ctx,
                &self.knowledge,
                self.embeddings.as_ref(),
                message,
            ),
        );
        let snapshot = snapshot?;
        let stored = history?;
        let knowledge = knowledge?;

        let history: Vec<TranscriptMessage> = stored
            .iter()
            .filter_map(|m| match m.role.as_str() {
                "user" => Some(TranscriptMessage::user(&m.content)),
                "assistant" => Some(TranscriptMessage::assistant(&m.content)),
                _ => None,
            })
            .collect();

        debug!(
            history_len = history.len(),
            knowledge_entries = knowledge.entry_ids.len(),
            "context assembled"
        );

        let system_prompt = prompt::build_system_prompt(
            ctx,
            &Utc::now().format("%Y-%m-%d %H:%M").to_string(),
            &snapshot,
            &knowledge.text,
            self.agent.learning_enabled,
        );

        Ok(AssembledContext {
            system_prompt,
            history,
            knowledge_entry_ids: knowledge.entry_ids,
        })
    }
}
