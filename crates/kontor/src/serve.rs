// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `kontor serve` command implementation.
//!
//! Wires up the full pipeline: SQLite storage with migrations, the
//! credential vault, optional knowledge embeddings, the turn
//! orchestrator, and the HTTP/SSE gateway. Runs until SIGINT/SIGTERM,
//! then drains in-flight requests.

use std::sync::Arc;

use kontor_agent::Orchestrator;
use kontor_config::model::{KnowledgeConfig, KontorConfig};
use kontor_context::{ContextAssembler, EmbeddingsClient};
use kontor_core::KontorError;
use kontor_gateway::{GatewayState, RateLimiter, start_server};
use kontor_guard::KeywordIntentClassifier;
use kontor_ledger::ActionLedger;
use kontor_providers::ProviderClient;
use kontor_storage::Database;
use kontor_tools::{ToolExecutor, ToolRegistry};
use kontor_vault::{CredentialVault, resolve_master_key};
use tracing::{info, warn};

use crate::shutdown;

/// Runs the `kontor serve` command.
pub async fn run_serve(config: KontorConfig) -> Result<(), KontorError> {
    init_tracing(&config.agent.log_level);

    info!("starting kontor serve");

    let db = Database::open(&config.storage).await?;

    // Fail fast when no master key is configured: the chat endpoint
    // cannot resolve provider credentials without it.
    let master_key = resolve_master_key(&config.vault)?;
    let vault = CredentialVault::new(master_key, db.clone());

    let embeddings = build_embeddings(&config.knowledge, &vault).await?;

    let agent = config.agent.clone();
    let assembler = ContextAssembler::new(
        db.clone(),
        agent.clone(),
        config.knowledge.clone(),
        embeddings,
    );
    let orchestrator = Orchestrator::new(
        assembler,
        ToolRegistry::new(),
        ToolExecutor::new(db.clone()),
        ActionLedger::new(db.clone()),
        db.clone(),
        Box::new(KeywordIntentClassifier::new()),
        agent,
    );

    let state = GatewayState {
        db,
        orchestrator: Arc::new(orchestrator),
        vault,
        http: ProviderClient::new()?,
        limiter: Arc::new(RateLimiter::new(&config.rate_limit)),
    };

    let cancel = shutdown::install_signal_handler();
    start_server(&config.server, state, cancel).await?;

    info!("kontor serve shutdown complete");
    Ok(())
}

/// Builds the embeddings client when an endpoint is configured. A
/// missing credential row downgrades to no retrieval rather than
/// refusing to start.
async fn build_embeddings(
    knowledge: &KnowledgeConfig,
    vault: &CredentialVault,
) -> Result<Option<EmbeddingsClient>, KontorError> {
    let Some(base_url) = &knowledge.embeddings_base_url else {
        info!("no embeddings endpoint configured; knowledge retrieval disabled");
        return Ok(None);
    };

    let api_key = match &knowledge.embeddings_credential_id {
        Some(credential_id) => match vault.resolve(credential_id).await? {
            Some(secret) => Some(secret),
            None => {
                warn!(
                    credential_id = credential_id.as_str(),
                    "embeddings credential not found; knowledge retrieval disabled"
                );
                return Ok(None);
            }
        },
        None => None,
    };

    let client = EmbeddingsClient::new(base_url, &knowledge.embeddings_model, api_key)?;
    info!(
        base_url = base_url.as_str(),
        model = knowledge.embeddings_model.as_str(),
        "knowledge retrieval enabled"
    );
    Ok(Some(client))
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("KONTOR_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("kontor={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
