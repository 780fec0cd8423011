// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the assistant
//! endpoint. Shutdown is cooperative: the server drains in-flight
//! requests once the supplied cancellation token fires.

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use kontor_agent::Orchestrator;
use kontor_config::model::ServerConfig;
use kontor_core::KontorError;
use kontor_providers::ProviderClient;
use kontor_storage::Database;
use kontor_vault::CredentialVault;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::handlers;
use crate::limit::RateLimiter;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Tenant database.
    pub db: Database,
    /// The turn engine, shared across requests.
    pub orchestrator: Arc<Orchestrator>,
    /// Sealed credential store for provider API keys.
    pub vault: CredentialVault,
    /// Shared HTTP client for provider calls.
    pub http: ProviderClient,
    /// Per-client request limiter.
    pub limiter: Arc<RateLimiter>,
}

/// Build the gateway router. An empty origin list allows any origin.
pub fn build_router(state: GatewayState, cors_allowed_origins: &[String]) -> Router {
    let cors = if cors_allowed_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = cors_allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = origin.as_str(), "skipping unparseable CORS origin");
                    None
                }
            })
            .collect();
        CorsLayer::new().allow_origin(AllowOrigin::list(origins))
    };

    let public_routes = Router::new().route("/healthz", get(handlers::get_healthz));

    let api_routes = Router::new()
        .route("/v1/assistant/chat", post(handlers::post_chat))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
///
/// Binds to the configured host:port and serves until the cancellation
/// token fires, then finishes open requests and returns.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), KontorError> {
    let app = build_router(state, &config.cors_allowed_origins);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| KontorError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| KontorError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}
