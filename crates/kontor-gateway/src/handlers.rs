// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers.
//!
//! `POST /v1/assistant/chat` runs the whole pre-turn gauntlet inline
//! (rate limit, body validation, LLM settings, credential resolution,
//! conversation bootstrap) and answers with a non-streamed JSON error if
//! any station fails. Only a request that clears all of them gets an SSE
//! response; the turn itself runs in a spawned task feeding the stream.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use kontor_agent::derive_title;
use kontor_core::{Industry, KontorError, Language, ProviderErrorKind, RequestContext, new_id};
use kontor_guard::sanitize_message;
use kontor_providers::{LiveBackend, ProviderConfig};
use kontor_storage::Conversation;
use kontor_storage::queries::{conversations, llm_settings};
use kontor_tools::localized;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::server::GatewayState;
use crate::sse::{ChunkEnvelope, chat_stream};

/// Request body for `POST /v1/assistant/chat`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub conversation_id: Option<String>,
    pub message: String,
    pub user_id: String,
    pub company_id: String,
    #[serde(default)]
    pub user_language: Option<String>,
    #[serde(default)]
    pub user_timezone: Option<String>,
    #[serde(default)]
    pub user_currency: Option<String>,
    #[serde(default)]
    pub user_industry: Option<String>,
    #[serde(default)]
    pub user_role: Option<String>,
}

/// Non-streamed error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: error.into(),
        }),
    )
        .into_response()
}

/// Client key for rate limiting: first hop of `x-forwarded-for`, then
/// `x-real-ip`, then a shared local bucket.
fn client_key(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        return real_ip.trim().to_string();
    }
    "local".to_string()
}

/// POST /v1/assistant/chat
pub async fn post_chat(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    if !state.limiter.check(&client_key(&headers)) {
        return error_response(StatusCode::TOO_MANY_REQUESTS, "rate_limited");
    }

    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    let input = match sanitize_message(&body.message) {
        Ok(input) => input,
        Err(error) => {
            return error_response(StatusCode::BAD_REQUEST, error.to_string());
        }
    };

    let settings = match llm_settings::get_llm_settings(&state.db, &body.company_id).await {
        Ok(Some(settings)) => settings,
        Ok(None) => {
            return error_response(StatusCode::BAD_REQUEST, "no_llm_configured");
        }
        Err(error) => {
            error!(%error, "failed to load llm settings");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error");
        }
    };

    let api_key = match &settings.credential_id {
        Some(credential_id) => match state.vault.resolve(credential_id).await {
            Ok(Some(secret)) => Some(secret),
            Ok(None) => {
                warn!(company_id = body.company_id.as_str(), "credential id resolves to nothing");
                return error_response(StatusCode::UNAUTHORIZED, "invalid_api_key");
            }
            Err(error) => {
                warn!(%error, "credential could not be unsealed");
                return error_response(StatusCode::UNAUTHORIZED, "invalid_api_key");
            }
        },
        None => None,
    };

    let conversation_id = match ensure_conversation(&state, &body, &input.text).await {
        Ok(id) => id,
        Err(error) => {
            error!(%error, "failed to bootstrap conversation");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error");
        }
    };

    let industry_label = body
        .user_industry
        .clone()
        .unwrap_or_else(|| "general".to_string());
    let ctx = RequestContext {
        conversation_id: conversation_id.clone(),
        user_id: body.user_id.clone(),
        company_id: body.company_id.clone(),
        language: body
            .user_language
            .as_deref()
            .map(Language::from_tag)
            .unwrap_or_default(),
        timezone: body
            .user_timezone
            .clone()
            .unwrap_or_else(|| "UTC".to_string()),
        currency: body
            .user_currency
            .clone()
            .unwrap_or_else(|| "EUR".to_string()),
        industry: Industry::from_label(&industry_label),
        industry_label,
        elevated: body
            .user_role
            .as_deref()
            .is_some_and(|role| role.eq_ignore_ascii_case("admin")),
    };

    let backend = LiveBackend::new(
        ProviderConfig {
            kind: settings.provider,
            model: settings.model.clone(),
            base_url: settings.base_url.clone(),
            api_key,
            max_tokens: settings.max_tokens,
        },
        state.http.clone(),
    );

    let envelope = ChunkEnvelope::new(&settings.model);
    let (tx, rx) = mpsc::channel::<String>(64);
    let orchestrator = state.orchestrator.clone();
    let language = ctx.language;
    tokio::spawn(async move {
        match orchestrator.run_turn(&backend, &ctx, input, &tx).await {
            Ok(outcome) => {
                debug!(
                    conversation_id = %ctx.conversation_id,
                    tool_calls = outcome.tool_calls,
                    chars = outcome.content.chars().count(),
                    "turn finished"
                );
            }
            Err(error) => {
                error!(%error, conversation_id = %ctx.conversation_id, "turn failed");
                let _ = tx.send(friendly_error(language, &error)).await;
            }
        }
    });

    (
        [("x-conversation-id", conversation_id)],
        chat_stream(envelope, rx),
    )
        .into_response()
}

/// Loads the conversation named by the request, or creates one (with a
/// title derived from the first message) when it is missing or absent.
async fn ensure_conversation(
    state: &GatewayState,
    body: &ChatRequest,
    message: &str,
) -> Result<String, KontorError> {
    if let Some(id) = body
        .conversation_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
    {
        if conversations::get_conversation(&state.db, &body.company_id, id)
            .await?
            .is_some()
        {
            return Ok(id.to_string());
        }
        let conv = Conversation::new(id, &body.company_id, &body.user_id, derive_title(message));
        conversations::insert_conversation(&state.db, &conv).await?;
        return Ok(id.to_string());
    }
    let conv = Conversation::new(
        new_id(),
        &body.company_id,
        &body.user_id,
        derive_title(message),
    );
    conversations::insert_conversation(&state.db, &conv).await?;
    Ok(conv.id)
}

/// Turn-fatal errors become one plain-language line in the user's
/// language, sent as a final content delta.
fn friendly_error(language: Language, error: &KontorError) -> String {
    let line = match error {
        KontorError::AuthConfig { .. } => localized(
            language,
            "Your AI provider is not configured. Please check the assistant settings.",
            "Ihr KI-Anbieter ist nicht konfiguriert. Bitte prüfen Sie die Assistent-Einstellungen.",
        ),
        KontorError::Provider { kind, .. } => match kind {
            ProviderErrorKind::RateLimited => localized(
                language,
                "The AI provider is currently rate limiting requests. Please try again in a moment.",
                "Der KI-Anbieter begrenzt derzeit die Anfragen. Bitte versuchen Sie es gleich noch einmal.",
            ),
            ProviderErrorKind::PaymentRequired => localized(
                language,
                "The AI provider reports a billing problem with the configured account.",
                "Der KI-Anbieter meldet ein Abrechnungsproblem mit dem hinterlegten Konto.",
            ),
            ProviderErrorKind::Unauthorized => localized(
                language,
                "The AI provider rejected the configured API key.",
                "Der KI-Anbieter hat den hinterlegten API-Schlüssel abgelehnt.",
            ),
            ProviderErrorKind::Other => localized(
                language,
                "The AI provider returned an error. Please try again.",
                "Der KI-Anbieter hat einen Fehler zurückgegeben. Bitte versuchen Sie es erneut.",
            ),
        },
        _ => localized(
            language,
            "Something went wrong while processing your message. Please try again.",
            "Bei der Verarbeitung Ihrer Nachricht ist ein Fehler aufgetreten. Bitte versuchen Sie es erneut.",
        ),
    };
    format!("❌ {line}")
}

/// GET /healthz
pub async fn get_healthz() -> Response {
    Json(json!({"status": "ok"})).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kontor_core::AuthConfigCode;

    #[test]
    fn client_key_prefers_the_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "10.0.0.1".parse().unwrap());
        assert_eq!(client_key(&headers), "203.0.113.9");

        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "198.51.100.4".parse().unwrap());
        assert_eq!(client_key(&headers), "198.51.100.4");

        assert_eq!(client_key(&HeaderMap::new()), "local");
    }

    #[test]
    fn friendly_errors_are_localized() {
        let unauthorized = KontorError::Provider {
            kind: ProviderErrorKind::Unauthorized,
            message: "upstream returned 401".to_string(),
            source: None,
        };
        assert!(friendly_error(Language::En, &unauthorized).contains("rejected"));
        assert!(friendly_error(Language::De, &unauthorized).contains("abgelehnt"));

        let auth = KontorError::AuthConfig {
            code: AuthConfigCode::NoLlmConfigured,
        };
        assert!(friendly_error(Language::En, &auth).starts_with("❌"));
    }
}
