// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the chat endpoint.
//!
//! Each test builds an isolated gateway over an in-memory database and
//! drives it with `tower::ServiceExt::oneshot`. The provider side is a
//! wiremock server speaking the OpenAI-compatible SSE dialect.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use kontor_agent::Orchestrator;
use kontor_config::model::{AgentConfig, KnowledgeConfig, RateLimitConfig};
use kontor_context::ContextAssembler;
use kontor_core::ProviderKind;
use kontor_gateway::{GatewayState, RateLimiter, build_router};
use kontor_guard::KeywordIntentClassifier;
use kontor_ledger::ActionLedger;
use kontor_providers::ProviderClient;
use kontor_storage::queries::{llm_settings, messages};
use kontor_storage::{Database, LlmSettings};
use kontor_tools::{ToolExecutor, ToolRegistry};
use kontor_vault::CredentialVault;
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zeroize::Zeroizing;

async fn gateway(rate: RateLimitConfig) -> (Router, Database, CredentialVault) {
    let db = Database::open_in_memory().await.unwrap();
    let vault = CredentialVault::new(Zeroizing::new([7u8; 32]), db.clone());
    let agent = AgentConfig::default();
    let assembler = ContextAssembler::new(
        db.clone(),
        agent.clone(),
        KnowledgeConfig::default(),
        None,
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
        db: db.clone(),
        orchestrator: Arc::new(orchestrator),
        vault: vault.clone(),
        http: ProviderClient::new().unwrap(),
        limiter: Arc::new(RateLimiter::new(&rate)),
    };
    (build_router(state, &[]), db, vault)
}

async fn configure_provider(db: &Database, vault: &CredentialVault, base_url: &str) {
    let credential_id = vault
        .store("openai", &"sk-live-test".to_string().into())
        .await
        .unwrap();
    llm_settings::upsert_llm_settings(
        db,
        &LlmSettings {
            company_id: "co-1".to_string(),
            provider: ProviderKind::OpenAiCompatible,
            model: "gpt-test".to_string(),
            base_url: Some(base_url.to_string()),
            credential_id: Some(credential_id),
            max_tokens: 1024,
        },
    )
    .await
    .unwrap();
}

fn chat_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/assistant/chat")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// ---- Streaming happy path ----

#[tokio::test]
async fn chat_turn_streams_deltas_and_persists_the_transcript() {
    let provider = MockServer::start().await;
    let sse_body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\" from Kontor!\"},\"finish_reason\":null}]}\n\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}],\"usage\":{\"prompt_tokens\":12,\"completion_tokens\":4}}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-live-test"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse_body, "text/event-stream"))
        .mount(&provider)
        .await;

    let (router, db, vault) = gateway(RateLimitConfig::default()).await;
    configure_provider(&db, &vault, &provider.uri()).await;

    let response = router
        .oneshot(chat_request(json!({
            "message": "Hello!",
            "userId": "user-1",
            "companyId": "co-1",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let conversation_id = response
        .headers()
        .get("x-conversation-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap();

    let body = body_string(response).await;
    assert!(body.contains("Hello"), "missing delta in body: {body}");
    assert!(body.contains("data:"), "not an SSE body: {body}");
    assert!(body.contains("[DONE]"), "missing terminator: {body}");

    // The body completes only after the turn task finished, so the
    // transcript is already durable.
    let stored = messages::get_messages(&db, &conversation_id).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].role, "user");
    assert_eq!(stored[1].role, "assistant");
    assert_eq!(stored[1].content, "Hello from Kontor!");
    assert_eq!(stored[1].model.as_deref(), Some("gpt-test"));
}

// ---- Pre-stream failures answer with plain JSON ----

#[tokio::test]
async fn missing_llm_settings_is_a_400() {
    let (router, _db, _vault) = gateway(RateLimitConfig::default()).await;
    let response = router
        .oneshot(chat_request(json!({
            "message": "Hello!",
            "userId": "user-1",
            "companyId": "co-unconfigured",
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response).await.contains("no_llm_configured"));
}

#[tokio::test]
async fn unknown_credential_is_a_401() {
    let (router, db, _vault) = gateway(RateLimitConfig::default()).await;
    llm_settings::upsert_llm_settings(
        &db,
        &LlmSettings {
            company_id: "co-1".to_string(),
            provider: ProviderKind::OpenAiCompatible,
            model: "gpt-test".to_string(),
            base_url: None,
            credential_id: Some("cred-gone".to_string()),
            max_tokens: 1024,
        },
    )
    .await
    .unwrap();

    let response = router
        .oneshot(chat_request(json!({
            "message": "Hello!",
            "userId": "user-1",
            "companyId": "co-1",
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_string(response).await.contains("invalid_api_key"));
}

#[tokio::test]
async fn malformed_body_is_a_400() {
    let (router, _db, _vault) = gateway(RateLimitConfig::default()).await;
    let response = router
        .oneshot(chat_request(json!({
            "message": "Hello!",
            "userId": "user-1",
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn blank_message_is_a_400() {
    let (router, _db, _vault) = gateway(RateLimitConfig::default()).await;
    let response = router
        .oneshot(chat_request(json!({
            "message": "   ",
            "userId": "user-1",
            "companyId": "co-1",
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response).await.contains("empty"));
}

// ---- Rate limiting ----

#[tokio::test]
async fn requests_over_the_limit_answer_429() {
    let rate = RateLimitConfig {
        max_requests: 1,
        window_secs: 3600,
    };
    let (router, _db, _vault) = gateway(rate).await;

    let body = json!({
        "message": "Hello!",
        "userId": "user-1",
        "companyId": "co-unconfigured",
    });
    let first = router
        .clone()
        .oneshot(chat_request(body.clone()))
        .await
        .unwrap();
    // First request passes rate limiting and fails later in the pipeline.
    assert_eq!(first.status(), StatusCode::BAD_REQUEST);

    let second = router.oneshot(chat_request(body)).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(body_string(second).await.contains("rate_limited"));
}

// ---- Health ----

#[tokio::test]
async fn healthz_reports_ok() {
    let (router, _db, _vault) = gateway(RateLimitConfig::default()).await;
    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("ok"));
}
