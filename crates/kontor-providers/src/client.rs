// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for provider chat calls.
//!
//! Streaming calls fail fast; the non-streaming completion call used by
//! the planner fallback retries once after one second on transient
//! upstream errors.

use std::time::Duration;

use kontor_core::{KontorError, ProviderErrorKind, ProviderKind, ToolCall};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::sse::{self, ChunkStream};
use crate::wire::WireRequest;

/// A parsed non-streaming completion.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Provider-agnostic HTTP client. One instance is shared across turns.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
}

impl ProviderClient {
    pub fn new() -> Result<Self, KontorError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| KontorError::Provider {
                kind: ProviderErrorKind::Other,
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self { http })
    }

    fn post(&self, request: &WireRequest) -> reqwest::RequestBuilder {
        let mut builder = self.http.post(&request.url).json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        builder
    }

    /// Sends a streaming chat request and returns the parsed chunk
    /// stream. No retry: the consumer is already waiting on the wire.
    pub async fn stream_chat(&self, request: &WireRequest) -> Result<ChunkStream, KontorError> {
        let response = self.post(request).send().await.map_err(|e| {
            KontorError::Provider {
                kind: ProviderErrorKind::Other,
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            }
        })?;

        let status = response.status();
        debug!(status = %status, url = %request.url, "streaming response received");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KontorError::from_provider_status(status.as_u16(), body));
        }

        Ok(match request.kind {
            ProviderKind::Anthropic => sse::parse_anthropic_stream(response),
            ProviderKind::OpenAiCompatible | ProviderKind::Google | ProviderKind::Local => {
                sse::parse_openai_stream(response)
            }
        })
    }

    /// Sends a non-streaming chat request. Retries once after 1s on 429
    /// or 5xx, then maps the status to a categorized provider error.
    pub async fn complete(&self, request: &WireRequest) -> Result<Completion, KontorError> {
        let mut last_error = None;

        for attempt in 0..=1u32 {
            if attempt > 0 {
                warn!(attempt, "retrying completion request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = match self.post(request).send().await {
                Ok(response) => response,
                Err(e) => {
                    last_error = Some(KontorError::Provider {
                        kind: ProviderErrorKind::Other,
                        message: format!("HTTP request failed: {e}"),
                        source: Some(Box::new(e)),
                    });
                    continue;
                }
            };

            let status = response.status();
            debug!(status = %status, attempt, "completion response received");

            if status.is_success() {
                let body: Value = response.json().await.map_err(|e| KontorError::Provider {
                    kind: ProviderErrorKind::Other,
                    message: format!("failed to parse completion response: {e}"),
                    source: Some(Box::new(e)),
                })?;
                return parse_completion(request.kind, &body);
            }

            let transient = status.as_u16() == 429 || status.is_server_error();
            let body = response.text().await.unwrap_or_default();
            let error = KontorError::from_provider_status(status.as_u16(), body);
            if transient && attempt == 0 {
                last_error = Some(error);
                continue;
            }
            return Err(error);
        }

        Err(last_error.unwrap_or_else(|| KontorError::Provider {
            kind: ProviderErrorKind::Other,
            message: "completion request failed after retries".to_string(),
            source: None,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiCompletion {
    choices: Vec<OpenAiCompletionChoice>,
    #[serde(default)]
    usage: Option<OpenAiCompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiCompletionChoice {
    message: OpenAiCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiCompletionMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAiCompletionToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiCompletionToolCall {
    id: String,
    function: OpenAiCompletionFunction,
}

#[derive(Debug, Deserialize)]
struct OpenAiCompletionFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiCompletionUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct AnthropicCompletion {
    content: Vec<AnthropicCompletionBlock>,
    #[serde(default)]
    usage: Option<AnthropicCompletionUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum AnthropicCompletionBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse { id: String, name: String, input: Value },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicCompletionUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

fn parse_completion(kind: ProviderKind, body: &Value) -> Result<Completion, KontorError> {
    let parse_err = |e: serde_json::Error| KontorError::Provider {
        kind: ProviderErrorKind::Other,
        message: format!("unexpected completion shape: {e}"),
        source: Some(Box::new(e)),
    };

    match kind {
        ProviderKind::Anthropic => {
            let parsed: AnthropicCompletion =
                serde_json::from_value(body.clone()).map_err(parse_err)?;
            let mut completion = Completion::default();
            for block in parsed.content {
                match block {
                    AnthropicCompletionBlock::Text { text } => completion.content.push_str(&text),
                    AnthropicCompletionBlock::ToolUse { id, name, input } => {
                        completion.tool_calls.push(ToolCall {
                            id,
                            name,
                            arguments: input.to_string(),
                        });
                    }
                    AnthropicCompletionBlock::Other => {}
                }
            }
            if let Some(usage) = parsed.usage {
                completion.prompt_tokens = usage.input_tokens;
                completion.completion_tokens = usage.output_tokens;
            }
            Ok(completion)
        }
        ProviderKind::OpenAiCompatible | ProviderKind::Google | ProviderKind::Local => {
            let parsed: OpenAiCompletion =
                serde_json::from_value(body.clone()).map_err(parse_err)?;
            let mut completion = Completion::default();
            if let Some(choice) = parsed.choices.into_iter().next() {
                completion.content = choice.message.content.unwrap_or_default();
                for tc in choice.message.tool_calls.unwrap_or_default() {
                    completion.tool_calls.push(ToolCall {
                        id: tc.id,
                        name: tc.function.name,
                        arguments: tc.function.arguments,
                    });
                }
            }
            if let Some(usage) = parsed.usage {
                completion.prompt_tokens = usage.prompt_tokens;
                completion.completion_tokens = usage.completion_tokens;
            }
            Ok(completion)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use kontor_core::{FinishReason, StreamChunk};
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn wire(kind: ProviderKind, url: String) -> WireRequest {
        WireRequest {
            kind,
            url,
            headers: vec![("authorization".to_string(), "Bearer test".to_string())],
            body: json!({ "model": "m", "messages": [] }),
        }
    }

    #[tokio::test]
    async fn stream_chat_parses_openai_sse() {
        let server = MockServer::start().await;
        let sse = "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"},\"finish_reason\":null}]}\n\n\
                   data: {\"choices\":[{\"delta\":{\"content\":\"lo\"},\"finish_reason\":null}]}\n\n\
                   data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n\
                   data: [DONE]\n\n";
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse),
            )
            .mount(&server)
            .await;

        let client = ProviderClient::new().unwrap();
        let request = wire(
            ProviderKind::OpenAiCompatible,
            format!("{}/chat/completions", server.uri()),
        );
        let mut stream = client.stream_chat(&request).await.unwrap();

        let mut content = String::new();
        let mut finished = false;
        while let Some(chunk) = stream.next().await {
            match chunk.unwrap() {
                StreamChunk::ContentDelta(delta) => content.push_str(&delta),
                StreamChunk::Finish(reason) => {
                    assert_eq!(reason, FinishReason::Stop);
                    finished = true;
                }
                other => panic!("unexpected chunk: {other:?}"),
            }
        }
        assert_eq!(content, "Hello");
        assert!(finished);
    }

    #[tokio::test]
    async fn stream_chat_maps_401_to_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let client = ProviderClient::new().unwrap();
        let request = wire(
            ProviderKind::OpenAiCompatible,
            format!("{}/chat/completions", server.uri()),
        );
        let err = client
            .stream_chat(&request)
            .await
            .err()
            .expect("expected stream_chat to fail");
        assert!(matches!(
            err,
            KontorError::Provider { kind: ProviderErrorKind::Unauthorized, .. }
        ));
    }

    #[tokio::test]
    async fn complete_retries_once_on_429() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "after retry"}}],
                "usage": {"prompt_tokens": 5, "completion_tokens": 2}
            })))
            .mount(&server)
            .await;

        let client = ProviderClient::new().unwrap();
        let request = wire(
            ProviderKind::OpenAiCompatible,
            format!("{}/chat/completions", server.uri()),
        );
        let completion = client.complete(&request).await.unwrap();
        assert_eq!(completion.content, "after retry");
        assert_eq!(completion.prompt_tokens, 5);
    }

    #[tokio::test]
    async fn complete_fails_fast_on_400() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .expect(1)
            .mount(&server)
            .await;

        let client = ProviderClient::new().unwrap();
        let request = wire(
            ProviderKind::OpenAiCompatible,
            format!("{}/chat/completions", server.uri()),
        );
        assert!(client.complete(&request).await.is_err());
    }

    #[tokio::test]
    async fn complete_parses_anthropic_tool_use() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [
                    {"type": "text", "text": "Creating it."},
                    {"type": "tool_use", "id": "toolu_1", "name": "create_task",
                     "input": {"title": "Call Jana"}}
                ],
                "stop_reason": "tool_use",
                "usage": {"input_tokens": 30, "output_tokens": 12}
            })))
            .mount(&server)
            .await;

        let client = ProviderClient::new().unwrap();
        let request = wire(
            ProviderKind::Anthropic,
            format!("{}/v1/messages", server.uri()),
        );
        let completion = client.complete(&request).await.unwrap();
        assert_eq!(completion.content, "Creating it.");
        assert_eq!(completion.tool_calls.len(), 1);
        assert_eq!(completion.tool_calls[0].name, "create_task");
        assert_eq!(
            completion.tool_calls[0].arguments,
            "{\"title\":\"Call Jana\"}"
        );
        assert_eq!(completion.completion_tokens, 12);
    }
}
