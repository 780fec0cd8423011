// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE parsers turning provider byte streams into [`StreamChunk`]s.
//!
//! Each dialect parser maps one SSE event onto zero or more chunks via
//! the `eventsource-stream` crate. Unknown event types are skipped so
//! provider-side additions do not break the stream.

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};
use kontor_core::{FinishReason, KontorError, ProviderErrorKind, StreamChunk};
use serde::Deserialize;

/// The uniform chunk stream every dialect parser produces.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, KontorError>> + Send>>;

fn provider_err(message: String) -> KontorError {
    KontorError::Provider {
        kind: ProviderErrorKind::Other,
        message,
        source: None,
    }
}

// ---- OpenAI-compatible dialect ----

#[derive(Debug, Deserialize)]
struct OpenAiChunk {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    #[serde(default)]
    delta: OpenAiDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAiToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiToolCallDelta {
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<OpenAiFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct OpenAiFunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

fn openai_finish(reason: &str) -> FinishReason {
    match reason {
        "stop" => FinishReason::Stop,
        "tool_calls" => FinishReason::ToolCalls,
        "length" => FinishReason::Length,
        _ => FinishReason::Other,
    }
}

fn openai_event_chunks(data: &str) -> Vec<Result<StreamChunk, KontorError>> {
    if data.trim() == "[DONE]" {
        return Vec::new();
    }
    let chunk: OpenAiChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => return vec![Err(provider_err(format!("failed to parse stream chunk: {e}")))],
    };

    let mut out = Vec::new();
    for choice in chunk.choices {
        if let Some(content) = choice.delta.content {
            if !content.is_empty() {
                out.push(Ok(StreamChunk::ContentDelta(content)));
            }
        }
        if let Some(tool_calls) = choice.delta.tool_calls {
            for tc in tool_calls {
                let (name, arguments) = match tc.function {
                    Some(f) => (f.name, f.arguments.unwrap_or_default()),
                    None => (None, String::new()),
                };
                out.push(Ok(StreamChunk::ToolCallDelta {
                    index: tc.index,
                    id: tc.id,
                    name,
                    arguments,
                }));
            }
        }
        if let Some(reason) = choice.finish_reason {
            out.push(Ok(StreamChunk::Finish(openai_finish(&reason))));
        }
    }
    if let Some(usage) = chunk.usage {
        out.push(Ok(StreamChunk::Usage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        }));
    }
    out
}

/// Parses an OpenAI-compatible `chat/completions` SSE response.
pub fn parse_openai_stream(response: reqwest::Response) -> ChunkStream {
    let events = response.bytes_stream().eventsource();
    Box::pin(events.flat_map(|result| {
        futures::stream::iter(match result {
            Ok(event) => openai_event_chunks(&event.data),
            Err(e) => vec![Err(provider_err(format!("SSE stream error: {e}")))],
        })
    }))
}

// ---- Anthropic Messages dialect ----

#[derive(Debug, Deserialize)]
struct AnthropicMessageStart {
    message: AnthropicStartBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicStartBody {
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicBlockStart {
    index: usize,
    content_block: AnthropicBlock,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum AnthropicBlock {
    #[serde(rename = "text")]
    Text {},
    #[serde(rename = "tool_use")]
    ToolUse { id: String, name: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicBlockDelta {
    index: usize,
    delta: AnthropicDelta,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum AnthropicDelta {
    #[serde(rename = "text_delta")]
    Text { text: String },
    #[serde(rename = "input_json_delta")]
    InputJson { partial_json: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicMessageDelta {
    #[serde(default)]
    delta: AnthropicStopDelta,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Default, Deserialize)]
struct AnthropicStopDelta {
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorEvent {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    #[serde(rename = "type")]
    type_: String,
    message: String,
}

fn anthropic_finish(reason: &str) -> FinishReason {
    match reason {
        "end_turn" => FinishReason::Stop,
        "tool_use" => FinishReason::ToolCalls,
        "max_tokens" => FinishReason::Length,
        _ => FinishReason::Other,
    }
}

fn anthropic_event_chunks(event: &str, data: &str) -> Vec<Result<StreamChunk, KontorError>> {
    fn parse<'a, T: Deserialize<'a>>(data: &'a str, what: &str) -> Result<T, KontorError> {
        serde_json::from_str(data)
            .map_err(|e| provider_err(format!("failed to parse {what}: {e}")))
    }

    match event {
        "message_start" => match parse::<AnthropicMessageStart>(data, "message_start") {
            Ok(start) => start
                .message
                .usage
                .map(|usage| {
                    Ok(StreamChunk::Usage {
                        prompt_tokens: usage.input_tokens,
                        completion_tokens: usage.output_tokens,
                    })
                })
                .into_iter()
                .collect(),
            Err(e) => vec![Err(e)],
        },
        "content_block_start" => match parse::<AnthropicBlockStart>(data, "content_block_start") {
            Ok(start) => match start.content_block {
                AnthropicBlock::ToolUse { id, name } => vec![Ok(StreamChunk::ToolCallDelta {
                    index: start.index,
                    id: Some(id),
                    name: Some(name),
                    arguments: String::new(),
                })],
                AnthropicBlock::Text {} | AnthropicBlock::Other => Vec::new(),
            },
            Err(e) => vec![Err(e)],
        },
        "content_block_delta" => match parse::<AnthropicBlockDelta>(data, "content_block_delta") {
            Ok(delta) => match delta.delta {
                AnthropicDelta::Text { text } => vec![Ok(StreamChunk::ContentDelta(text))],
                AnthropicDelta::InputJson { partial_json } => {
                    vec![Ok(StreamChunk::ToolCallDelta {
                        index: delta.index,
                        id: None,
                        name: None,
                        arguments: partial_json,
                    })]
                }
                AnthropicDelta::Other => Vec::new(),
            },
            Err(e) => vec![Err(e)],
        },
        "message_delta" => match parse::<AnthropicMessageDelta>(data, "message_delta") {
            Ok(delta) => {
                let mut out = Vec::new();
                if let Some(usage) = delta.usage {
                    out.push(Ok(StreamChunk::Usage {
                        prompt_tokens: usage.input_tokens,
                        completion_tokens: usage.output_tokens,
                    }));
                }
                if let Some(reason) = delta.delta.stop_reason {
                    out.push(Ok(StreamChunk::Finish(anthropic_finish(&reason))));
                }
                out
            }
            Err(e) => vec![Err(e)],
        },
        "error" => match parse::<AnthropicErrorEvent>(data, "error event") {
            Ok(err) => vec![Err(provider_err(format!(
                "upstream error ({}): {}",
                err.error.type_, err.error.message
            )))],
            Err(e) => vec![Err(e)],
        },
        // message_stop carries nothing beyond the preceding message_delta;
        // ping and unknown events are keep-alive noise.
        _ => Vec::new(),
    }
}

/// Parses an Anthropic Messages SSE response.
pub fn parse_anthropic_stream(response: reqwest::Response) -> ChunkStream {
    let events = response.bytes_stream().eventsource();
    Box::pin(events.flat_map(|result| {
        futures::stream::iter(match result {
            Ok(event) => anthropic_event_chunks(&event.event, &event.data),
            Err(e) => vec![Err(provider_err(format!("SSE stream error: {e}")))],
        })
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_text_and_finish() {
        let chunks = openai_event_chunks(
            r#"{"choices":[{"delta":{"content":"Hello"},"finish_reason":null}]}"#,
        );
        assert_eq!(chunks.len(), 1);
        assert_eq!(
            chunks[0].as_ref().unwrap(),
            &StreamChunk::ContentDelta("Hello".to_string())
        );

        let chunks = openai_event_chunks(r#"{"choices":[{"delta":{},"finish_reason":"tool_calls"}]}"#);
        assert_eq!(
            chunks[0].as_ref().unwrap(),
            &StreamChunk::Finish(FinishReason::ToolCalls)
        );
    }

    #[test]
    fn openai_tool_call_fragments_keep_their_index() {
        let first = openai_event_chunks(
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call-1","function":{"name":"create_contact","arguments":"{\"fi"}}]},"finish_reason":null}]}"#,
        );
        assert_eq!(
            first[0].as_ref().unwrap(),
            &StreamChunk::ToolCallDelta {
                index: 0,
                id: Some("call-1".to_string()),
                name: Some("create_contact".to_string()),
                arguments: "{\"fi".to_string(),
            }
        );

        let second = openai_event_chunks(
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"rst_name\":\"Jane\"}"}}]},"finish_reason":null}]}"#,
        );
        assert_eq!(
            second[0].as_ref().unwrap(),
            &StreamChunk::ToolCallDelta {
                index: 0,
                id: None,
                name: None,
                arguments: "rst_name\":\"Jane\"}".to_string(),
            }
        );
    }

    #[test]
    fn openai_done_sentinel_produces_nothing() {
        assert!(openai_event_chunks("[DONE]").is_empty());
    }

    #[test]
    fn openai_usage_chunk() {
        let chunks = openai_event_chunks(
            r#"{"choices":[],"usage":{"prompt_tokens":120,"completion_tokens":45}}"#,
        );
        assert_eq!(
            chunks[0].as_ref().unwrap(),
            &StreamChunk::Usage {
                prompt_tokens: 120,
                completion_tokens: 45
            }
        );
    }

    #[test]
    fn anthropic_tool_use_start_then_json_delta() {
        let start = anthropic_event_chunks(
            "content_block_start",
            r#"{"index":1,"content_block":{"type":"tool_use","id":"toolu_1","name":"create_task"}}"#,
        );
        assert_eq!(
            start[0].as_ref().unwrap(),
            &StreamChunk::ToolCallDelta {
                index: 1,
                id: Some("toolu_1".to_string()),
                name: Some("create_task".to_string()),
                arguments: String::new(),
            }
        );

        let delta = anthropic_event_chunks(
            "content_block_delta",
            r#"{"index":1,"delta":{"type":"input_json_delta","partial_json":"{\"title\""}}"#,
        );
        assert_eq!(
            delta[0].as_ref().unwrap(),
            &StreamChunk::ToolCallDelta {
                index: 1,
                id: None,
                name: None,
                arguments: "{\"title\"".to_string(),
            }
        );
    }

    #[test]
    fn anthropic_message_delta_carries_stop_and_usage() {
        let chunks = anthropic_event_chunks(
            "message_delta",
            r#"{"delta":{"stop_reason":"tool_use"},"usage":{"output_tokens":33}}"#,
        );
        assert_eq!(chunks.len(), 2);
        assert_eq!(
            chunks[0].as_ref().unwrap(),
            &StreamChunk::Usage { prompt_tokens: 0, completion_tokens: 33 }
        );
        assert_eq!(
            chunks[1].as_ref().unwrap(),
            &StreamChunk::Finish(FinishReason::ToolCalls)
        );
    }

    #[test]
    fn anthropic_unknown_events_are_skipped() {
        assert!(anthropic_event_chunks("ping", "{}").is_empty());
        assert!(anthropic_event_chunks("some_future_event", "{\"x\":1}").is_empty());
    }

    #[test]
    fn anthropic_error_event_maps_to_provider_error() {
        let chunks = anthropic_event_chunks(
            "error",
            r#"{"error":{"type":"overloaded_error","message":"Overloaded"}}"#,
        );
        let err = chunks[0].as_ref().unwrap_err();
        assert!(err.to_string().contains("overloaded_error"));
    }
}
