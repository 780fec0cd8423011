// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure wire-request construction per provider dialect.
//!
//! `build_chat_request` maps one transcript onto the configured
//! provider's HTTP shape. Adding a provider means adding a branch here;
//! the orchestrator never sees provider-specific types.

use kontor_core::{ProviderKind, ToolChoice, TranscriptMessage};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

const OPENAI_DEFAULT_BASE: &str = "https://api.openai.com/v1";
const ANTHROPIC_DEFAULT_BASE: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const GOOGLE_OPENAI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
const LOCAL_DEFAULT_BASE: &str = "http://localhost:11434/v1";

/// Everything needed to talk to one tenant's configured backend.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub max_tokens: u32,
}

/// One tool definition in provider-neutral form.
#[derive(Debug, Clone)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A ready-to-send HTTP request.
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub kind: ProviderKind,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

fn base_url(config: &ProviderConfig) -> String {
    let default = match config.kind {
        ProviderKind::OpenAiCompatible => OPENAI_DEFAULT_BASE,
        ProviderKind::Anthropic => ANTHROPIC_DEFAULT_BASE,
        ProviderKind::Google => GOOGLE_OPENAI_BASE,
        ProviderKind::Local => LOCAL_DEFAULT_BASE,
    };
    config
        .base_url
        .clone()
        .unwrap_or_else(|| default.to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Builds the wire request for one chat call.
pub fn build_chat_request(
    config: &ProviderConfig,
    system: &str,
    messages: &[TranscriptMessage],
    tools: &[ToolDef],
    tool_choice: ToolChoice,
    stream: bool,
) -> WireRequest {
    match config.kind {
        ProviderKind::Anthropic => {
            build_anthropic(config, system, messages, tools, tool_choice, stream)
        }
        // Google and Local ride the OpenAI-compatible shape; only the
        // base URL and auth differ.
        ProviderKind::OpenAiCompatible | ProviderKind::Google | ProviderKind::Local => {
            build_openai(config, system, messages, tools, tool_choice, stream)
        }
    }
}

fn build_openai(
    config: &ProviderConfig,
    system: &str,
    messages: &[TranscriptMessage],
    tools: &[ToolDef],
    tool_choice: ToolChoice,
    stream: bool,
) -> WireRequest {
    let mut wire_messages = vec![json!({ "role": "system", "content": system })];
    for message in messages {
        match message {
            TranscriptMessage::System { content } => {
                wire_messages.push(json!({ "role": "system", "content": content }));
            }
            TranscriptMessage::User { content } => {
                wire_messages.push(json!({ "role": "user", "content": content }));
            }
            TranscriptMessage::Assistant { content, tool_calls } => {
                let mut entry = json!({ "role": "assistant", "content": content });
                if !tool_calls.is_empty() {
                    entry["tool_calls"] = tool_calls
                        .iter()
                        .map(|call| {
                            json!({
                                "id": call.id,
                                "type": "function",
                                "function": {
                                    "name": call.name,
                                    "arguments": call.arguments,
                                },
                            })
                        })
                        .collect();
                }
                wire_messages.push(entry);
            }
            TranscriptMessage::ToolResult { call_id, payload } => {
                wire_messages.push(json!({
                    "role": "tool",
                    "tool_call_id": call_id,
                    "content": payload.to_string(),
                }));
            }
        }
    }

    let mut body = json!({
        "model": config.model,
        "messages": wire_messages,
        "max_tokens": config.max_tokens,
        "stream": stream,
    });
    if stream {
        body["stream_options"] = json!({ "include_usage": true });
    }
    if !tools.is_empty() {
        body["tools"] = tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters,
                    },
                })
            })
            .collect();
        body["tool_choice"] = match tool_choice {
            ToolChoice::Required => json!("required"),
            ToolChoice::Auto => json!("auto"),
        };
    }

    let mut headers = Vec::new();
    if let Some(key) = &config.api_key {
        headers.push((
            "authorization".to_string(),
            format!("Bearer {}", key.expose_secret()),
        ));
    }

    WireRequest {
        kind: config.kind,
        url: format!("{}/chat/completions", base_url(config)),
        headers,
        body,
    }
}

fn build_anthropic(
    config: &ProviderConfig,
    system: &str,
    messages: &[TranscriptMessage],
    tools: &[ToolDef],
    tool_choice: ToolChoice,
    stream: bool,
) -> WireRequest {
    let mut wire_messages: Vec<Value> = Vec::new();
    // Same-role neighbours are merged because the Messages API expects
    // alternating roles; consecutive tool results become one user turn.
    let mut push_blocks = |role: &str, mut blocks: Vec<Value>| {
        if let Some(last) = wire_messages.last_mut() {
            if last["role"] == role {
                if let Some(existing) = last["content"].as_array_mut() {
                    existing.append(&mut blocks);
                    return;
                }
            }
        }
        wire_messages.push(json!({ "role": role, "content": blocks }));
    };

    for message in messages {
        match message {
            // Mid-transcript corrections ride as user turns; the
            // Messages API has no in-band system role.
            TranscriptMessage::System { content } | TranscriptMessage::User { content } => {
                push_blocks("user", vec![json!({ "type": "text", "text": content })]);
            }
            TranscriptMessage::Assistant { content, tool_calls } => {
                let mut blocks = Vec::new();
                if !content.is_empty() {
                    blocks.push(json!({ "type": "text", "text": content }));
                }
                for call in tool_calls {
                    let input: Value =
                        serde_json::from_str(&call.arguments).unwrap_or_else(|_| json!({}));
                    blocks.push(json!({
                        "type": "tool_use",
                        "id": call.id,
                        "name": call.name,
                        "input": input,
                    }));
                }
                if blocks.is_empty() {
                    continue;
                }
                push_blocks("assistant", blocks);
            }
            TranscriptMessage::ToolResult { call_id, payload } => {
                push_blocks(
                    "user",
                    vec![json!({
                        "type": "tool_result",
                        "tool_use_id": call_id,
                        "content": payload.to_string(),
                    })],
                );
            }
        }
    }

    let mut body = json!({
        "model": config.model,
        "system": system,
        "messages": wire_messages,
        "max_tokens": config.max_tokens,
        "stream": stream,
    });
    if !tools.is_empty() {
        body["tools"] = tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "input_schema": tool.parameters,
                })
            })
            .collect();
        body["tool_choice"] = match tool_choice {
            ToolChoice::Required => json!({ "type": "any" }),
            ToolChoice::Auto => json!({ "type": "auto" }),
        };
    }

    let mut headers = vec![(
        "anthropic-version".to_string(),
        ANTHROPIC_VERSION.to_string(),
    )];
    if let Some(key) = &config.api_key {
        headers.push(("x-api-key".to_string(), key.expose_secret().to_string()));
    }

    WireRequest {
        kind: config.kind,
        url: format!("{}/v1/messages", base_url(config)),
        headers,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kontor_core::ToolCall;

    fn config(kind: ProviderKind) -> ProviderConfig {
        ProviderConfig {
            kind,
            model: "test-model".to_string(),
            base_url: None,
            api_key: Some(SecretString::from("sk-test")),
            max_tokens: 1024,
        }
    }

    fn sample_tools() -> Vec<ToolDef> {
        vec![ToolDef {
            name: "create_contact".to_string(),
            description: "Create a contact".to_string(),
            parameters: json!({ "type": "object", "properties": {} }),
        }]
    }

    #[test]
    fn openai_shape_with_forced_tools() {
        let request = build_chat_request(
            &config(ProviderKind::OpenAiCompatible),
            "system prompt",
            &[TranscriptMessage::user("create Jane")],
            &sample_tools(),
            ToolChoice::Required,
            true,
        );

        assert_eq!(request.url, "https://api.openai.com/v1/chat/completions");
        assert_eq!(
            request.headers,
            vec![("authorization".to_string(), "Bearer sk-test".to_string())]
        );
        assert_eq!(request.body["messages"][0]["role"], "system");
        assert_eq!(request.body["tool_choice"], "required");
        assert_eq!(request.body["stream_options"]["include_usage"], true);
        assert_eq!(request.body["tools"][0]["type"], "function");
    }

    #[test]
    fn openai_tool_results_use_the_tool_role() {
        let transcript = vec![
            TranscriptMessage::user("create Jane"),
            TranscriptMessage::assistant_with_tools(
                "",
                vec![ToolCall {
                    id: "call-1".to_string(),
                    name: "create_contact".to_string(),
                    arguments: "{\"first_name\":\"Jane\"}".to_string(),
                }],
            ),
            TranscriptMessage::tool_result("call-1", json!({ "success": true })),
        ];
        let request = build_chat_request(
            &config(ProviderKind::OpenAiCompatible),
            "sys",
            &transcript,
            &[],
            ToolChoice::Auto,
            false,
        );

        let messages = request.body["messages"].as_array().unwrap();
        assert_eq!(messages[2]["tool_calls"][0]["function"]["name"], "create_contact");
        assert_eq!(messages[3]["role"], "tool");
        assert_eq!(messages[3]["tool_call_id"], "call-1");
        assert!(request.body.get("tool_choice").is_none());
    }

    #[test]
    fn anthropic_splits_system_and_renames_tools() {
        let request = build_chat_request(
            &config(ProviderKind::Anthropic),
            "system prompt",
            &[TranscriptMessage::user("create Jane")],
            &sample_tools(),
            ToolChoice::Required,
            true,
        );

        assert_eq!(request.url, "https://api.anthropic.com/v1/messages");
        assert!(request.headers.contains(&(
            "anthropic-version".to_string(),
            ANTHROPIC_VERSION.to_string()
        )));
        assert!(request
            .headers
            .contains(&("x-api-key".to_string(), "sk-test".to_string())));
        assert_eq!(request.body["system"], "system prompt");
        assert!(request.body["tools"][0].get("input_schema").is_some());
        assert_eq!(request.body["tool_choice"]["type"], "any");
    }

    #[test]
    fn anthropic_merges_consecutive_user_turns() {
        let transcript = vec![
            TranscriptMessage::assistant_with_tools(
                "",
                vec![
                    ToolCall {
                        id: "call-1".to_string(),
                        name: "create_contact".to_string(),
                        arguments: "{}".to_string(),
                    },
                    ToolCall {
                        id: "call-2".to_string(),
                        name: "create_task".to_string(),
                        arguments: "{}".to_string(),
                    },
                ],
            ),
            TranscriptMessage::tool_result("call-1", json!({ "success": true })),
            TranscriptMessage::tool_result("call-2", json!({ "success": true })),
        ];
        let request = build_chat_request(
            &config(ProviderKind::Anthropic),
            "sys",
            &transcript,
            &[],
            ToolChoice::Auto,
            false,
        );

        let messages = request.body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[1]["content"].as_array().unwrap().len(), 2);
        assert_eq!(messages[1]["content"][0]["type"], "tool_result");
    }

    #[test]
    fn google_rides_the_openai_branch() {
        let request = build_chat_request(
            &config(ProviderKind::Google),
            "sys",
            &[TranscriptMessage::user("hi")],
            &[],
            ToolChoice::Auto,
            true,
        );
        assert_eq!(
            request.url,
            "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
        );
    }

    #[test]
    fn local_backend_needs_no_credential() {
        let mut cfg = config(ProviderKind::Local);
        cfg.api_key = None;
        cfg.base_url = Some("http://127.0.0.1:8080/v1/".to_string());
        let request = build_chat_request(
            &cfg,
            "sys",
            &[TranscriptMessage::user("hi")],
            &[],
            ToolChoice::Auto,
            true,
        );
        assert_eq!(request.url, "http://127.0.0.1:8080/v1/chat/completions");
        assert!(request.headers.is_empty());
    }

    #[test]
    fn corrective_system_message_stays_in_order_for_openai() {
        let transcript = vec![
            TranscriptMessage::user("update Jane"),
            TranscriptMessage::system("Use only names the user wrote."),
        ];
        let request = build_chat_request(
            &config(ProviderKind::OpenAiCompatible),
            "sys",
            &transcript,
            &[],
            ToolChoice::Auto,
            false,
        );
        let messages = request.body["messages"].as_array().unwrap();
        assert_eq!(messages[2]["role"], "system");
        assert_eq!(messages[2]["content"], "Use only names the user wrote.");
    }
}
