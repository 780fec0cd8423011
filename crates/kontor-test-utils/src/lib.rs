// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic test doubles for Kontor.
//!
//! [`ScriptedBackend`] implements the chat seam with pre-queued streams
//! and completions, enabling fast orchestrator tests without HTTP.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use kontor_core::{FinishReason, KontorError, StreamChunk, ToolChoice, TranscriptMessage};
use kontor_providers::{ChatBackend, ChunkStream, Completion, ToolDef};
use tokio::sync::Mutex;

/// One pre-scripted streaming response.
pub type Script = Vec<Result<StreamChunk, KontorError>>;

/// A chat backend that replays queued scripts in FIFO order.
///
/// When a queue runs dry the backend falls back to a plain
/// "scripted response" text so tests fail on assertions instead of
/// panicking inside the loop.
pub struct ScriptedBackend {
    streams: Arc<Mutex<VecDeque<Script>>>,
    completions: Arc<Mutex<VecDeque<Completion>>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            streams: Arc::new(Mutex::new(VecDeque::new())),
            completions: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Queue a raw chunk script for the next streaming call.
    pub async fn push_stream(&self, script: Script) {
        self.streams.lock().await.push_back(script);
    }

    /// Queue a plain-text streaming reply, split into two deltas.
    pub async fn push_text(&self, text: &str) {
        let mid = text.len() / 2;
        let (head, tail) = text.split_at(mid);
        self.push_stream(vec![
            Ok(StreamChunk::ContentDelta(head.to_string())),
            Ok(StreamChunk::ContentDelta(tail.to_string())),
            Ok(StreamChunk::Usage { prompt_tokens: 10, completion_tokens: 5 }),
            Ok(StreamChunk::Finish(FinishReason::Stop)),
        ])
        .await;
    }

    /// Queue a streaming reply that calls one tool, with the argument
    /// JSON fragmented across chunks the way real providers send it.
    pub async fn push_tool_call(&self, call_id: &str, name: &str, arguments: &str) {
        let mid = arguments.len() / 2;
        let (head, tail) = arguments.split_at(mid);
        self.push_stream(vec![
            Ok(StreamChunk::ToolCallDelta {
                index: 0,
                id: Some(call_id.to_string()),
                name: Some(name.to_string()),
                arguments: head.to_string(),
            }),
            Ok(StreamChunk::ToolCallDelta {
                index: 0,
                id: None,
                name: None,
                arguments: tail.to_string(),
            }),
            Ok(StreamChunk::Usage { prompt_tokens: 20, completion_tokens: 8 }),
            Ok(StreamChunk::Finish(FinishReason::ToolCalls)),
        ])
        .await;
    }

    /// Queue a non-streaming completion for the next planner call.
    pub async fn push_completion(&self, completion: Completion) {
        self.completions.lock().await.push_back(completion);
    }

    fn fallback_script() -> Script {
        vec![
            Ok(StreamChunk::ContentDelta("scripted response".to_string())),
            Ok(StreamChunk::Finish(FinishReason::Stop)),
        ]
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    fn model(&self) -> &str {
        "scripted-model"
    }

    fn provider(&self) -> String {
        "scripted".to_string()
    }

    async fn stream(
        &self,
        _system: &str,
        _messages: &[TranscriptMessage],
        _tools: &[ToolDef],
        _tool_choice: ToolChoice,
    ) -> Result<ChunkStream, KontorError> {
        let script = self
            .streams
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(Self::fallback_script);
        Ok(Box::pin(futures::stream::iter(script)))
    }

    async fn complete(
        &self,
        _system: &str,
        _messages: &[TranscriptMessage],
        _tools: &[ToolDef],
        _tool_choice: ToolChoice,
    ) -> Result<Completion, KontorError> {
        Ok(self
            .completions
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Completion {
                content: "scripted response".to_string(),
                ..Default::default()
            }))
    }
}
