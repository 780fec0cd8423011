// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The chat seam the orchestrator talks to.
//!
//! [`ChatBackend`] hides wire building and transport so the turn loop
//! never branches on provider; the scripted test backend implements the
//! same trait.

use async_trait::async_trait;
use kontor_core::{KontorError, ToolChoice, TranscriptMessage};

use crate::client::{Completion, ProviderClient};
use crate::sse::ChunkStream;
use crate::wire::{ProviderConfig, ToolDef, build_chat_request};

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Model identifier recorded on persisted assistant messages.
    fn model(&self) -> &str;

    /// Provider label recorded on usage rows.
    fn provider(&self) -> String;

    /// One streaming chat call.
    async fn stream(
        &self,
        system: &str,
        messages: &[TranscriptMessage],
        tools: &[ToolDef],
        tool_choice: ToolChoice,
    ) -> Result<ChunkStream, KontorError>;

    /// One non-streaming chat call (planner fallback).
    async fn complete(
        &self,
        system: &str,
        messages: &[TranscriptMessage],
        tools: &[ToolDef],
        tool_choice: ToolChoice,
    ) -> Result<Completion, KontorError>;
}

/// Production backend: one tenant's provider config plus the shared
/// HTTP client.
#[derive(Debug, Clone)]
pub struct LiveBackend {
    config: ProviderConfig,
    client: ProviderClient,
}

impl LiveBackend {
    pub fn new(config: ProviderConfig, client: ProviderClient) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl ChatBackend for LiveBackend {
    fn model(&self) -> &str {
        &self.config.model
    }

    fn provider(&self) -> String {
        self.config.kind.to_string()
    }

    async fn stream(
        &self,
        system: &str,
        messages: &[TranscriptMessage],
        tools: &[ToolDef],
        tool_choice: ToolChoice,
    ) -> Result<ChunkStream, KontorError> {
        let request = build_chat_request(&self.config, system, messages, tools, tool_choice, true);
        self.client.stream_chat(&request).await
    }

    async fn complete(
        &self,
        system: &str,
        messages: &[TranscriptMessage],
        tools: &[ToolDef],
        tool_choice: ToolChoice,
    ) -> Result<Completion, KontorError> {
        let request = build_chat_request(&self.config, system, messages, tools, tool_choice, false);
        self.client.complete(&request).await
    }
}
