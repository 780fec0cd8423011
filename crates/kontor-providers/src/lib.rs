// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapters for Kontor.
//!
//! [`wire`] builds provider-specific HTTP requests from one neutral
//! transcript, [`sse`] parses each provider's streaming dialect into
//! uniform chunks, and [`client`] carries both call styles out.

pub mod backend;
pub mod client;
pub mod sse;
pub mod wire;

pub use backend::{ChatBackend, LiveBackend};
pub use client::{Completion, ProviderClient};
pub use sse::ChunkStream;
pub use wire::{ProviderConfig, ToolDef, WireRequest, build_chat_request};
