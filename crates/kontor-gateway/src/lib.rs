// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/SSE gateway for the Kontor assistant.
//!
//! One streaming endpoint, `POST /v1/assistant/chat`, runs the full turn
//! pipeline and answers with OpenAI-style SSE chunks. Everything that can
//! fail before the stream starts (rate limit, validation, provider
//! settings, credentials) answers with a plain JSON error instead, so
//! clients only ever parse SSE for successful turns.

pub mod handlers;
pub mod limit;
pub mod server;
pub mod sse;

pub use handlers::ChatRequest;
pub use limit::RateLimiter;
pub use server::{GatewayState, build_router, start_server};
