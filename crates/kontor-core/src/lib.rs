// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Kontor assistant service.
//!
//! Provides the workspace-wide error taxonomy and the shared vocabulary
//! types (transcript messages, tool calls, stream chunks, request context)
//! that every other Kontor crate builds on.

pub mod error;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{AuthConfigCode, KontorError, ProviderErrorKind};
pub use types::{
    FinishReason, Industry, Language, ProviderKind, RequestContext, StreamChunk, ToolCall,
    ToolChoice, TranscriptMessage, new_id, now_iso,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_construct() {
        let _validation = KontorError::Validation("too long".into());
        let _auth = KontorError::AuthConfig { code: AuthConfigCode::NoLlmConfigured };
        let _provider = KontorError::Provider {
            kind: ProviderErrorKind::RateLimited,
            message: "429".into(),
            source: None,
        };
        let _tool = KontorError::ToolValidation("first_name required".into());
        let _exec = KontorError::Execution { message: "insert failed".into(), source: None };
        let _verify = KontorError::Verification("email mismatch".into());
        let _storage = KontorError::Storage { source: Box::new(std::io::Error::other("io")) };
        let _vault = KontorError::Vault("locked".into());
        let _config = KontorError::Config("bad toml".into());
        let _internal = KontorError::Internal("unexpected".into());
    }

    #[test]
    fn error_messages_are_prefixed() {
        let e = KontorError::Validation("message must not exceed 4000 characters".into());
        assert!(e.to_string().starts_with("validation error:"));

        let e = KontorError::AuthConfig { code: AuthConfigCode::NoLlmConfigured };
        assert!(e.to_string().contains("no_llm_configured"));
    }
}
