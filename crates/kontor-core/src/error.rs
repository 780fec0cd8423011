// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Kontor assistant service.

use strum::{Display, EnumString};
use thiserror::Error;

/// The primary error type used across all Kontor crates.
///
/// Recovery policy per variant:
/// - `Validation` and `ToolValidation` are user/model-correctable within
///   the same turn.
/// - `AuthConfig` and `Provider` terminate the turn; nothing partial is
///   persisted and there is no automatic retry.
/// - `Execution` and `Verification` are scoped to one tool call and never
///   abort sibling calls in the same turn.
#[derive(Debug, Error)]
pub enum KontorError {
    /// Bad request shape or content (empty message, over length ceiling).
    /// Always maps to HTTP 400.
    #[error("validation error: {0}")]
    Validation(String),

    /// The tenant has no usable LLM credential configured.
    #[error("llm configuration error: {code}")]
    AuthConfig { code: AuthConfigCode },

    /// Upstream LLM HTTP failure, categorized for user-facing messaging.
    #[error("provider error ({kind}): {message}")]
    Provider {
        kind: ProviderErrorKind,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Tool arguments failed structural or semantic validation. Injected
    /// back to the model as a tool result, never surfaced raw to the user.
    #[error("tool argument validation failed: {0}")]
    ToolValidation(String),

    /// Data-store failure while executing a tool call.
    #[error("tool execution failed: {message}")]
    Execution {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Post-write re-read did not match the requested fields. The write
    /// nominally succeeded but the confirmed-state guarantee did not hold.
    #[error("post-write verification failed: {0}")]
    Verification(String),

    /// Storage backend errors (connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Credential vault errors (sealing, unsealing, missing key).
    #[error("vault error: {0}")]
    Vault(String),

    /// Configuration errors (invalid TOML, missing fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Machine-readable codes for LLM configuration failures, surfaced as the
/// JSON `error` field so clients can deep-link to settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum AuthConfigCode {
    NoLlmConfigured,
    InvalidApiKey,
}

/// User-facing category of an upstream provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ProviderErrorKind {
    RateLimited,
    PaymentRequired,
    Unauthorized,
    Other,
}

impl KontorError {
    /// Map an upstream HTTP status to a categorized provider error.
    pub fn from_provider_status(status: u16, body: impl Into<String>) -> Self {
        let kind = match status {
            429 => ProviderErrorKind::RateLimited,
            402 => ProviderErrorKind::PaymentRequired,
            401 | 403 => ProviderErrorKind::Unauthorized,
            _ => ProviderErrorKind::Other,
        };
        KontorError::Provider {
            kind,
            message: format!("upstream returned {status}: {}", body.into()),
            source: None,
        }
    }

    /// True when the error ends the whole turn rather than one tool call.
    pub fn is_turn_fatal(&self) -> bool {
        matches!(
            self,
            KontorError::AuthConfig { .. } | KontorError::Provider { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_config_codes_render_snake_case() {
        assert_eq!(AuthConfigCode::NoLlmConfigured.to_string(), "no_llm_configured");
        assert_eq!(AuthConfigCode::InvalidApiKey.to_string(), "invalid_api_key");
    }

    #[test]
    fn provider_status_mapping() {
        let rate = KontorError::from_provider_status(429, "slow down");
        assert!(matches!(
            rate,
            KontorError::Provider { kind: ProviderErrorKind::RateLimited, .. }
        ));

        let pay = KontorError::from_provider_status(402, "");
        assert!(matches!(
            pay,
            KontorError::Provider { kind: ProviderErrorKind::PaymentRequired, .. }
        ));

        let unauth = KontorError::from_provider_status(401, "bad key");
        assert!(matches!(
            unauth,
            KontorError::Provider { kind: ProviderErrorKind::Unauthorized, .. }
        ));

        let other = KontorError::from_provider_status(500, "boom");
        assert!(matches!(
            other,
            KontorError::Provider { kind: ProviderErrorKind::Other, .. }
        ));
    }

    #[test]
    fn turn_fatal_classification() {
        assert!(KontorError::AuthConfig { code: AuthConfigCode::InvalidApiKey }.is_turn_fatal());
        assert!(KontorError::from_provider_status(500, "x").is_turn_fatal());
        assert!(!KontorError::Validation("empty".into()).is_turn_fatal());
        assert!(!KontorError::ToolValidation("missing field".into()).is_turn_fatal());
        assert!(!KontorError::Verification("mismatch".into()).is_turn_fatal());
    }
}
