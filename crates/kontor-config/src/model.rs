// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Kontor assistant service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so unrecognized config
//! keys are rejected at startup with actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Kontor configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KontorConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Orchestration loop settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Knowledge retrieval settings.
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Per-IP request rate limiting.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Credential vault settings.
    #[serde(default)]
    pub vault: VaultConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins. Empty list allows any origin.
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8087
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("kontor").join("kontor.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("kontor.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Orchestration loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Window for the duplicate-action check on the ledger, in seconds.
    #[serde(default = "default_duplicate_window_secs")]
    pub duplicate_window_secs: u64,

    /// How far back conversation history is included, in seconds.
    #[serde(default = "default_history_window_secs")]
    pub history_window_secs: u64,

    /// Maximum number of history messages in the context window.
    #[serde(default = "default_history_max_messages")]
    pub history_max_messages: usize,

    /// Recent rows per entity kind in the business snapshot (max 50).
    #[serde(default = "default_snapshot_rows")]
    pub snapshot_rows: usize,

    /// Whether the memory-tag protocol is offered to the model.
    #[serde(default = "default_learning_enabled")]
    pub learning_enabled: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            duplicate_window_secs: default_duplicate_window_secs(),
            history_window_secs: default_history_window_secs(),
            history_max_messages: default_history_max_messages(),
            snapshot_rows: default_snapshot_rows(),
            learning_enabled: default_learning_enabled(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_duplicate_window_secs() -> u64 {
    3600
}

fn default_history_window_secs() -> u64 {
    900
}

fn default_history_max_messages() -> usize {
    10
}

fn default_snapshot_rows() -> usize {
    20
}

fn default_learning_enabled() -> bool {
    true
}

/// Knowledge retrieval configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KnowledgeConfig {
    /// Number of knowledge entries retrieved per turn (1..=10).
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum cosine similarity for a knowledge entry to be included.
    #[serde(default = "default_similarity_floor")]
    pub similarity_floor: f32,

    /// Per-tenant cap on stored knowledge entries. Inserts beyond the cap
    /// evict the least-recently-accessed entry.
    #[serde(default = "default_max_entries_per_tenant")]
    pub max_entries_per_tenant: usize,

    /// Base URL of the OpenAI-compatible embeddings endpoint. `None`
    /// disables knowledge retrieval entirely.
    #[serde(default)]
    pub embeddings_base_url: Option<String>,

    /// Embedding model name sent to the endpoint.
    #[serde(default = "default_embeddings_model")]
    pub embeddings_model: String,

    /// Vault credential id holding the embeddings API key, if required.
    #[serde(default)]
    pub embeddings_credential_id: Option<String>,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            similarity_floor: default_similarity_floor(),
            max_entries_per_tenant: default_max_entries_per_tenant(),
            embeddings_base_url: None,
            embeddings_model: default_embeddings_model(),
            embeddings_credential_id: None,
        }
    }
}

fn default_top_k() -> usize {
    5
}

fn default_similarity_floor() -> f32 {
    0.35
}

fn default_max_entries_per_tenant() -> usize {
    200
}

fn default_embeddings_model() -> String {
    "text-embedding-3-small".to_string()
}

/// Per-IP rate limiting for the chat endpoint. Best-effort and scoped to
/// one deployment instance; not cluster-consistent.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Maximum requests per window per client IP.
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds. Also the eviction sweep interval.
    #[serde(default = "default_rate_window_secs")]
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_rate_window_secs(),
        }
    }
}

fn default_max_requests() -> u32 {
    20
}

fn default_rate_window_secs() -> u64 {
    60
}

/// Credential vault configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VaultConfig {
    /// Environment variable holding the base64-encoded 32-byte master key.
    #[serde(default = "default_key_env")]
    pub key_env: String,

    /// Path to a file holding the base64-encoded master key. The
    /// environment variable takes precedence when both are set.
    #[serde(default)]
    pub key_file: Option<String>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            key_env: default_key_env(),
            key_file: None,
        }
    }
}

fn default_key_env() -> String {
    "KONTOR_VAULT_KEY".to_string()
}
