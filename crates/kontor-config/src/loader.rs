// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports the XDG hierarchy: `./kontor.toml` > `~/.config/kontor/kontor.toml`
//! > `/etc/kontor/kontor.toml`, with environment variable overrides via the
//! `KONTOR_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::KontorConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/kontor/kontor.toml` (system-wide)
/// 3. `~/.config/kontor/kontor.toml` (user XDG config)
/// 4. `./kontor.toml` (local directory)
/// 5. `KONTOR_*` environment variables
pub fn load_config() -> Result<KontorConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and embedded defaults.
pub fn load_config_from_str(toml_content: &str) -> Result<KontorConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KontorConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<KontorConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KontorConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(KontorConfig::default()))
        .merge(Toml::file("/etc/kontor/kontor.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("kontor/kontor.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("kontor.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` instead of `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `KONTOR_AGENT_DUPLICATE_WINDOW_SECS`
/// must map to `agent.duplicate_window_secs`, not `agent.duplicate.…`.
fn env_provider() -> Env {
    Env::prefixed("KONTOR_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("server_", "server.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("agent_", "agent.", 1)
            .replacen("knowledge_", "knowledge.", 1)
            .replacen("rate_limit_", "rate_limit.", 1)
            .replacen("vault_", "vault.", 1);
        mapped.into()
    })
}
