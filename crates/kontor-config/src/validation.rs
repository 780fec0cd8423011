// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints serde attributes cannot express, such as
//! bound ranges for retrieval parameters and non-empty paths.

use crate::diagnostic::ConfigError;
use crate::model::KontorConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects all failures instead of stopping at the first, so the user can
/// fix everything in one pass.
pub fn validate_config(config: &KontorConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("server.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.agent.duplicate_window_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "agent.duplicate_window_secs must be at least 1".to_string(),
        });
    }

    if config.agent.history_max_messages == 0 {
        errors.push(ConfigError::Validation {
            message: "agent.history_max_messages must be at least 1".to_string(),
        });
    }

    if config.agent.snapshot_rows == 0 || config.agent.snapshot_rows > 50 {
        errors.push(ConfigError::Validation {
            message: format!(
                "agent.snapshot_rows must be in 1..=50, got {}",
                config.agent.snapshot_rows
            ),
        });
    }

    if config.knowledge.top_k == 0 || config.knowledge.top_k > 10 {
        errors.push(ConfigError::Validation {
            message: format!(
                "knowledge.top_k must be in 1..=10, got {}",
                config.knowledge.top_k
            ),
        });
    }

    if !(0.0..=1.0).contains(&config.knowledge.similarity_floor) {
        errors.push(ConfigError::Validation {
            message: format!(
                "knowledge.similarity_floor must be in 0.0..=1.0, got {}",
                config.knowledge.similarity_floor
            ),
        });
    }

    if config.knowledge.max_entries_per_tenant == 0 {
        errors.push(ConfigError::Validation {
            message: "knowledge.max_entries_per_tenant must be at least 1".to_string(),
        });
    }

    if config.rate_limit.max_requests == 0 {
        errors.push(ConfigError::Validation {
            message: "rate_limit.max_requests must be at least 1".to_string(),
        });
    }

    if config.rate_limit.window_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "rate_limit.window_secs must be at least 1".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
