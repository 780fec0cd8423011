// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration for the Kontor assistant service.
//!
//! Loading order: compiled defaults, system TOML, user XDG TOML, local
//! TOML, `KONTOR_*` environment variables. Deserialization failures and
//! semantic validation failures are reported as miette diagnostics with
//! "did you mean?" suggestions.

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, figment_to_config_errors, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::KontorConfig;
pub use validation::validate_config;

/// Load from the standard hierarchy and run semantic validation.
///
/// Returns the ready-to-use config, or every collected diagnostic so the
/// caller can render them all at once and exit.
pub fn load_and_validate() -> Result<KontorConfig, Vec<ConfigError>> {
    let config = match load_config() {
        Ok(c) => c,
        Err(e) => return Err(figment_to_config_errors(e)),
    };
    validate_config(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn str_load_then_validate_roundtrip() {
        let config = load_config_from_str("[agent]\nsnapshot_rows = 30\n").unwrap();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.agent.snapshot_rows, 30);
    }

    #[test]
    fn invalid_values_surface_as_diagnostics() {
        let config = load_config_from_str("[knowledge]\ntop_k = 99\n").unwrap();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
    }
}
