// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Master key resolution.
//!
//! The vault master key is operator-managed: a base64-encoded 32-byte
//! value in the configured environment variable, or a key file as a
//! fallback. The environment variable wins when both are set. There is no
//! passphrase derivation; rotating the key means re-sealing credentials.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use kontor_config::model::VaultConfig;
use kontor_core::KontorError;
use zeroize::Zeroizing;

/// Resolve the master key per the vault configuration.
pub fn resolve_master_key(config: &VaultConfig) -> Result<Zeroizing<[u8; 32]>, KontorError> {
    if let Ok(value) = std::env::var(&config.key_env)
        && !value.trim().is_empty()
    {
        return decode_key(value.trim()).map_err(|e| {
            KontorError::Vault(format!("invalid key in ${}: {e}", config.key_env))
        });
    }

    if let Some(path) = &config.key_file {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| KontorError::Vault(format!("cannot read key file {path}: {e}")))?;
        return decode_key(contents.trim())
            .map_err(|e| KontorError::Vault(format!("invalid key in file {path}: {e}")));
    }

    Err(KontorError::Vault(format!(
        "no vault master key: set ${} to a base64-encoded 32-byte key or configure vault.key_file",
        config.key_env
    )))
}

fn decode_key(encoded: &str) -> Result<Zeroizing<[u8; 32]>, String> {
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| format!("not valid base64: {e}"))?;
    let len = bytes.len();
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|_| format!("expected 32 bytes, got {len}"))?;
    Ok(Zeroizing::new(arr))
}

/// Render a key in the storable base64 form.
pub fn encode_key(key: &[u8; 32]) -> String {
    BASE64.encode(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn encode_decode_roundtrip() {
        let key = crate::crypto::generate_random_key().unwrap();
        let encoded = encode_key(&key);
        let decoded = decode_key(&encoded).unwrap();
        assert_eq!(*decoded, key);
    }

    #[test]
    fn rejects_wrong_length() {
        let short = BASE64.encode([0u8; 16]);
        assert!(decode_key(&short).is_err());
        assert!(decode_key("not-base64!!!").is_err());
    }

    #[test]
    #[serial]
    fn env_var_wins_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let file_key = crate::crypto::generate_random_key().unwrap();
        let path = dir.path().join("vault.key");
        std::fs::write(&path, encode_key(&file_key)).unwrap();

        let env_key = crate::crypto::generate_random_key().unwrap();
        unsafe { std::env::set_var("KONTOR_VAULT_KEY_TEST", encode_key(&env_key)) };

        let config = VaultConfig {
            key_env: "KONTOR_VAULT_KEY_TEST".to_string(),
            key_file: Some(path.to_string_lossy().into_owned()),
        };
        let resolved = resolve_master_key(&config).unwrap();
        assert_eq!(*resolved, env_key);

        unsafe { std::env::remove_var("KONTOR_VAULT_KEY_TEST") };
        let resolved = resolve_master_key(&config).unwrap();
        assert_eq!(*resolved, file_key);
    }

    #[test]
    #[serial]
    fn missing_key_reports_guidance() {
        unsafe { std::env::remove_var("KONTOR_VAULT_KEY_TEST") };
        let config = VaultConfig {
            key_env: "KONTOR_VAULT_KEY_TEST".to_string(),
            key_file: None,
        };
        let err = resolve_master_key(&config).unwrap_err();
        assert!(err.to_string().contains("KONTOR_VAULT_KEY_TEST"));
    }
}
