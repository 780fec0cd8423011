// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential storage: sealed API keys in the `credentials` table.
//!
//! Plaintext key material exists only transiently inside [`CredentialVault`]
//! methods and leaves them wrapped in `SecretString`. Nothing in this
//! module logs secret values.

use kontor_core::{KontorError, new_id, now_iso};
use kontor_storage::Database;
use rusqlite::{OptionalExtension, params};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;
use zeroize::Zeroizing;

use crate::crypto::{self, SealedSecret};

/// Listing row for operator tooling. Never carries secret material.
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialInfo {
    pub id: String,
    pub name: String,
    pub created_at: String,
}

/// The unlocked credential vault.
///
/// Debug output intentionally omits the master key.
#[derive(Clone)]
pub struct CredentialVault {
    master_key: Zeroizing<[u8; 32]>,
    db: Database,
}

impl std::fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVault")
            .field("master_key", &"[REDACTED]")
            .finish()
    }
}

impl CredentialVault {
    pub fn new(master_key: Zeroizing<[u8; 32]>, db: Database) -> Self {
        Self { master_key, db }
    }

    /// Seal and store a secret under a human-readable name. Returns the
    /// credential id to reference from LLM settings.
    pub async fn store(&self, name: &str, secret: &SecretString) -> Result<String, KontorError> {
        let sealed = crypto::seal(&self.master_key, secret.expose_secret().as_bytes())?;
        let id = new_id();
        let row_id = id.clone();
        let name = name.to_string();
        let created_at = now_iso();
        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO credentials (id, name, ciphertext, nonce, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![row_id, name, sealed.ciphertext, sealed.nonce.to_vec(), created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(kontor_storage::database::map_tr_err)?;
        info!(credential_id = %id, "credential stored");
        Ok(id)
    }

    /// Unseal a credential by id. `None` when no row exists.
    pub async fn resolve(&self, credential_id: &str) -> Result<Option<SecretString>, KontorError> {
        let credential_id = credential_id.to_string();
        let row: Option<(Vec<u8>, Vec<u8>)> = self
            .db
            .connection()
            .call(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT ciphertext, nonce FROM credentials WHERE id = ?1",
                        params![credential_id],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;
                Ok(row)
            })
            .await
            .map_err(kontor_storage::database::map_tr_err)?;

        let Some((ciphertext, nonce_bytes)) = row else {
            return Ok(None);
        };
        let nonce: [u8; 12] = nonce_bytes
            .try_into()
            .map_err(|_| KontorError::Vault("stored nonce is not 12 bytes".to_string()))?;
        let plaintext = crypto::open(&self.master_key, &SealedSecret { ciphertext, nonce })?;
        let value = String::from_utf8(plaintext)
            .map_err(|_| KontorError::Vault("decrypted credential is not UTF-8".to_string()))?;
        Ok(Some(SecretString::from(value)))
    }

    /// List stored credentials, newest first.
    pub async fn list(&self) -> Result<Vec<CredentialInfo>, KontorError> {
        self.db
            .connection()
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, name, created_at FROM credentials ORDER BY created_at DESC",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok(CredentialInfo {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                })?;
                let mut infos = Vec::new();
                for row in rows {
                    infos.push(row?);
                }
                Ok(infos)
            })
            .await
            .map_err(kontor_storage::database::map_tr_err)
    }

    /// Remove a credential. Returns false when no row matched.
    pub async fn delete(&self, credential_id: &str) -> Result<bool, KontorError> {
        let credential_id = credential_id.to_string();
        self.db
            .connection()
            .call(move |conn| {
                let changed = conn.execute(
                    "DELETE FROM credentials WHERE id = ?1",
                    params![credential_id],
                )?;
                Ok(changed > 0)
            })
            .await
            .map_err(kontor_storage::database::map_tr_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn make_vault() -> CredentialVault {
        let db = Database::open_in_memory().await.unwrap();
        let key = Zeroizing::new(crypto::generate_random_key().unwrap());
        CredentialVault::new(key, db)
    }

    #[tokio::test]
    async fn store_resolve_roundtrip() {
        let vault = make_vault().await;
        let secret = SecretString::from("sk-proj-test-123".to_string());
        let id = vault.store("openai production", &secret).await.unwrap();

        let resolved = vault.resolve(&id).await.unwrap().unwrap();
        assert_eq!(resolved.expose_secret(), "sk-proj-test-123");
    }

    #[tokio::test]
    async fn unknown_id_resolves_to_none() {
        let vault = make_vault().await;
        assert!(vault.resolve("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_never_exposes_material() {
        let vault = make_vault().await;
        let secret = SecretString::from("super-secret".to_string());
        vault.store("anthropic key", &secret).await.unwrap();

        let infos = vault.list().await.unwrap();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].name, "anthropic key");
        let rendered = format!("{infos:?}");
        assert!(!rendered.contains("super-secret"));
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let vault = make_vault().await;
        let id = vault
            .store("temp", &SecretString::from("x".to_string()))
            .await
            .unwrap();
        assert!(vault.delete(&id).await.unwrap());
        assert!(!vault.delete(&id).await.unwrap());
        assert!(vault.resolve(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn wrong_master_key_fails_resolve() {
        let db = Database::open_in_memory().await.unwrap();
        let vault = CredentialVault::new(
            Zeroizing::new(crypto::generate_random_key().unwrap()),
            db.clone(),
        );
        let id = vault
            .store("key", &SecretString::from("value".to_string()))
            .await
            .unwrap();

        let other = CredentialVault::new(
            Zeroizing::new(crypto::generate_random_key().unwrap()),
            db,
        );
        assert!(other.resolve(&id).await.is_err());
    }

    #[tokio::test]
    async fn debug_redacts_master_key() {
        let vault = make_vault().await;
        let rendered = format!("{vault:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("master_key: ["));
    }
}
