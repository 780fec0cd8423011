// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `kontor credential` command implementation.
//!
//! Seals provider API keys into the vault and lists what is stored.
//! Secrets are read from a hidden TTY prompt, or from stdin when piped,
//! never from argv.

use std::io::IsTerminal;

use clap::Subcommand;
use kontor_config::model::KontorConfig;
use kontor_core::KontorError;
use kontor_storage::Database;
use kontor_vault::{CredentialVault, resolve_master_key};
use secrecy::SecretString;

/// Credential management actions.
#[derive(Subcommand, Debug)]
pub enum CredentialAction {
    /// Seal a secret under a name and print its credential id.
    Set {
        /// Human-readable name, e.g. "openai-prod".
        name: String,
    },
    /// List stored credentials.
    List,
}

/// Run the `kontor credential` command.
pub async fn run(config: &KontorConfig, action: CredentialAction) -> Result<(), KontorError> {
    let db = Database::open(&config.storage).await?;
    let master_key = resolve_master_key(&config.vault)?;
    let vault = CredentialVault::new(master_key, db);

    match action {
        CredentialAction::Set { name } => {
            let secret = read_secret()?;
            let credential_id = vault.store(&name, &secret).await?;
            println!("stored credential '{name}' as {credential_id}");
            println!("reference it from llm_settings.credential_id");
        }
        CredentialAction::List => {
            let credentials = vault.list().await?;
            if credentials.is_empty() {
                println!("no credentials stored");
                return Ok(());
            }
            println!("{:<38} {:<24} {}", "ID", "NAME", "CREATED");
            for info in credentials {
                println!("{:<38} {:<24} {}", info.id, info.name, info.created_at);
            }
        }
    }
    Ok(())
}

/// Read the secret from a hidden prompt, or one line of stdin when piped.
fn read_secret() -> Result<SecretString, KontorError> {
    if std::io::stdin().is_terminal() {
        eprint!("Secret value: ");
        let value = rpassword::read_password()
            .map_err(|e| KontorError::Vault(format!("failed to read secret: {e}")))?;
        if value.is_empty() {
            return Err(KontorError::Vault("empty secret not allowed".to_string()));
        }
        return Ok(SecretString::from(value));
    }

    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .map_err(|e| KontorError::Vault(format!("failed to read secret from stdin: {e}")))?;
    let value = line.trim_end_matches(['\r', '\n']).to_string();
    if value.is_empty() {
        return Err(KontorError::Vault("empty secret not allowed".to_string()));
    }
    Ok(SecretString::from(value))
}
