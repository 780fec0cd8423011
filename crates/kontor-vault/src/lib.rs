// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encrypted credential vault for Kontor.
//!
//! API keys referenced by per-tenant LLM settings are sealed with
//! AES-256-GCM under an operator-managed master key and stored in the
//! shared SQLite database. Decrypted values travel as
//! `secrecy::SecretString` and are never logged.

pub mod crypto;
pub mod master_key;
pub mod store;

pub use master_key::resolve_master_key;
pub use store::{CredentialInfo, CredentialVault};
