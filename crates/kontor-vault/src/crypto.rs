// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Low-level AES-256-GCM seal/open operations.
//!
//! Every call to [`seal`] generates a fresh random 96-bit nonce via the
//! system CSPRNG. Nonce reuse would be catastrophic for GCM security.

use kontor_core::KontorError;
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};

/// A sealed secret as stored in the `credentials` table: ciphertext with
/// the 16-byte GCM tag appended, plus the nonce used to seal it.
#[derive(Clone)]
pub struct SealedSecret {
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; 12],
}

/// Encrypt plaintext with AES-256-GCM under a random 96-bit nonce.
pub fn seal(key: &[u8; 32], plaintext: &[u8]) -> Result<SealedSecret, KontorError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| KontorError::Vault("failed to create AES-256-GCM key".to_string()))?;
    let less_safe = LessSafeKey::new(unbound);

    let rng = SystemRandom::new();
    let mut nonce_bytes = [0u8; 12];
    rng.fill(&mut nonce_bytes)
        .map_err(|_| KontorError::Vault("failed to generate random nonce".to_string()))?;
    let nonce = Nonce::assume_unique_for_key(nonce_bytes);

    let mut in_out = plaintext.to_vec();
    less_safe
        .seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| KontorError::Vault("AES-256-GCM encryption failed".to_string()))?;

    Ok(SealedSecret { ciphertext: in_out, nonce: nonce_bytes })
}

/// Decrypt a sealed secret. Fails when the key is wrong or the ciphertext
/// was tampered with.
pub fn open(key: &[u8; 32], sealed: &SealedSecret) -> Result<Vec<u8>, KontorError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| KontorError::Vault("failed to create AES-256-GCM key".to_string()))?;
    let less_safe = LessSafeKey::new(unbound);

    let nonce = Nonce::assume_unique_for_key(sealed.nonce);

    let mut in_out = sealed.ciphertext.clone();
    let plaintext = less_safe
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| {
            KontorError::Vault(
                "AES-256-GCM decryption failed: wrong key or corrupted data".to_string(),
            )
        })?;

    Ok(plaintext.to_vec())
}

/// Generate a random 32-byte key suitable for AES-256-GCM. Operator
/// tooling uses this to mint a fresh master key.
pub fn generate_random_key() -> Result<[u8; 32], KontorError> {
    let rng = SystemRandom::new();
    let mut key = [0u8; 32];
    rng.fill(&mut key)
        .map_err(|_| KontorError::Vault("failed to generate random key".to_string()))?;
    Ok(key)
}
