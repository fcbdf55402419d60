//! Passcode key derivation: Argon2id code → key-encryption key
//!
//! Two distinct outputs per passcode, by design:
//! - the Argon2id output wraps the master key (slow, memory-hard);
//! - a SHA-256 verifier of salt‖code gives a fast pre-check so a wrong
//!   passcode is rejected without paying the KDF cost.
//! The verifier never wraps anything and the KDF output is never stored.

use argon2::{Algorithm, Argon2, Params, Version};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

use privault_core::VaultResult;

use crate::{KEY_SIZE, SALT_SIZE};

/// Argon2id parameters for the passcode KDF
#[derive(Debug, Clone)]
pub struct KdfParams {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub mem_cost_kib: u32,
    /// Time cost / iterations (default: 3)
    pub time_cost: u32,
    /// Parallelism (default: 4)
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            mem_cost_kib: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    /// Cheap parameters for unit tests. Never use outside tests.
    pub fn insecure_fast() -> Self {
        Self {
            mem_cost_kib: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }
}

/// Derive the 256-bit passcode key-encryption key via Argon2id.
pub fn derive_passcode_key(
    code: &SecretString,
    salt: &[u8; SALT_SIZE],
    params: &KdfParams,
) -> VaultResult<[u8; KEY_SIZE]> {
    let argon2_params = Params::new(
        params.mem_cost_kib,
        params.time_cost,
        params.parallelism,
        Some(KEY_SIZE),
    )
    .map_err(|e| anyhow::anyhow!("invalid Argon2id params: {e}"))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = [0u8; KEY_SIZE];
    argon2
        .hash_password_into(code.expose_secret().as_bytes(), salt, &mut key)
        .map_err(|e| anyhow::anyhow!("Argon2id KDF failed: {e}"))?;

    Ok(key)
}

/// Fast verifier hash: SHA-256(salt ‖ code).
pub fn passcode_verifier(salt: &[u8; SALT_SIZE], code: &SecretString) -> [u8; KEY_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(code.expose_secret().as_bytes());
    hasher.finalize().into()
}
