//! Master key type and symmetric key wrapping

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use privault_core::{VaultError, VaultResult};
use rand::RngCore;
use zeroize::Zeroize;

use crate::{KEY_SIZE, NONCE_SIZE, TAG_SIZE};

/// The single 256-bit symmetric key that decrypts all vault content.
/// Ephemeral: lives at most one foreground session, zeroized on drop,
/// never persisted in clear.
#[derive(Clone)]
pub struct MasterKey {
    bytes: [u8; KEY_SIZE],
}

impl MasterKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Copy key material out of a slice; fails on any length other than 32.
    pub fn from_slice(slice: &[u8]) -> VaultResult<Self> {
        if slice.len() != KEY_SIZE {
            return Err(VaultError::AuthenticationFailed);
        }
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(slice);
        Ok(Self { bytes })
    }

    /// Generate a fresh random master key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for MasterKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl PartialEq for MasterKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for MasterKey {}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Wrap (encrypt) the master key under a 256-bit key-encryption key.
///
/// Used by the passcode and recovery unlock paths. Output:
/// `[24-byte nonce][ciphertext + 16-byte tag]`
pub fn wrap_master_key(kek: &[u8; KEY_SIZE], master: &MasterKey) -> VaultResult<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(kek.into());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = XNonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, master.as_bytes().as_ref())
        .map_err(|e| anyhow::anyhow!("key wrapping failed: {e}"))?;

    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Unwrap (decrypt) the master key from `wrap_master_key` output.
///
/// Any failure — truncation, tag mismatch, wrong key — is the single
/// `AuthenticationFailed` case; callers must not distinguish them.
pub fn unwrap_master_key(kek: &[u8; KEY_SIZE], wrapped: &[u8]) -> VaultResult<MasterKey> {
    if wrapped.len() != NONCE_SIZE + KEY_SIZE + TAG_SIZE {
        return Err(VaultError::AuthenticationFailed);
    }

    let (nonce_bytes, ciphertext) = wrapped.split_at(NONCE_SIZE);
    let nonce = XNonce::from_slice(nonce_bytes);
    let cipher = XChaCha20Poly1305::new(kek.into());

    let mut plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| VaultError::AuthenticationFailed)?;

    let master = MasterKey::from_slice(&plaintext);
    plaintext.zeroize();
    master
}
