//! Content AEAD: XChaCha20-Poly1305 with embedded nonce
//!
//! Sealed blob format (binary, self-describing):
//! ```text
//! [24 bytes: random nonce][N bytes: ciphertext][16 bytes: Poly1305 tag]
//! ```
//!
//! There is no external header; item metadata lives in the catalog, not in
//! the blob.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use privault_core::{VaultError, VaultResult};
use rand::RngCore;
use zeroize::Zeroize;

use crate::keys::MasterKey;
use crate::{NONCE_SIZE, TAG_SIZE};

/// Encrypt plaintext under the master key.
///
/// Returns `[24-byte nonce][ciphertext][16-byte tag]`.
pub fn seal(plaintext: &[u8], key: &MasterKey) -> VaultResult<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = XNonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| anyhow::anyhow!("content encryption failed: {e}"))?;

    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Decrypt a sealed blob under the master key.
///
/// Tag mismatch, truncated input, and wrong key all collapse into the single
/// `AuthenticationFailed` case.
pub fn open(sealed: &[u8], key: &MasterKey) -> VaultResult<Vec<u8>> {
    if sealed.len() < NONCE_SIZE + TAG_SIZE {
        return Err(VaultError::AuthenticationFailed);
    }

    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_SIZE);
    let nonce = XNonce::from_slice(nonce_bytes);
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| VaultError::AuthenticationFailed)
}

/// Best-effort overwrite of a sensitive buffer before release.
///
/// Defense in depth, not a guarantee: the allocator and OS may have copied
/// the bytes elsewhere already.
pub fn zero(buffer: &mut [u8]) {
    buffer.zeroize();
}
