//! SHA-256 content hashing for dedup identity
//!
//! The hash is computed over plaintext before encryption and used as the
//! content identifier for exact-duplicate detection. Identical bytes always
//! produce an identical hash regardless of name, folder, or category.

use sha2::{Digest, Sha256};
use std::fmt::Write;

/// Hash a byte slice and return the digest as 64 lowercase hex chars.
pub fn content_hash(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    to_hex(digest.as_slice())
}

/// Raw SHA-256 digest of a byte slice.
pub fn digest_bytes(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}
