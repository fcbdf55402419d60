//! One-time recovery key escrow
//!
//! The recovery key is base64 of 32 random bytes, shown to the user exactly
//! once and never stored. Validation is local only: the text either decodes
//! to 32 bytes or it doesn't — whether it is the *right* key is decided by
//! the authenticated decrypt of the escrow record.

use privault_core::{VaultError, VaultResult};
use privault_crypto::KEY_SIZE;
use rand::RngCore;

/// Generate a fresh recovery key: raw bytes plus the user-facing text.
pub fn generate_recovery_key() -> ([u8; KEY_SIZE], String) {
    let mut key = [0u8; KEY_SIZE];
    rand::thread_rng().fill_bytes(&mut key);
    let text = base64_encode(&key);
    (key, text)
}

/// Decode user-entered recovery text. Anything that is not base64 of
/// exactly 32 bytes is `InvalidRecoveryKey`.
pub fn decode_recovery_key(text: &str) -> VaultResult<[u8; KEY_SIZE]> {
    let bytes = base64_decode(text.trim()).map_err(|_| VaultError::InvalidRecoveryKey)?;
    bytes.try_into().map_err(|_| VaultError::InvalidRecoveryKey)
}

fn base64_encode(data: &[u8]) -> String {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    STANDARD.encode(data)
}

fn base64_decode(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    STANDARD.decode(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_decode_roundtrip() {
        let (key, text) = generate_recovery_key();
        assert_eq!(decode_recovery_key(&text).unwrap(), key);
    }

    #[test]
    fn test_whitespace_tolerated() {
        let (key, text) = generate_recovery_key();
        assert_eq!(decode_recovery_key(&format!("  {text}\n")).unwrap(), key);
    }

    #[test]
    fn test_invalid_text_rejected() {
        for bad in ["not base64 at all!!!", "", "aGVsbG8="] {
            assert!(
                matches!(
                    decode_recovery_key(bad),
                    Err(VaultError::InvalidRecoveryKey)
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_keys_differ() {
        let (a, _) = generate_recovery_key();
        let (b, _) = generate_recovery_key();
        assert_ne!(a, b);
    }
}
