//! Persisted key records (JSON, stored as credential-store blobs)
//!
//! Three records, three independent ways back to the same master key:
//! - `WrappedKeyRecord`  — master key under the hardware key pair
//! - `PasscodeRecord`    — master key under the Argon2id passcode key
//! - `RecoveryRecord`    — master key under the one-time recovery key
//!
//! Binary fields are base64 strings; the records themselves carry no secret
//! material in clear.

use privault_core::{VaultError, VaultResult};
use serde::{Deserialize, Serialize};

/// How a `WrappedKeyRecord` ciphertext was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapMethod {
    /// Hybrid-encrypted to the device-bound key pair
    Hardware,
}

/// Master key ciphertext under the hardware public key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WrappedKeyRecord {
    pub version: u32,
    pub method: WrapMethod,
    /// Wrap ciphertext (base64)
    pub ciphertext: String,
}

impl WrappedKeyRecord {
    pub fn new(ciphertext: &[u8]) -> Self {
        Self {
            version: 1,
            method: WrapMethod::Hardware,
            ciphertext: base64_encode(ciphertext),
        }
    }

    pub fn ciphertext_bytes(&self) -> VaultResult<Vec<u8>> {
        base64_decode(&self.ciphertext)
    }

    pub fn to_bytes(&self) -> VaultResult<Vec<u8>> {
        to_json_bytes(self)
    }

    pub fn from_bytes(data: &[u8]) -> VaultResult<Self> {
        from_json_bytes(data)
    }
}

/// Salt, fast verifier, and passcode-wrapped master key.
///
/// The verifier is SHA-256(salt ‖ code) — a cheap pre-check, deliberately
/// distinct from the Argon2id output that wraps the key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasscodeRecord {
    pub version: u32,
    /// KDF salt (base64, 16 bytes)
    pub salt: String,
    /// SHA-256(salt ‖ code) (base64, 32 bytes)
    pub verifier: String,
    /// Master key wrapped under the Argon2id-derived key (base64)
    pub wrapped_key: String,
}

impl PasscodeRecord {
    pub fn new(salt: &[u8], verifier: &[u8], wrapped_key: &[u8]) -> Self {
        Self {
            version: 1,
            salt: base64_encode(salt),
            verifier: base64_encode(verifier),
            wrapped_key: base64_encode(wrapped_key),
        }
    }

    pub fn salt_bytes(&self) -> VaultResult<[u8; 16]> {
        fixed_decode(&self.salt)
    }

    pub fn verifier_bytes(&self) -> VaultResult<[u8; 32]> {
        fixed_decode(&self.verifier)
    }

    pub fn wrapped_key_bytes(&self) -> VaultResult<Vec<u8>> {
        base64_decode(&self.wrapped_key)
    }

    pub fn to_bytes(&self) -> VaultResult<Vec<u8>> {
        to_json_bytes(self)
    }

    pub fn from_bytes(data: &[u8]) -> VaultResult<Self> {
        from_json_bytes(data)
    }
}

/// Master key sealed under the recovery key. The recovery key itself is
/// shown once and never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryRecord {
    pub version: u32,
    /// Master key wrapped under the recovery key (base64)
    pub sealed_key: String,
}

impl RecoveryRecord {
    pub fn new(sealed_key: &[u8]) -> Self {
        Self {
            version: 1,
            sealed_key: base64_encode(sealed_key),
        }
    }

    pub fn sealed_key_bytes(&self) -> VaultResult<Vec<u8>> {
        base64_decode(&self.sealed_key)
    }

    pub fn to_bytes(&self) -> VaultResult<Vec<u8>> {
        to_json_bytes(self)
    }

    pub fn from_bytes(data: &[u8]) -> VaultResult<Self> {
        from_json_bytes(data)
    }
}

fn to_json_bytes<T: Serialize>(value: &T) -> VaultResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| anyhow::anyhow!("record serialization: {e}").into())
}

fn from_json_bytes<T: for<'de> Deserialize<'de>>(data: &[u8]) -> VaultResult<T> {
    serde_json::from_slice(data).map_err(|e| anyhow::anyhow!("record deserialization: {e}").into())
}

fn base64_encode(data: &[u8]) -> String {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    STANDARD.encode(data)
}

fn base64_decode(s: &str) -> VaultResult<Vec<u8>> {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    STANDARD
        .decode(s)
        .map_err(|e| anyhow::anyhow!("base64 decode: {e}").into())
}

fn fixed_decode<const N: usize>(s: &str) -> VaultResult<[u8; N]> {
    let bytes = base64_decode(s)?;
    bytes
        .try_into()
        .map_err(|_| VaultError::AuthenticationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_record_roundtrip() {
        let record = WrappedKeyRecord::new(b"opaque wrap bytes");
        let restored = WrappedKeyRecord::from_bytes(&record.to_bytes().unwrap()).unwrap();

        assert_eq!(restored.version, 1);
        assert_eq!(restored.method, WrapMethod::Hardware);
        assert_eq!(restored.ciphertext_bytes().unwrap(), b"opaque wrap bytes");
    }

    #[test]
    fn test_passcode_record_roundtrip() {
        let record = PasscodeRecord::new(&[1u8; 16], &[2u8; 32], b"wrapped");
        let restored = PasscodeRecord::from_bytes(&record.to_bytes().unwrap()).unwrap();

        assert_eq!(restored.salt_bytes().unwrap(), [1u8; 16]);
        assert_eq!(restored.verifier_bytes().unwrap(), [2u8; 32]);
        assert_eq!(restored.wrapped_key_bytes().unwrap(), b"wrapped");
    }

    #[test]
    fn test_recovery_record_roundtrip() {
        let record = RecoveryRecord::new(b"sealed");
        let restored = RecoveryRecord::from_bytes(&record.to_bytes().unwrap()).unwrap();
        assert_eq!(restored.sealed_key_bytes().unwrap(), b"sealed");
    }

    #[test]
    fn test_corrupt_record_fails() {
        assert!(WrappedKeyRecord::from_bytes(b"not json").is_err());
        assert!(PasscodeRecord::from_bytes(b"{}").is_err());
    }
}
