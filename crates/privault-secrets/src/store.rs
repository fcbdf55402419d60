//! Durable, access-controlled storage for opaque secret blobs.
//!
//! The platform backend uses the `keyring` crate:
//! - macOS: Keychain Services
//! - Linux: GNOME Keyring / Secret Service (D-Bus)
//! - Windows: Credential Manager (DPAPI)
//!
//! Values go through the keyring string API base64-coded. Absence of a
//! record is a normal `Ok(None)`, never an error.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use privault_core::{VaultError, VaultResult};
use std::collections::HashMap;
use std::sync::Mutex;
use zeroize::Zeroize;

/// Key/value store for the handful of secret records the vault keeps.
pub trait CredentialStore: Send + Sync {
    /// Insert or overwrite the record under `account`.
    fn put(&self, account: &str, value: &[u8]) -> VaultResult<()>;

    /// Fetch the record under `account`; `None` if absent.
    fn get(&self, account: &str) -> VaultResult<Option<Vec<u8>>>;

    /// Remove the record under `account`; absent records are a no-op.
    fn delete(&self, account: &str) -> VaultResult<()>;
}

/// Well-known account names, each a fixed (service, account) pair.
/// Presence or absence of these records governs which unlock paths the
/// collaborating UI offers.
pub mod accounts {
    /// Master key wrapped under the hardware key pair (JSON record)
    pub const WRAPPED_MASTER_KEY: &str = "master-key.hardware";
    /// Passcode salt, verifier, and passcode-wrapped master key (JSON record)
    pub const PASSCODE_RECORD: &str = "master-key.passcode";
    /// Master key sealed under the one-time recovery key (JSON record)
    pub const RECOVERY_RECORD: &str = "master-key.recovery";
    /// The hardware identity secret (software HSM stand-in)
    pub const HARDWARE_IDENTITY: &str = "hardware-identity";
}

/// Platform keychain backend.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, account: &str) -> VaultResult<keyring::Entry> {
        keyring::Entry::new(&self.service, account).map_err(|e| VaultError::CredentialStore {
            code: format!("entry creation: {e}"),
        })
    }
}

impl CredentialStore for KeyringStore {
    fn put(&self, account: &str, value: &[u8]) -> VaultResult<()> {
        let encoded = STANDARD.encode(value);
        self.entry(account)?
            .set_password(&encoded)
            .map_err(|e| VaultError::CredentialStore {
                code: format!("put '{account}': {e}"),
            })?;
        tracing::debug!(account, "stored secret record in platform keychain");
        Ok(())
    }

    fn get(&self, account: &str) -> VaultResult<Option<Vec<u8>>> {
        match self.entry(account)?.get_password() {
            Ok(mut encoded) => {
                let decoded = STANDARD.decode(&encoded);
                encoded.zeroize();
                let value = decoded.map_err(|e| VaultError::CredentialStore {
                    code: format!("corrupt record '{account}': {e}"),
                })?;
                Ok(Some(value))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(VaultError::CredentialStore {
                code: format!("get '{account}': {e}"),
            }),
        }
    }

    fn delete(&self, account: &str) -> VaultResult<()> {
        match self.entry(account)?.delete_credential() {
            Ok(()) => {
                tracing::debug!(account, "deleted secret record from platform keychain");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()), // already deleted
            Err(e) => Err(VaultError::CredentialStore {
                code: format!("delete '{account}': {e}"),
            }),
        }
    }
}

/// In-memory backend for tests and throwaway profiles.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn put(&self, account: &str, value: &[u8]) -> VaultResult<()> {
        self.entries
            .lock()
            .map_err(|_| VaultError::CredentialStore {
                code: "memory store poisoned".into(),
            })?
            .insert(account.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, account: &str) -> VaultResult<Option<Vec<u8>>> {
        Ok(self
            .entries
            .lock()
            .map_err(|_| VaultError::CredentialStore {
                code: "memory store poisoned".into(),
            })?
            .get(account)
            .cloned())
    }

    fn delete(&self, account: &str) -> VaultResult<()> {
        self.entries
            .lock()
            .map_err(|_| VaultError::CredentialStore {
                code: "memory store poisoned".into(),
            })?
            .remove(account);
        Ok(())
    }
}
