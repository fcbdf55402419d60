//! Hardware-backed key wrapping (age 0.11 API)
//!
//! Owns exactly one device-bound X25519 key pair and hybrid-encrypts small
//! payloads to its public half. Private-key use is gated by a user-presence
//! check unless the caller supplies a still-valid authorization context.
//!
//! The identity secret lives in the platform credential store as a software
//! stand-in for an HSM-resident key: it is as non-extractable as the OS
//! keychain makes it, which is a documented limitation, not a guarantee.
//!
//! State machine: `NoKey → (ensure_key_pair) → KeyReady`; KeyReady persists
//! across restarts.

use age::x25519;
use privault_core::{VaultError, VaultResult};
use secrecy::ExposeSecret;
use std::future::Future;
use std::io::{Read, Write};
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::store::{accounts, CredentialStore};

/// Short-lived proof that a user-presence check succeeded recently.
///
/// Minted by [`HardwareKeyAgent::authorize`]; the collaborating UI holds it
/// and passes it back in so consecutive unwraps don't re-prompt.
#[derive(Debug, Clone)]
pub struct AuthContext {
    issued: Instant,
    ttl: Duration,
}

impl AuthContext {
    fn new(ttl: Duration) -> Self {
        Self {
            issued: Instant::now(),
            ttl,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.issued.elapsed() < self.ttl
    }
}

/// Platform-mediated user-presence check (biometric or device credential).
///
/// The returned future may suspend until the user responds; dropping it
/// abandons the prompt. Implementations must not auto-retry.
pub trait PresenceGate: Send + Sync {
    fn verify(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>>;
}

/// Gate that grants every challenge. For tests and throwaway profiles only.
pub struct AllowAllGate;

impl PresenceGate for AllowAllGate {
    fn verify(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        Box::pin(std::future::ready(true))
    }
}

/// Wraps and unwraps small payloads under the device-bound key pair.
///
/// The backing module does not support concurrent private-key operations,
/// so everything serializes through one internal mutex.
pub struct HardwareKeyAgent {
    store: Arc<dyn CredentialStore>,
    gate: Arc<dyn PresenceGate>,
    presence_timeout: Duration,
    context_ttl: Duration,
    op_lock: tokio::sync::Mutex<()>,
}

impl HardwareKeyAgent {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        gate: Arc<dyn PresenceGate>,
        presence_timeout: Duration,
        context_ttl: Duration,
    ) -> Self {
        Self {
            store,
            gate,
            presence_timeout,
            context_ttl,
            op_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Return the public half of the device key pair, creating the pair on
    /// first use. No authorization needed.
    pub async fn ensure_key_pair(&self) -> VaultResult<x25519::Recipient> {
        let _guard = self.op_lock.lock().await;
        if let Some(identity) = self.load_identity()? {
            return Ok(identity.to_public());
        }

        let identity = x25519::Identity::generate();
        self.store.put(
            accounts::HARDWARE_IDENTITY,
            identity.to_string().expose_secret().as_bytes(),
        )?;
        tracing::info!("created device key pair");
        Ok(identity.to_public())
    }

    pub fn has_key_pair(&self) -> VaultResult<bool> {
        Ok(self.store.get(accounts::HARDWARE_IDENTITY)?.is_some())
    }

    /// Hybrid-encrypt a small payload to the public key. No authorization.
    pub async fn wrap(
        &self,
        plaintext: &[u8],
        recipient: &x25519::Recipient,
    ) -> VaultResult<Vec<u8>> {
        let _guard = self.op_lock.lock().await;
        let encryptor =
            age::Encryptor::with_recipients(std::iter::once(recipient as &dyn age::Recipient))
                .map_err(|e| VaultError::Hardware {
                    code: format!("encryptor: {e}"),
                })?;

        let mut ciphertext = Vec::new();
        let mut writer = encryptor
            .wrap_output(&mut ciphertext)
            .map_err(|e| VaultError::Hardware {
                code: format!("wrap output: {e}"),
            })?;
        writer.write_all(plaintext).map_err(|e| VaultError::Hardware {
            code: format!("wrap: {e}"),
        })?;
        writer.finish().map_err(|e| VaultError::Hardware {
            code: format!("wrap finish: {e}"),
        })?;
        Ok(ciphertext)
    }

    /// Decrypt a payload with the private key.
    ///
    /// A valid `auth` skips the challenge; otherwise the presence gate runs,
    /// bounded by the configured timeout. A timed-out prompt counts as
    /// denied — never as success — and is not retried here.
    pub async fn unwrap(
        &self,
        ciphertext: &[u8],
        auth: Option<&AuthContext>,
    ) -> VaultResult<Vec<u8>> {
        if !auth.map(AuthContext::is_valid).unwrap_or(false) {
            self.challenge().await?;
        }

        let _guard = self.op_lock.lock().await;
        let identity = self.load_identity()?.ok_or(VaultError::KeyUnavailable)?;

        let decryptor = age::Decryptor::new(ciphertext).map_err(|e| VaultError::Hardware {
            code: format!("decryptor: {e}"),
        })?;
        let mut reader = decryptor
            .decrypt(std::iter::once(&identity as &dyn age::Identity))
            .map_err(|e| VaultError::Hardware {
                code: format!("unwrap: {e}"),
            })?;

        let mut plaintext = Vec::new();
        reader
            .read_to_end(&mut plaintext)
            .map_err(|e| VaultError::Hardware {
                code: format!("unwrap read: {e}"),
            })?;
        Ok(plaintext)
    }

    /// Run the presence gate once and mint a short-lived context the UI can
    /// pass back into later calls.
    pub async fn authorize(&self) -> VaultResult<AuthContext> {
        self.challenge().await?;
        Ok(AuthContext::new(self.context_ttl))
    }

    /// Delete the device key pair. Existing hardware-wrapped records become
    /// unrecoverable through this path.
    pub async fn destroy_key_pair(&self) -> VaultResult<()> {
        let _guard = self.op_lock.lock().await;
        self.store.delete(accounts::HARDWARE_IDENTITY)?;
        tracing::warn!("device key pair destroyed");
        Ok(())
    }

    async fn challenge(&self) -> VaultResult<()> {
        match tokio::time::timeout(self.presence_timeout, self.gate.verify()).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                tracing::debug!("user-presence check declined");
                Err(VaultError::AuthorizationDenied)
            }
            Err(_) => {
                tracing::debug!("user-presence check timed out");
                Err(VaultError::AuthorizationDenied)
            }
        }
    }

    fn load_identity(&self) -> VaultResult<Option<x25519::Identity>> {
        let Some(bytes) = self.store.get(accounts::HARDWARE_IDENTITY)? else {
            return Ok(None);
        };
        let text = String::from_utf8(bytes).map_err(|_| VaultError::Hardware {
            code: "identity record is not UTF-8".into(),
        })?;
        let identity = text.parse::<x25519::Identity>().map_err(|e| VaultError::Hardware {
            code: format!("identity parse: {e}"),
        })?;
        Ok(Some(identity))
    }
}
