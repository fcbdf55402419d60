//! Master-key lifecycle orchestration
//!
//! One explicitly constructed manager per process, injected by the
//! composition root. Holds the only in-memory copy of the master key and the
//! current authorization context; both live behind a single mutex and both
//! die on `clear_master_key_from_memory` (backgrounding, inactivity) or on
//! reset.
//!
//! Two independent unlock paths resolve to the same key value:
//! hardware (wrapped record + authorization context) and passcode
//! (Argon2id-wrapped record). The recovery key is the sole durable
//! disaster-recovery path; redeeming it re-wraps the key under the hardware
//! pair — the key itself is never rotated.

use privault_core::{VaultError, VaultResult};
use privault_crypto::{unwrap_master_key, wrap_master_key, KdfParams, MasterKey};
use privault_secrets::{accounts, AuthContext, CredentialStore, HardwareKeyAgent};
use secrecy::SecretString;
use std::sync::Arc;
use std::time::{Duration, Instant};
use zeroize::Zeroize;

use crate::passcode;
use crate::records::{PasscodeRecord, RecoveryRecord, WrappedKeyRecord};
use crate::recovery;

struct KeyState {
    cached: Option<MasterKey>,
    auth: Option<AuthContext>,
    last_used: Option<Instant>,
}

impl KeyState {
    fn cache(&mut self, key: MasterKey) {
        self.cached = Some(key);
        self.last_used = Some(Instant::now());
    }

    fn clear(&mut self) {
        // MasterKey zeroizes on drop
        self.cached = None;
        self.auth = None;
        self.last_used = None;
    }
}

pub struct KeyLifecycleManager {
    store: Arc<dyn CredentialStore>,
    agent: Arc<HardwareKeyAgent>,
    kdf: KdfParams,
    auto_lock: Duration,
    state: tokio::sync::Mutex<KeyState>,
}

impl KeyLifecycleManager {
    /// `auto_lock` of zero disables the inactivity lock.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        agent: Arc<HardwareKeyAgent>,
        kdf: KdfParams,
        auto_lock: Duration,
    ) -> Self {
        Self {
            store,
            agent,
            kdf,
            auto_lock,
            state: tokio::sync::Mutex::new(KeyState {
                cached: None,
                auth: None,
                last_used: None,
            }),
        }
    }

    /// Hand in an authorization context minted by
    /// [`HardwareKeyAgent::authorize`]. The collaborating UI owns scheduling
    /// of re-authentication; the core never prompts on its own here.
    pub async fn set_authorization(&self, ctx: AuthContext) {
        let mut state = self.state.lock().await;
        state.auth = Some(ctx);
    }

    /// Resolve the master key: cache → hardware unwrap → first-run creation.
    ///
    /// With a wrapped record present and no valid context, this is
    /// `AuthorizationRequired` — the caller obtains a context and retries.
    pub async fn get_or_create_master_key(&self) -> VaultResult<MasterKey> {
        let mut state = self.state.lock().await;
        self.expire_if_idle(&mut state);

        if let Some(key) = &state.cached {
            let key = key.clone();
            state.last_used = Some(Instant::now());
            return Ok(key);
        }

        match self.store.get(accounts::WRAPPED_MASTER_KEY)? {
            Some(bytes) => {
                let record = WrappedKeyRecord::from_bytes(&bytes)?;
                let auth = state
                    .auth
                    .clone()
                    .filter(|c| c.is_valid())
                    .ok_or(VaultError::AuthorizationRequired)?;

                let mut key_bytes = self
                    .agent
                    .unwrap(&record.ciphertext_bytes()?, Some(&auth))
                    .await?;
                let key = MasterKey::from_slice(&key_bytes);
                key_bytes.zeroize();
                let key = key?;

                state.cache(key.clone());
                tracing::debug!("master key unwrapped via hardware path");
                Ok(key)
            }
            None => {
                let key = MasterKey::generate();
                let recipient = self.agent.ensure_key_pair().await?;
                let wrapped = self.agent.wrap(key.as_bytes(), &recipient).await?;
                self.store.put(
                    accounts::WRAPPED_MASTER_KEY,
                    &WrappedKeyRecord::new(&wrapped).to_bytes()?,
                )?;
                state.cache(key.clone());
                tracing::info!("created and wrapped new master key");
                Ok(key)
            }
        }
    }

    /// Wrap the current master key under a passcode-derived key and persist
    /// the record. Requires the vault to be unlockable right now.
    pub async fn set_passcode(&self, code: &str) -> VaultResult<()> {
        passcode::validate_passcode(code)?;
        let master = self.get_or_create_master_key().await?;

        let code = SecretString::from(code.to_string());
        let record = passcode::build_record(&code, &master, &self.kdf)?;
        self.store
            .put(accounts::PASSCODE_RECORD, &record.to_bytes()?)?;
        tracing::info!("passcode unlock path configured");
        Ok(())
    }

    /// Try the passcode path. `Ok(false)` means wrong (or unconfigured)
    /// passcode and caches nothing; a success replaces the cached key and
    /// drops any hardware authorization context — the two paths never share
    /// context.
    pub async fn unlock_with_passcode(&self, code: &str) -> VaultResult<bool> {
        if passcode::validate_passcode(code).is_err() {
            return Ok(false);
        }
        let Some(bytes) = self.store.get(accounts::PASSCODE_RECORD)? else {
            tracing::debug!("passcode unlock attempted with no passcode record");
            return Ok(false);
        };
        let record = PasscodeRecord::from_bytes(&bytes)?;

        let code = SecretString::from(code.to_string());
        if !passcode::verify(&record, &code)? {
            return Ok(false);
        }
        let master = passcode::unlock(&record, &code, &self.kdf)?;

        let mut state = self.state.lock().await;
        state.cache(master);
        state.auth = None;
        tracing::debug!("master key unwrapped via passcode path");
        Ok(true)
    }

    /// Escrow the master key under a fresh random recovery key and return
    /// the key text. Shown once; the manager never retains it.
    pub async fn create_recovery_key(&self) -> VaultResult<String> {
        let master = self.get_or_create_master_key().await?;

        let (mut kek, text) = recovery::generate_recovery_key();
        let sealed = wrap_master_key(&kek, &master);
        kek.zeroize();

        let record = RecoveryRecord::new(&sealed?);
        self.store
            .put(accounts::RECOVERY_RECORD, &record.to_bytes()?)?;
        tracing::info!("recovery record created");
        Ok(text)
    }

    /// Redeem a recovery key: decrypt the escrowed master key and re-wrap it
    /// under the hardware pair, replacing the wrapped record. The master key
    /// value is unchanged.
    pub async fn recover_master_key(&self, recovery_text: &str) -> VaultResult<()> {
        let mut kek = recovery::decode_recovery_key(recovery_text)?;

        let record_bytes = match self.store.get(accounts::RECOVERY_RECORD) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                kek.zeroize();
                return Err(VaultError::NoRecoveryRecord);
            }
            Err(e) => {
                kek.zeroize();
                return Err(e);
            }
        };
        let record = RecoveryRecord::from_bytes(&record_bytes)?;

        let master = record
            .sealed_key_bytes()
            .and_then(|sealed| unwrap_master_key(&kek, &sealed));
        kek.zeroize();
        let master = master?;

        let recipient = self.agent.ensure_key_pair().await?;
        let wrapped = self.agent.wrap(master.as_bytes(), &recipient).await?;
        self.store.put(
            accounts::WRAPPED_MASTER_KEY,
            &WrappedKeyRecord::new(&wrapped).to_bytes()?,
        )?;

        let mut state = self.state.lock().await;
        state.cache(master);
        tracing::info!("master key recovered and re-wrapped");
        Ok(())
    }

    /// Drop the cached key and authorization context. Called on loss of
    /// foreground focus; the inactivity window calls it implicitly.
    pub async fn clear_master_key_from_memory(&self) {
        let mut state = self.state.lock().await;
        state.clear();
        tracing::debug!("master key cleared from memory");
    }

    /// Delete every stored record and the hardware key pair. Irreversible.
    pub async fn reset_all_secrets(&self) -> VaultResult<()> {
        self.store.delete(accounts::WRAPPED_MASTER_KEY)?;
        self.store.delete(accounts::PASSCODE_RECORD)?;
        self.store.delete(accounts::RECOVERY_RECORD)?;
        self.agent.destroy_key_pair().await?;

        let mut state = self.state.lock().await;
        state.clear();
        tracing::warn!("all vault secrets reset");
        Ok(())
    }

    /// Whether a master key is currently cached (vault unlocked).
    pub async fn is_unlocked(&self) -> bool {
        let mut state = self.state.lock().await;
        self.expire_if_idle(&mut state);
        state.cached.is_some()
    }

    /// Record presence governs which unlock UI the collaborating layer offers.
    pub fn has_hardware_record(&self) -> VaultResult<bool> {
        Ok(self.store.get(accounts::WRAPPED_MASTER_KEY)?.is_some())
    }

    pub fn has_passcode(&self) -> VaultResult<bool> {
        Ok(self.store.get(accounts::PASSCODE_RECORD)?.is_some())
    }

    pub fn has_recovery_record(&self) -> VaultResult<bool> {
        Ok(self.store.get(accounts::RECOVERY_RECORD)?.is_some())
    }

    fn expire_if_idle(&self, state: &mut KeyState) {
        if self.auto_lock.is_zero() {
            return;
        }
        if let Some(last) = state.last_used {
            if last.elapsed() >= self.auto_lock {
                state.clear();
                tracing::debug!("inactivity window elapsed, vault locked");
            }
        }
    }
}
