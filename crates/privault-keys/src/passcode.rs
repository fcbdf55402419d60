//! App-passcode unlock path
//!
//! A fixed-length numeric code is the hardware-free alternative to the
//! biometric path. Wrong codes are rejected by a constant-time verifier
//! comparison before any KDF work happens; a failed attempt is terminal —
//! whether to re-prompt is the caller's call.

use privault_core::{VaultError, VaultResult};
use privault_crypto::{
    derive_passcode_key, passcode_verifier, unwrap_master_key, wrap_master_key, KdfParams,
    MasterKey, SALT_SIZE,
};
use rand::RngCore;
use secrecy::SecretString;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::records::PasscodeRecord;

/// Required passcode length (digits)
pub const PASSCODE_LEN: usize = 6;

/// Shape validation: exactly [`PASSCODE_LEN`] ASCII digits.
pub fn validate_passcode(code: &str) -> VaultResult<()> {
    if code.len() != PASSCODE_LEN || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VaultError::InvalidPasscode(format!(
            "expected {PASSCODE_LEN} digits"
        )));
    }
    Ok(())
}

/// Derive a fresh salt, wrap the master key under the passcode key, and
/// produce the record to persist.
pub fn build_record(
    code: &SecretString,
    master: &MasterKey,
    params: &KdfParams,
) -> VaultResult<PasscodeRecord> {
    let mut salt = [0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);

    let mut kek = derive_passcode_key(code, &salt, params)?;
    let wrapped = wrap_master_key(&kek, master);
    kek.zeroize();

    let verifier = passcode_verifier(&salt, code);
    Ok(PasscodeRecord::new(&salt, &verifier, &wrapped?))
}

/// Constant-time check of the fast verifier. `false` means wrong passcode.
pub fn verify(record: &PasscodeRecord, code: &SecretString) -> VaultResult<bool> {
    let salt = record.salt_bytes()?;
    let stored = record.verifier_bytes()?;
    let computed = passcode_verifier(&salt, code);
    Ok(bool::from(computed.ct_eq(&stored)))
}

/// Re-derive the passcode key and unwrap the master key. Callers run
/// [`verify`] first; an `AuthenticationFailed` here means a corrupt record.
pub fn unlock(
    record: &PasscodeRecord,
    code: &SecretString,
    params: &KdfParams,
) -> VaultResult<MasterKey> {
    let salt = record.salt_bytes()?;
    let mut kek = derive_passcode_key(code, &salt, params)?;
    let master = unwrap_master_key(&kek, &record.wrapped_key_bytes()?);
    kek.zeroize();
    master
}
