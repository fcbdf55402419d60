use thiserror::Error;

pub type VaultResult<T> = Result<T, VaultError>;

/// Error taxonomy for the vault core.
///
/// The first five variants are the ones collaborating layers dispatch on:
/// `AuthorizationRequired` means "re-prompt and hand back a context",
/// `AuthorizationDenied` means the user declined or the presence check timed
/// out, and `AuthenticationFailed` always means "wrong credential", never
/// "corrupt data" — the cipher does not let callers tell those apart.
#[derive(Debug, Error)]
pub enum VaultError {
    /// No cached master key and no authorization context. Recoverable:
    /// the caller obtains a context and retries.
    #[error("authorization required: vault is locked")]
    AuthorizationRequired,

    /// The user declined (or failed) the user-presence challenge.
    #[error("authorization denied by user-presence check")]
    AuthorizationDenied,

    /// The hardware-resident key pair is missing. Existing wrapped records
    /// are unrecoverable through the hardware path.
    #[error("hardware key pair unavailable")]
    KeyUnavailable,

    /// AEAD tag mismatch, truncated ciphertext, or wrong key/passcode/
    /// recovery key. Intentionally a single undifferentiated case.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Recovery key text failed local validation (base64 decode to 32 bytes).
    #[error("invalid recovery key")]
    InvalidRecoveryKey,

    /// No recovery record has ever been created (or it was reset).
    #[error("no recovery record present")]
    NoRecoveryRecord,

    /// Passcode failed shape validation (fixed-length numeric).
    #[error("invalid passcode: {0}")]
    InvalidPasscode(String),

    /// Opaque platform credential-store failure. Never auto-retried.
    #[error("credential store error: {code}")]
    CredentialStore { code: String },

    /// Opaque failure in the hardware wrap/unwrap backing.
    #[error("hardware backing error: {code}")]
    Hardware { code: String },

    #[error("no vault item with id {0}")]
    ItemNotFound(String),

    /// Legacy-metadata import failure. The legacy file is left untouched;
    /// the import is retried on the next launch.
    #[error("migration error: {0}")]
    Migration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
