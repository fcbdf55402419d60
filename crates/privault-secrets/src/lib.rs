//! privault-secrets: platform credential store and device-bound key wrapping
//!
//! Two collaborators live here:
//! - [`store::CredentialStore`] — durable, access-controlled key/value store
//!   for the vault's handful of opaque secret records (platform keychain via
//!   `keyring`, in-memory backend for tests);
//! - [`hardware::HardwareKeyAgent`] — the device-bound X25519 pair used to
//!   wrap the master key, gated by a user-presence check.

pub mod hardware;
pub mod store;

pub use hardware::{AllowAllGate, AuthContext, HardwareKeyAgent, PresenceGate};
pub use store::{accounts, CredentialStore, KeyringStore, MemoryStore};
