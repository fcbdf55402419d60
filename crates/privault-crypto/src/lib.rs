//! privault-crypto: stateless content encryption primitives
//!
//! Key hierarchy:
//! ```text
//! Master Key (256-bit, random, created once per installation)
//!   ├── content AEAD: XChaCha20-Poly1305 (nonce + tag embedded in the blob)
//!   ├── wrapped under the hardware key pair   (hardware unlock path)
//!   ├── wrapped under an Argon2id passcode key (passcode unlock path)
//!   └── wrapped under a random recovery key    (one-time escrow)
//! ```
//!
//! All operations here are pure functions over byte slices; callers own
//! serialization of sealed blobs and key records.

pub mod cipher;
pub mod hash;
pub mod kdf;
pub mod keys;

pub use cipher::{open, seal};
pub use hash::content_hash;
pub use kdf::{derive_passcode_key, passcode_verifier, KdfParams};
pub use keys::{unwrap_master_key, wrap_master_key, MasterKey};

/// Size of a master key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an XChaCha20-Poly1305 nonce (192-bit)
pub const NONCE_SIZE: usize = 24;

/// Size of a Poly1305 authentication tag
pub const TAG_SIZE: usize = 16;

/// Size of a passcode KDF salt
pub const SALT_SIZE: usize = 16;
