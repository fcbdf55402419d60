//! privault-keys: master-key lifecycle management
//!
//! Orchestrates master-key creation, the two alternative unlock paths
//! (hardware/biometric and app passcode), in-memory caching and zeroing,
//! and recovery-key issuance/redemption.

pub mod manager;
pub mod passcode;
pub mod records;
pub mod recovery;

pub use manager::KeyLifecycleManager;
pub use passcode::PASSCODE_LEN;
pub use records::{PasscodeRecord, RecoveryRecord, WrapMethod, WrappedKeyRecord};
