pub mod config;
pub mod error;

pub use error::{VaultError, VaultResult};
