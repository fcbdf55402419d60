use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::VaultResult;

/// Top-level vault configuration (loaded from privault.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    pub storage: StorageConfig,
    pub crypto: CryptoConfig,
    pub lock: LockConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory for the catalog and ciphertext blobs
    /// (default: ~/.local/share/privault)
    pub data_dir: PathBuf,
    /// Service name used for platform credential-store entries
    pub credential_service: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Argon2id memory cost in KiB (default: 65536 = 64 MiB)
    pub argon2_mem_cost_kib: u32,
    /// Argon2id time cost (iterations, default: 3)
    pub argon2_time_cost: u32,
    /// Argon2id parallelism (default: 4)
    pub argon2_parallelism: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Seconds of inactivity before the cached master key is dropped
    /// (0 disables the inactivity lock)
    pub auto_lock_secs: u64,
    /// Lifetime of a minted authorization context in seconds
    pub auth_context_ttl_secs: u64,
    /// Upper bound on a user-presence prompt; expiry counts as denied
    pub presence_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            credential_service: "privault".into(),
        }
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            argon2_mem_cost_kib: 65536,
            argon2_time_cost: 3,
            argon2_parallelism: 4,
        }
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            auto_lock_secs: 300,
            auth_context_ttl_secs: 30,
            presence_timeout_secs: 60,
        }
    }
}

fn default_data_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".local/share/privault")
}

impl VaultConfig {
    /// Load configuration from a TOML file. A missing file yields defaults.
    pub fn load(path: &Path) -> VaultResult<Self> {
        if !path.exists() {
            tracing::warn!(
                "config file not found: {}  (using defaults)",
                path.display()
            );
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("parsing config {}: {e}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[storage]
data_dir = "/tmp/pv-test"
credential_service = "privault-test"

[crypto]
argon2_mem_cost_kib = 1024
argon2_time_cost = 1
argon2_parallelism = 1

[lock]
auto_lock_secs = 60
auth_context_ttl_secs = 10
presence_timeout_secs = 5
"#;
        let config: VaultConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/pv-test"));
        assert_eq!(config.storage.credential_service, "privault-test");
        assert_eq!(config.crypto.argon2_mem_cost_kib, 1024);
        assert_eq!(config.lock.auto_lock_secs, 60);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: VaultConfig = toml::from_str("").unwrap();
        assert_eq!(config.storage.credential_service, "privault");
        assert_eq!(config.crypto.argon2_mem_cost_kib, 65536);
        assert_eq!(config.lock.auto_lock_secs, 300);
        assert_eq!(config.lock.presence_timeout_secs, 60);
    }

    #[test]
    fn test_partial_config_fills_rest() {
        let config: VaultConfig = toml::from_str("[lock]\nauto_lock_secs = 0\n").unwrap();
        assert_eq!(config.lock.auto_lock_secs, 0);
        assert_eq!(config.lock.auth_context_ttl_secs, 30);
        assert_eq!(config.crypto.argon2_time_cost, 3);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = VaultConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: VaultConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(
            parsed.storage.credential_service,
            config.storage.credential_service
        );
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let config = VaultConfig::load(Path::new("/nonexistent/privault.toml")).unwrap();
        assert_eq!(config.storage.credential_service, "privault");
    }
}
