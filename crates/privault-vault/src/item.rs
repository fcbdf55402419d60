//! Vault item metadata
//!
//! One record per encrypted blob. The ciphertext file on disk is named by
//! `storage_file_name` (random, globally unique) and carries no header; all
//! metadata lives here in the catalog.

use serde::{Deserialize, Serialize};

/// Metadata for a single encrypted item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultItem {
    /// UUID v4, assigned on import
    pub id: String,
    /// User-facing file name
    pub original_name: String,
    pub mime_type: String,
    /// Plaintext size in bytes
    pub size_bytes: u64,
    /// Unix timestamp in milliseconds, strictly increasing per vault
    pub created_at: u64,
    /// Random name of the ciphertext blob on disk
    pub storage_file_name: String,
    /// "/"-joined ancestor chain, e.g. "Trips/2024"; `None` = vault root
    #[serde(default)]
    pub folder_path: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// SHA-256 of the plaintext, 64 lowercase hex chars; the dedup identity
    pub content_hash: String,
    #[serde(default)]
    pub is_image: bool,
}

/// Entry shape of the retired flat metadata file, kept only for the one-shot
/// import. Early builds had no folders, categories, or ids.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyItem {
    pub original_name: String,
    #[serde(default = "default_mime")]
    pub mime_type: String,
    pub size_bytes: u64,
    pub storage_file_name: String,
    pub content_hash: String,
    #[serde(default)]
    pub created_at: Option<u64>,
    #[serde(default)]
    pub is_image: bool,
}

fn default_mime() -> String {
    "application/octet-stream".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_json_roundtrip() {
        let item = VaultItem {
            id: "abc".into(),
            original_name: "a.txt".into(),
            mime_type: "text/plain".into(),
            size_bytes: 5,
            created_at: 1700000000000,
            storage_file_name: "deadbeef".into(),
            folder_path: Some("Trips/2024".into()),
            category: None,
            content_hash: "00".repeat(32),
            is_image: false,
        };
        let json = serde_json::to_string(&item).unwrap();
        let back: VaultItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, "abc");
        assert_eq!(back.folder_path.as_deref(), Some("Trips/2024"));
    }

    #[test]
    fn test_legacy_item_minimal_fields() {
        let json = r#"{
            "original_name": "old.jpg",
            "size_bytes": 10,
            "storage_file_name": "f1",
            "content_hash": "aa"
        }"#;
        let legacy: LegacyItem = serde_json::from_str(json).unwrap();
        assert_eq!(legacy.mime_type, "application/octet-stream");
        assert_eq!(legacy.created_at, None);
        assert!(!legacy.is_image);
    }
}
