//! Vault engine: composes the key manager, content cipher, and catalog into
//! the operation surface the application layer calls.
//!
//! One logical vault instance per process. The catalog serializes through
//! one mutex; hashing and sealing of independent items run outside it, so
//! concurrent `add_item` calls only contend on the final insert+flush.
//! Blob writes use temp-then-atomic-rename.

use privault_core::{VaultError, VaultResult};
use privault_crypto::{content_hash, open, seal};
use privault_keys::KeyLifecycleManager;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::folders::{self, FolderNode};
use crate::item::VaultItem;

const BLOBS_DIR: &str = "blobs";

pub struct VaultEngine {
    keys: Arc<KeyLifecycleManager>,
    blobs_dir: PathBuf,
    catalog: tokio::sync::Mutex<Catalog>,
    /// Monotonic creation clock: unix millis, bumped past collisions so
    /// creation order is total even within one millisecond.
    clock: AtomicU64,
}

impl VaultEngine {
    /// Create directories, import legacy metadata, sweep orphaned blobs,
    /// and return a ready engine. Idempotent; call once at startup.
    pub async fn prepare(data_dir: &Path, keys: Arc<KeyLifecycleManager>) -> VaultResult<Self> {
        let blobs_dir = data_dir.join(BLOBS_DIR);
        std::fs::create_dir_all(&blobs_dir)?;
        restrict_permissions(data_dir)?;
        restrict_permissions(&blobs_dir)?;

        let catalog = Catalog::open(data_dir)?;
        let engine = Self {
            keys,
            blobs_dir,
            catalog: tokio::sync::Mutex::new(catalog),
            clock: AtomicU64::new(0),
        };
        engine.sweep_orphans().await?;
        Ok(engine)
    }

    /// Encrypt and catalog a new item. The content hash is computed over the
    /// plaintext before encryption.
    pub async fn add_item(
        &self,
        plaintext: &[u8],
        name: &str,
        mime_type: &str,
        is_image: bool,
        category: Option<&str>,
        folder: Option<&str>,
    ) -> VaultResult<VaultItem> {
        let folder_path = folder.map(folders::normalize_folder_path).transpose()?;

        let hash = content_hash(plaintext);
        let master = self.keys.get_or_create_master_key().await?;
        let sealed = seal(plaintext, &master)?;
        drop(master);

        let storage_file_name = uuid::Uuid::new_v4().to_string();
        self.write_blob(&storage_file_name, &sealed).await?;

        let item = VaultItem {
            id: uuid::Uuid::new_v4().to_string(),
            original_name: name.to_string(),
            mime_type: mime_type.to_string(),
            size_bytes: plaintext.len() as u64,
            created_at: self.next_created_at(),
            storage_file_name,
            folder_path,
            category: category.map(String::from),
            content_hash: hash,
            is_image,
        };

        let mut catalog = self.catalog.lock().await;
        catalog.insert(item.clone());
        if let Err(e) = catalog.save() {
            // roll back: never leave a blob the catalog doesn't know about
            catalog.remove(&item.id);
            let _ = std::fs::remove_file(self.blobs_dir.join(&item.storage_file_name));
            return Err(e);
        }
        tracing::debug!(id = %item.id, size = item.size_bytes, "item added");
        Ok(item)
    }

    /// Decrypt an item's content. Requires an unlocked vault: when the
    /// master key is not resolvable this surfaces `AuthorizationRequired`
    /// rather than failing silently.
    pub async fn decrypt_item_data(&self, id: &str) -> VaultResult<Vec<u8>> {
        let item = self.get_item(id).await?;
        let master = self.keys.get_or_create_master_key().await?;

        let sealed = tokio::fs::read(self.blobs_dir.join(&item.storage_file_name)).await?;
        open(&sealed, &master)
    }

    /// Delete items: ciphertext file and record together. Unknown ids are
    /// skipped with a warning.
    pub async fn delete_items(&self, ids: &[String]) -> VaultResult<()> {
        let mut catalog = self.catalog.lock().await;
        for id in ids {
            let Some(item) = catalog.remove(id) else {
                tracing::warn!(id = %id, "delete requested for unknown item");
                continue;
            };
            match std::fs::remove_file(self.blobs_dir.join(&item.storage_file_name)) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    // flush the removals already applied so in-memory and
                    // on-disk state agree before the error surfaces
                    catalog.save()?;
                    return Err(e.into());
                }
            }
            tracing::debug!(id = %id, "item deleted");
        }
        catalog.save()
    }

    pub async fn rename_item(&self, id: &str, new_name: &str) -> VaultResult<()> {
        let mut catalog = self.catalog.lock().await;
        let item = catalog
            .get_mut(id)
            .ok_or_else(|| VaultError::ItemNotFound(id.to_string()))?;
        item.original_name = new_name.to_string();
        catalog.save()
    }

    pub async fn assign_category(&self, id: &str, category: Option<&str>) -> VaultResult<()> {
        let mut catalog = self.catalog.lock().await;
        let item = catalog
            .get_mut(id)
            .ok_or_else(|| VaultError::ItemNotFound(id.to_string()))?;
        item.category = category.map(String::from);
        catalog.save()
    }

    /// Move items into a folder (`None` = vault root).
    pub async fn assign_folder(&self, ids: &[String], folder: Option<&str>) -> VaultResult<()> {
        let folder_path = folder.map(folders::normalize_folder_path).transpose()?;

        let mut catalog = self.catalog.lock().await;
        for id in ids {
            let item = catalog
                .get_mut(id)
                .ok_or_else(|| VaultError::ItemNotFound(id.to_string()))?;
            item.folder_path = folder_path.clone();
        }
        if let Some(path) = &folder_path {
            catalog.empty_folders_mut().remove(path);
        }
        catalog.save()
    }

    /// Create an explicit empty-folder marker; no item infers a folder's
    /// existence until something is stored in it.
    pub async fn create_folder(&self, path: &str) -> VaultResult<()> {
        let path = folders::normalize_folder_path(path)?;
        let mut catalog = self.catalog.lock().await;
        catalog.add_empty_folder(path);
        catalog.save()
    }

    /// Move a folder: rewrites the folder-path prefix of every contained
    /// item and marker, descendants included.
    pub async fn move_folder(&self, from: &str, to: &str) -> VaultResult<()> {
        let from = folders::normalize_folder_path(from)?;
        let to = folders::normalize_folder_path(to)?;
        if from == to || to.starts_with(&format!("{from}/")) {
            return Err(VaultError::Other(anyhow::anyhow!(
                "cannot move folder '{from}' into '{to}'"
            )));
        }

        let mut catalog = self.catalog.lock().await;
        let ids: Vec<String> = catalog.items().map(|i| i.id.clone()).collect();
        for id in ids {
            if let Some(item) = catalog.get_mut(&id) {
                if let Some(current) = &item.folder_path {
                    if let Some(rewritten) = rewrite_prefix(current, &from, &to) {
                        item.folder_path = Some(rewritten);
                    }
                }
            }
        }

        let markers: Vec<String> = catalog.empty_folders().iter().cloned().collect();
        for marker in markers {
            if let Some(rewritten) = rewrite_prefix(&marker, &from, &to) {
                catalog.empty_folders_mut().remove(&marker);
                catalog.empty_folders_mut().insert(rewritten);
            }
        }
        catalog.save()
    }

    /// Groups of items sharing an identical content hash, each group and the
    /// group list ordered by creation time ascending (first = "original").
    pub async fn find_exact_duplicates(&self) -> Vec<Vec<VaultItem>> {
        let catalog = self.catalog.lock().await;
        let mut by_hash: std::collections::HashMap<&str, Vec<&VaultItem>> =
            std::collections::HashMap::new();
        for item in catalog.items() {
            by_hash.entry(&item.content_hash).or_default().push(item);
        }

        let mut groups: Vec<Vec<VaultItem>> = by_hash
            .into_values()
            .filter(|group| group.len() > 1)
            .map(|group| {
                let mut group: Vec<VaultItem> = group.into_iter().cloned().collect();
                group.sort_by_key(|i| i.created_at);
                group
            })
            .collect();
        groups.sort_by_key(|group| group[0].created_at);
        groups
    }

    pub async fn folder_nodes(&self) -> Vec<FolderNode> {
        let catalog = self.catalog.lock().await;
        let items: Vec<VaultItem> = catalog.items().cloned().collect();
        folders::folder_nodes(&items, catalog.empty_folders())
    }

    pub async fn folder_children(&self, path: &str) -> Vec<FolderNode> {
        let catalog = self.catalog.lock().await;
        let items: Vec<VaultItem> = catalog.items().cloned().collect();
        folders::folder_children(path, &items, catalog.empty_folders())
    }

    /// Sum of plaintext sizes of all cataloged items.
    pub async fn total_storage_bytes(&self) -> u64 {
        let catalog = self.catalog.lock().await;
        catalog.items().map(|i| i.size_bytes).sum()
    }

    pub async fn list_items(&self) -> Vec<VaultItem> {
        let catalog = self.catalog.lock().await;
        let mut items: Vec<VaultItem> = catalog.items().cloned().collect();
        items.sort_by_key(|i| i.created_at);
        items
    }

    pub async fn get_item(&self, id: &str) -> VaultResult<VaultItem> {
        let catalog = self.catalog.lock().await;
        catalog
            .get(id)
            .cloned()
            .ok_or_else(|| VaultError::ItemNotFound(id.to_string()))
    }

    async fn write_blob(&self, name: &str, sealed: &[u8]) -> VaultResult<()> {
        let final_path = self.blobs_dir.join(name);
        let tmp_path = self.blobs_dir.join(format!("{name}.tmp"));
        tokio::fs::write(&tmp_path, sealed).await?;
        tokio::fs::rename(&tmp_path, &final_path).await?;
        Ok(())
    }

    /// Remove blob files no catalog record references. Covers the crash
    /// window between blob write and catalog flush.
    async fn sweep_orphans(&self) -> VaultResult<()> {
        let catalog = self.catalog.lock().await;
        let referenced: std::collections::HashSet<&str> = catalog
            .items()
            .map(|i| i.storage_file_name.as_str())
            .collect();

        let mut swept = 0usize;
        for entry in std::fs::read_dir(&self.blobs_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !referenced.contains(name.as_ref()) {
                std::fs::remove_file(entry.path())?;
                swept += 1;
            }
        }
        if swept > 0 {
            tracing::warn!(swept, "removed orphaned ciphertext blobs");
        }
        Ok(())
    }

    fn next_created_at(&self) -> u64 {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let mut last = self.clock.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match self
                .clock
                .compare_exchange(last, next, Ordering::SeqCst, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(observed) => last = observed,
            }
        }
    }
}

/// If `path` is `from` or lies under it, return it rebased onto `to`.
fn rewrite_prefix(path: &str, from: &str, to: &str) -> Option<String> {
    if path == from {
        Some(to.to_string())
    } else {
        path.strip_prefix(&format!("{from}/"))
            .map(|rest| format!("{to}/{rest}"))
    }
}

#[cfg(unix)]
fn restrict_permissions(dir: &Path) -> VaultResult<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_dir: &Path) -> VaultResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_prefix() {
        assert_eq!(rewrite_prefix("A", "A", "C"), Some("C".into()));
        assert_eq!(rewrite_prefix("A/B", "A", "C"), Some("C/B".into()));
        assert_eq!(rewrite_prefix("A/B/D", "A/B", "C"), Some("C/D".into()));
        assert_eq!(rewrite_prefix("AB", "A", "C"), None);
        assert_eq!(rewrite_prefix("X/Y", "A", "C"), None);
    }
}
