//! Item catalog — in-memory map persisted to a JSON file.
//!
//! Loads entirely into memory; every mutation batch is flushed atomically
//! via temp+rename. There is no partial-write recovery beyond this.
//!
//! On first load a legacy flat metadata file, if present, is imported once
//! into the catalog and then retired. A failed import aborts without
//! touching the legacy data and is retried on the next launch.

use privault_core::{VaultError, VaultResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::item::{LegacyItem, VaultItem};

const CATALOG_FILE: &str = "catalog.json";
const LEGACY_FILE: &str = "items.legacy.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    version: u32,
    items: Vec<VaultItem>,
    #[serde(default)]
    empty_folders: Vec<String>,
}

pub struct Catalog {
    file_path: PathBuf,
    items: HashMap<String, VaultItem>,
    empty_folders: BTreeSet<String>,
}

impl Catalog {
    /// Load (or create) the catalog in `dir`, importing legacy metadata
    /// first if a legacy file is still present.
    pub fn open(dir: &Path) -> VaultResult<Self> {
        let file_path = dir.join(CATALOG_FILE);
        let mut catalog = if file_path.exists() {
            let content = std::fs::read_to_string(&file_path)?;
            let parsed: CatalogFile = serde_json::from_str(&content)
                .map_err(|e| anyhow::anyhow!("parsing catalog {}: {e}", file_path.display()))?;
            Self {
                file_path,
                items: parsed
                    .items
                    .into_iter()
                    .map(|item| (item.id.clone(), item))
                    .collect(),
                empty_folders: parsed.empty_folders.into_iter().collect(),
            }
        } else {
            Self {
                file_path,
                items: HashMap::new(),
                empty_folders: BTreeSet::new(),
            }
        };

        catalog.import_legacy(dir)?;
        Ok(catalog)
    }

    /// Flush to disk: write a temp file, then atomic rename over the real one.
    pub fn save(&self) -> VaultResult<()> {
        let mut items: Vec<&VaultItem> = self.items.values().collect();
        items.sort_by_key(|i| i.created_at);

        let file = CatalogFile {
            version: 1,
            items: items.into_iter().cloned().collect(),
            empty_folders: self.empty_folders.iter().cloned().collect(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| anyhow::anyhow!("serializing catalog: {e}"))?;

        let tmp_path = self.file_path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.file_path)?;
        Ok(())
    }

    pub fn insert(&mut self, item: VaultItem) {
        // a folder with items in it no longer needs its marker
        if let Some(path) = &item.folder_path {
            self.empty_folders.remove(path);
        }
        self.items.insert(item.id.clone(), item);
    }

    pub fn get(&self, id: &str) -> Option<&VaultItem> {
        self.items.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut VaultItem> {
        self.items.get_mut(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<VaultItem> {
        self.items.remove(id)
    }

    pub fn items(&self) -> impl Iterator<Item = &VaultItem> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn empty_folders(&self) -> &BTreeSet<String> {
        &self.empty_folders
    }

    pub fn add_empty_folder(&mut self, path: String) {
        self.empty_folders.insert(path);
    }

    pub fn empty_folders_mut(&mut self) -> &mut BTreeSet<String> {
        &mut self.empty_folders
    }

    /// One-shot legacy import. Idempotent: entries whose blob is already
    /// cataloged are skipped, so a crash between save and retire cannot
    /// duplicate items.
    fn import_legacy(&mut self, dir: &Path) -> VaultResult<()> {
        let legacy_path = dir.join(LEGACY_FILE);
        if !legacy_path.exists() {
            return Ok(());
        }

        let content = std::fs::read_to_string(&legacy_path)
            .map_err(|e| VaultError::Migration(format!("reading legacy metadata: {e}")))?;
        let legacy: Vec<LegacyItem> = serde_json::from_str(&content)
            .map_err(|e| VaultError::Migration(format!("parsing legacy metadata: {e}")))?;

        let known: BTreeSet<String> = self
            .items
            .values()
            .map(|i| i.storage_file_name.clone())
            .collect();

        let mut imported = 0usize;
        for entry in legacy {
            if known.contains(&entry.storage_file_name) {
                continue;
            }
            let item = VaultItem {
                id: uuid::Uuid::new_v4().to_string(),
                original_name: entry.original_name,
                mime_type: entry.mime_type,
                size_bytes: entry.size_bytes,
                created_at: entry.created_at.unwrap_or(0),
                storage_file_name: entry.storage_file_name,
                folder_path: None,
                category: None,
                content_hash: entry.content_hash,
                is_image: entry.is_image,
            };
            self.items.insert(item.id.clone(), item);
            imported += 1;
        }

        self.save()?;
        let retired = legacy_path.with_extension("json.imported");
        std::fs::rename(&legacy_path, &retired)
            .map_err(|e| VaultError::Migration(format!("retiring legacy metadata: {e}")))?;
        tracing::info!(imported, "legacy metadata imported and retired");
        Ok(())
    }
}
