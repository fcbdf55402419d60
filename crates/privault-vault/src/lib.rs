//! privault-vault: hierarchical metadata over encrypted blobs
//!
//! Catalogs items and folders, places ciphertext on storage, maintains the
//! dedup identity, and composes the key manager and content cipher into the
//! add/delete/rename/search surface the application layer uses.

pub mod catalog;
pub mod engine;
pub mod folders;
pub mod item;

pub use engine::VaultEngine;
pub use folders::{normalize_folder_path, FolderNode};
pub use item::{LegacyItem, VaultItem};
