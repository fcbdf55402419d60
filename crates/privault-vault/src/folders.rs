//! Folder hierarchy as a derived projection
//!
//! Folders are never stored as entities. The tree is materialized on query
//! from the distinct `folder_path` prefixes of flat items, plus explicit
//! markers for folders that currently contain nothing. A folder "exists"
//! iff an item references it or a marker does.

use privault_core::{VaultError, VaultResult};
use std::collections::{BTreeMap, BTreeSet};

use crate::item::VaultItem;

/// A materialized folder: read-only view, rebuilt on every query.
#[derive(Debug, Clone)]
pub struct FolderNode {
    /// Last path segment
    pub name: String,
    /// Full "/"-joined path from the vault root
    pub path: String,
    /// Items directly in this folder, ordered by creation time
    pub items: Vec<VaultItem>,
    /// Subfolders, ordered by name
    pub children: Vec<FolderNode>,
    /// Plaintext bytes of this folder and all descendants
    pub total_size: u64,
}

/// Validate and canonicalize a folder path: strips surrounding slashes,
/// rejects empty, dot, and dot-dot segments.
pub fn normalize_folder_path(path: &str) -> VaultResult<String> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Err(VaultError::Other(anyhow::anyhow!("empty folder path")));
    }
    for segment in trimmed.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(VaultError::Other(anyhow::anyhow!(
                "invalid folder path segment in '{path}'"
            )));
        }
    }
    Ok(trimmed.to_string())
}

/// Materialize the full folder tree from flat items and empty-folder markers.
pub fn folder_nodes(items: &[VaultItem], empty_folders: &BTreeSet<String>) -> Vec<FolderNode> {
    // Every referenced path plus all its ancestors exists.
    let mut paths: BTreeSet<String> = BTreeSet::new();
    let referenced = items
        .iter()
        .filter_map(|i| i.folder_path.as_deref())
        .chain(empty_folders.iter().map(String::as_str));
    for path in referenced {
        let mut prefix = String::new();
        for segment in path.split('/') {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);
            paths.insert(prefix.clone());
        }
    }

    let mut by_folder: BTreeMap<&str, Vec<VaultItem>> = BTreeMap::new();
    for item in items {
        if let Some(path) = item.folder_path.as_deref() {
            by_folder.entry(path).or_default().push(item.clone());
        }
    }

    build_children("", &paths, &mut by_folder)
}

/// Direct children of the folder at `path` (the tree one level down).
pub fn folder_children(
    path: &str,
    items: &[VaultItem],
    empty_folders: &BTreeSet<String>,
) -> Vec<FolderNode> {
    let roots = folder_nodes(items, empty_folders);
    find_node(&roots, path)
        .map(|node| node.children.clone())
        .unwrap_or_default()
}

fn find_node<'a>(nodes: &'a [FolderNode], path: &str) -> Option<&'a FolderNode> {
    for node in nodes {
        if node.path == path {
            return Some(node);
        }
        if path.starts_with(&format!("{}/", node.path)) {
            return find_node(&node.children, path);
        }
    }
    None
}

fn build_children(
    parent: &str,
    paths: &BTreeSet<String>,
    by_folder: &mut BTreeMap<&str, Vec<VaultItem>>,
) -> Vec<FolderNode> {
    let mut nodes = Vec::new();
    for path in paths {
        if parent_of(path) != parent {
            continue;
        }
        let mut items = by_folder.remove(path.as_str()).unwrap_or_default();
        items.sort_by_key(|i| i.created_at);

        let children = build_children(path, paths, by_folder);
        let total_size = items.iter().map(|i| i.size_bytes).sum::<u64>()
            + children.iter().map(|c| c.total_size).sum::<u64>();

        nodes.push(FolderNode {
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            path: path.clone(),
            items,
            children,
            total_size,
        });
    }
    // BTreeSet iteration already yields name order within a parent
    nodes
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}
