//! Vault engine end-to-end: add/decrypt, dedup grouping, folder moves,
//! deletes, orphan sweep, and the locked-vault failure mode.

use privault_core::VaultError;
use privault_crypto::KdfParams;
use privault_keys::KeyLifecycleManager;
use privault_secrets::{accounts, AllowAllGate, CredentialStore, HardwareKeyAgent, MemoryStore};
use privault_vault::VaultEngine;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

fn manager() -> Arc<KeyLifecycleManager> {
    let store = Arc::new(MemoryStore::new());
    let agent = Arc::new(HardwareKeyAgent::new(
        store.clone(),
        Arc::new(AllowAllGate),
        Duration::from_secs(1),
        Duration::from_secs(30),
    ));
    Arc::new(KeyLifecycleManager::new(
        store,
        agent,
        KdfParams::insecure_fast(),
        Duration::ZERO,
    ))
}

async fn engine(dir: &TempDir) -> (Arc<KeyLifecycleManager>, VaultEngine) {
    let keys = manager();
    let engine = VaultEngine::prepare(dir.path(), keys.clone()).await.unwrap();
    (keys, engine)
}

#[tokio::test]
async fn test_add_and_decrypt_roundtrip() {
    let dir = TempDir::new().unwrap();
    let (_, engine) = engine(&dir).await;

    let item = engine
        .add_item(b"hello", "a.txt", "text/plain", false, None, None)
        .await
        .unwrap();
    assert_eq!(item.size_bytes, 5);
    assert_eq!(item.content_hash, HELLO_SHA256);

    let plaintext = engine.decrypt_item_data(&item.id).await.unwrap();
    assert_eq!(plaintext, b"hello");
    assert_eq!(engine.total_storage_bytes().await, 5);
}

#[tokio::test]
async fn test_blob_on_disk_is_ciphertext() {
    let dir = TempDir::new().unwrap();
    let (_, engine) = engine(&dir).await;

    let item = engine
        .add_item(b"very secret content", "s.txt", "text/plain", false, None, None)
        .await
        .unwrap();

    let blob = std::fs::read(dir.path().join("blobs").join(&item.storage_file_name)).unwrap();
    assert!(!blob
        .windows(b"very secret".len())
        .any(|w| w == b"very secret"));
    // nonce (24) + plaintext + tag (16)
    assert_eq!(blob.len(), 24 + 19 + 16);
}

#[tokio::test]
async fn test_exact_duplicates_scenario() {
    let dir = TempDir::new().unwrap();
    let (_, engine) = engine(&dir).await;

    let a = engine
        .add_item(b"hello", "a.txt", "text/plain", false, None, None)
        .await
        .unwrap();
    let b = engine
        .add_item(b"hello", "b.txt", "text/plain", false, None, None)
        .await
        .unwrap();
    engine
        .add_item(b"different", "c.txt", "text/plain", false, None, None)
        .await
        .unwrap();

    assert_eq!(a.content_hash, b.content_hash);
    assert_ne!(a.storage_file_name, b.storage_file_name);

    let groups = engine.find_exact_duplicates().await;
    assert_eq!(groups.len(), 1, "only identical content groups");
    let names: Vec<_> = groups[0].iter().map(|i| i.original_name.as_str()).collect();
    assert_eq!(names, ["a.txt", "b.txt"], "ordered by creation time");
}

#[tokio::test]
async fn test_delete_removes_blob_and_record() {
    let dir = TempDir::new().unwrap();
    let (_, engine) = engine(&dir).await;

    let item = engine
        .add_item(b"bye", "d.txt", "text/plain", false, None, None)
        .await
        .unwrap();
    let blob_path = dir.path().join("blobs").join(&item.storage_file_name);
    assert!(blob_path.exists());

    engine.delete_items(&[item.id.clone()]).await.unwrap();
    assert!(!blob_path.exists());
    assert!(matches!(
        engine.get_item(&item.id).await,
        Err(VaultError::ItemNotFound(_))
    ));
    assert_eq!(engine.total_storage_bytes().await, 0);
}

#[tokio::test]
async fn test_delete_error_flushes_completed_removals() {
    let dir = TempDir::new().unwrap();
    let keys = manager();
    let engine = VaultEngine::prepare(dir.path(), keys.clone()).await.unwrap();

    let first = engine
        .add_item(b"one", "one.txt", "text/plain", false, None, None)
        .await
        .unwrap();
    let second = engine
        .add_item(b"two", "two.txt", "text/plain", false, None, None)
        .await
        .unwrap();

    // Make the first blob undeletable: a directory in its place fails
    // remove_file with something other than NotFound.
    let first_blob = dir.path().join("blobs").join(&first.storage_file_name);
    std::fs::remove_file(&first_blob).unwrap();
    std::fs::create_dir(&first_blob).unwrap();

    let result = engine
        .delete_items(&[first.id.clone(), second.id.clone()])
        .await;
    assert!(result.is_err(), "blob removal failure must surface");

    // The record removed before the failure is flushed to disk; the batch
    // stops there, so the second item is untouched.
    std::fs::remove_dir(&first_blob).unwrap();
    let reopened = VaultEngine::prepare(dir.path(), keys).await.unwrap();
    assert!(matches!(
        reopened.get_item(&first.id).await,
        Err(VaultError::ItemNotFound(_))
    ));
    reopened.get_item(&second.id).await.unwrap();
    reopened.decrypt_item_data(&second.id).await.unwrap();
}

#[tokio::test]
async fn test_folder_assignment_and_tree() {
    let dir = TempDir::new().unwrap();
    let (_, engine) = engine(&dir).await;

    let x = engine
        .add_item(b"1", "x.txt", "text/plain", false, None, None)
        .await
        .unwrap();
    let y = engine
        .add_item(b"2", "y.txt", "text/plain", false, None, None)
        .await
        .unwrap();

    engine
        .assign_folder(&[x.id.clone(), y.id.clone()], Some("A/B"))
        .await
        .unwrap();

    let roots = engine.folder_nodes().await;
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].path, "A");

    let b = &roots[0].children[0];
    assert_eq!(b.path, "A/B");
    let mut ids: Vec<_> = b.items.iter().map(|i| i.id.clone()).collect();
    ids.sort();
    let mut expected = vec![x.id.clone(), y.id.clone()];
    expected.sort();
    assert_eq!(ids, expected, "exactly the assigned items");
}

#[tokio::test]
async fn test_move_folder_rewrites_descendants() {
    let dir = TempDir::new().unwrap();
    let (_, engine) = engine(&dir).await;

    let deep = engine
        .add_item(b"1", "deep.txt", "text/plain", false, None, Some("A/B"))
        .await
        .unwrap();
    let shallow = engine
        .add_item(b"2", "shallow.txt", "text/plain", false, None, Some("A"))
        .await
        .unwrap();
    engine.create_folder("A/Empty").await.unwrap();

    engine.move_folder("A", "C").await.unwrap();

    assert_eq!(
        engine.get_item(&deep.id).await.unwrap().folder_path.as_deref(),
        Some("C/B")
    );
    assert_eq!(
        engine
            .get_item(&shallow.id)
            .await
            .unwrap()
            .folder_path
            .as_deref(),
        Some("C")
    );

    let roots = engine.folder_nodes().await;
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].path, "C");
    let child_paths: Vec<_> = roots[0].children.iter().map(|c| c.path.clone()).collect();
    assert_eq!(child_paths, ["C/B", "C/Empty"], "markers move too");
}

#[tokio::test]
async fn test_move_folder_into_itself_rejected() {
    let dir = TempDir::new().unwrap();
    let (_, engine) = engine(&dir).await;
    engine.create_folder("A").await.unwrap();

    assert!(engine.move_folder("A", "A/B").await.is_err());
    assert!(engine.move_folder("A", "A").await.is_err());
}

#[tokio::test]
async fn test_locked_vault_surfaces_authorization_required() {
    let dir = TempDir::new().unwrap();
    let (keys, engine) = engine(&dir).await;

    let item = engine
        .add_item(b"hello", "a.txt", "text/plain", false, None, None)
        .await
        .unwrap();

    keys.clear_master_key_from_memory().await;

    let result = engine.decrypt_item_data(&item.id).await;
    assert!(
        matches!(result, Err(VaultError::AuthorizationRequired)),
        "locked vault must never return stale plaintext"
    );
}

#[tokio::test]
async fn test_rename_and_category() {
    let dir = TempDir::new().unwrap();
    let (_, engine) = engine(&dir).await;

    let item = engine
        .add_item(b"pic", "IMG_001.jpg", "image/jpeg", true, None, None)
        .await
        .unwrap();

    engine.rename_item(&item.id, "sunset.jpg").await.unwrap();
    engine
        .assign_category(&item.id, Some("Photos"))
        .await
        .unwrap();

    let updated = engine.get_item(&item.id).await.unwrap();
    assert_eq!(updated.original_name, "sunset.jpg");
    assert_eq!(updated.category.as_deref(), Some("Photos"));
    assert!(updated.is_image);

    engine.assign_category(&item.id, None).await.unwrap();
    assert_eq!(engine.get_item(&item.id).await.unwrap().category, None);
}

#[tokio::test]
async fn test_prepare_sweeps_orphan_blobs() {
    let dir = TempDir::new().unwrap();
    let keys = manager();
    {
        let engine = VaultEngine::prepare(dir.path(), keys.clone()).await.unwrap();
        engine
            .add_item(b"keep me", "k.txt", "text/plain", false, None, None)
            .await
            .unwrap();
    }

    let stray = dir.path().join("blobs").join("stray-blob");
    std::fs::write(&stray, b"crash leftover").unwrap();

    let engine = VaultEngine::prepare(dir.path(), keys).await.unwrap();
    assert!(!stray.exists(), "unreferenced blob swept at startup");
    assert_eq!(engine.list_items().await.len(), 1, "real items survive");
}

#[tokio::test]
async fn test_catalog_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let keys = manager();

    let added = {
        let engine = VaultEngine::prepare(dir.path(), keys.clone()).await.unwrap();
        engine
            .add_item(b"persist", "p.txt", "text/plain", false, Some("docs"), Some("Files"))
            .await
            .unwrap()
    };

    let engine = VaultEngine::prepare(dir.path(), keys).await.unwrap();
    let reloaded = engine.get_item(&added.id).await.unwrap();
    assert_eq!(reloaded.original_name, "p.txt");
    assert_eq!(reloaded.category.as_deref(), Some("docs"));
    assert_eq!(reloaded.folder_path.as_deref(), Some("Files"));

    let plaintext = engine.decrypt_item_data(&added.id).await.unwrap();
    assert_eq!(plaintext, b"persist");
}

#[tokio::test]
async fn test_recovery_restores_access_to_items() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let agent = Arc::new(HardwareKeyAgent::new(
        store.clone(),
        Arc::new(AllowAllGate),
        Duration::from_secs(1),
        Duration::from_secs(30),
    ));
    let keys = Arc::new(KeyLifecycleManager::new(
        store.clone(),
        agent,
        KdfParams::insecure_fast(),
        Duration::ZERO,
    ));
    let engine = VaultEngine::prepare(dir.path(), keys.clone()).await.unwrap();

    let item = engine
        .add_item(b"irreplaceable", "photo.jpg", "image/jpeg", true, None, None)
        .await
        .unwrap();
    let recovery_text = keys.create_recovery_key().await.unwrap();

    // Lose the hardware-wrapped record and the in-memory key.
    store.delete(accounts::WRAPPED_MASTER_KEY).unwrap();
    keys.clear_master_key_from_memory().await;

    keys.recover_master_key(&recovery_text).await.unwrap();

    let plaintext = engine.decrypt_item_data(&item.id).await.unwrap();
    assert_eq!(plaintext, b"irreplaceable", "recovered key decrypts old items");
}

#[tokio::test]
async fn test_concurrent_adds() {
    let dir = TempDir::new().unwrap();
    let keys = manager();
    let engine = Arc::new(VaultEngine::prepare(dir.path(), keys).await.unwrap());

    let mut handles = Vec::new();
    for i in 0..8u8 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .add_item(
                    &[i; 16],
                    &format!("f{i}.bin"),
                    "application/octet-stream",
                    false,
                    None,
                    None,
                )
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let items = engine.list_items().await;
    assert_eq!(items.len(), 8);
    let mut created: Vec<u64> = items.iter().map(|i| i.created_at).collect();
    let sorted = created.clone();
    created.dedup();
    assert_eq!(created, sorted, "creation timestamps are strictly increasing");
}
