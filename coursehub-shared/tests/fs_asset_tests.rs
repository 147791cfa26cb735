/// Integration tests for the filesystem asset store
///
/// Run with: cargo test --test fs_asset_tests

use bytes::Bytes;
use coursehub_shared::assets::fs::FsAssetStore;
use coursehub_shared::assets::{store_upload, AssetError, AssetStore, AssetUpload, RECEIPTS_PREFIX};
use tempfile::TempDir;

fn store(dir: &TempDir) -> FsAssetStore {
    FsAssetStore::new(dir.path(), "https://cdn.example.com/files/")
}

#[tokio::test]
async fn test_upload_fetch_delete() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);

    store
        .upload("resources/syllabus.pdf", Bytes::from_static(b"%PDF-1.4"), "application/pdf")
        .await
        .unwrap();
    assert!(dir.path().join("resources").join("syllabus.pdf").exists());

    let bytes = store.fetch("resources/syllabus.pdf").await.unwrap();
    assert_eq!(&bytes[..], b"%PDF-1.4");

    store.delete("resources/syllabus.pdf").await.unwrap();
    assert!(matches!(
        store.fetch("resources/syllabus.pdf").await,
        Err(AssetError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_delete_missing_object_is_not_found() {
    let dir = TempDir::new().unwrap();
    let result = store(&dir).delete("receipts/nothing.jpg").await;
    assert!(matches!(result, Err(AssetError::NotFound(_))));
}

#[tokio::test]
async fn test_traversal_paths_are_rejected() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);

    let result = store
        .upload("../escape.txt", Bytes::from_static(b"x"), "text/plain")
        .await;
    assert!(matches!(result, Err(AssetError::InvalidPath(_))));
    assert!(matches!(
        store.fetch("/etc/passwd").await,
        Err(AssetError::InvalidPath(_))
    ));
}

#[tokio::test]
async fn test_store_upload_returns_public_reference() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let upload = AssetUpload::new("my receipt.png", "image/png", vec![1u8, 2, 3]);

    let asset = store_upload(&store, RECEIPTS_PREFIX, &upload).await.unwrap();

    let path = asset.path.clone().unwrap();
    assert!(path.starts_with("subscriptions/receipts/"));
    assert!(path.ends_with("_my_receipt.png"));
    assert_eq!(asset.url, format!("https://cdn.example.com/files/{}", path));
    assert_eq!(store.fetch(&path).await.unwrap().to_vec(), vec![1u8, 2, 3]);
}
