//! Integration tests for `FileSystemStorage`.

mod common;

use std::sync::Arc;

use common::{knights, system};
use muster_registry::{
    BooksDate, CatalogueRegistry, CatalogueStorage, FileSystemStorage, NoProgress, StorageError,
};
use muster_registry::versioning::RevisionKey;
use muster_schema::{CatalogueReference, RawDocument};

fn write(path: &std::path::Path, document: &RawDocument) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, document.to_json_string().unwrap()).unwrap();
}

#[tokio::test]
async fn indexes_current_and_dated_documents() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("system.json"), &system());
    write(&dir.path().join("knights.json"), &knights());
    write(
        &dir.path().join("revisions/2020-01-01/system.json"),
        &common::raw(serde_json::json!({"gameSystem": {"id": "sys1", "name": "Skirmish", "revision": 0}})),
    );
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
    std::fs::write(dir.path().join("broken.json"), "{").unwrap();

    let storage = FileSystemStorage::open(dir.path()).await.unwrap();

    let mut listed: Vec<_> = storage.list().await.unwrap().into_iter().map(|info| info.id).collect();
    listed.sort();
    assert_eq!(listed, vec!["cat1", "sys1"]);
    assert_eq!(storage.revisions("sys1"), vec![BooksDate::year(2020)]);
    assert_eq!(storage.revisions("Skirmish"), vec![BooksDate::year(2020)]);

    let reference = CatalogueReference::by_id("sys1");
    let current = storage.fetch(&reference, &RevisionKey::Default).await.unwrap();
    assert_eq!(current.revision(), 1);
    let dated = storage
        .fetch(&reference, &RevisionKey::Dated(BooksDate::year(2020)))
        .await
        .unwrap();
    assert_eq!(dated.revision(), 0);

    let by_name = storage
        .fetch(&CatalogueReference::by_name("Knights"), &RevisionKey::Default)
        .await
        .unwrap();
    assert_eq!(by_name.id(), Some("cat1"));
}

#[tokio::test]
async fn unknown_reference_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileSystemStorage::open(dir.path()).await.unwrap();
    let err = storage
        .fetch(&CatalogueReference::by_id("ghost"), &RevisionKey::Default)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
}

#[tokio::test]
async fn persist_writes_a_new_file_and_overwrites_existing() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("system.json"), &system());
    let storage = FileSystemStorage::open(dir.path()).await.unwrap();

    storage.persist("cat1", knights()).await.unwrap();
    assert!(dir.path().join("cat1.json").exists());

    let reopened = FileSystemStorage::open(dir.path()).await.unwrap();
    let fetched = reopened
        .fetch(&CatalogueReference::by_id("cat1"), &RevisionKey::Default)
        .await
        .unwrap();
    assert_eq!(fetched, knights());

    storage.persist("sys1", system()).await.unwrap();
    assert!(!dir.path().join("sys1.json").exists(), "existing file is reused");
}

#[tokio::test]
async fn registry_loads_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("system.json"), &system());
    write(&dir.path().join("knights.json"), &knights());

    let storage = Arc::new(FileSystemStorage::open(dir.path()).await.unwrap());
    let mut registry = CatalogueRegistry::new().with_storage(storage);

    assert_eq!(registry.load_all(&mut NoProgress).await.unwrap(), 2);
    assert_eq!(registry.unresolved_count(), 0);
    assert!(registry.get_loaded("Knights", None).is_some());
}

#[tokio::test]
async fn saving_a_dated_revision_writes_into_its_directory() {
    let dir = tempfile::tempdir().unwrap();
    let old = common::raw(serde_json::json!({"gameSystem": {"id": "sys1", "name": "Skirmish", "revision": 0}}));
    write(&dir.path().join("system.json"), &system());
    write(&dir.path().join("revisions/2020-01-01/system.json"), &old);

    let storage = Arc::new(FileSystemStorage::open(dir.path()).await.unwrap());
    let mut registry = CatalogueRegistry::new().with_storage(Arc::clone(&storage));
    let date = BooksDate::year(2021);
    registry.load("sys1", Some(&date), false).await.unwrap();
    registry.save("sys1", Some(&date)).await.unwrap();

    assert!(!dir.path().join("sys1.json").exists());
    let reopened = FileSystemStorage::open(dir.path()).await.unwrap();
    let reference = CatalogueReference::by_id("sys1");
    let current = reopened.fetch(&reference, &RevisionKey::Default).await.unwrap();
    assert_eq!(current, system());
    let dated = reopened
        .fetch(&reference, &RevisionKey::Dated(BooksDate::year(2020)))
        .await
        .unwrap();
    assert_eq!(dated, old);

    storage
        .persist_revision("cat1", BooksDate::year(2022), knights())
        .await
        .unwrap();
    assert!(dir.path().join("revisions/2022-01-01/cat1.json").exists());
    assert_eq!(storage.revisions("cat1"), vec![BooksDate::year(2022)]);
}
