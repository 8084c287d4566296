//! Shared fixtures for registry integration tests.

#![allow(
    dead_code,
    missing_docs,
    reason = "shared fixtures - not all items used in every test binary"
)]

use std::sync::Arc;

use muster_registry::{CatalogueRegistry, InMemoryStorage, RegistryConfig};
use muster_schema::RawDocument;
use serde_json::{Value, json};

pub fn raw(value: Value) -> RawDocument {
    serde_json::from_value(value).unwrap()
}

/// Game system `sys1` defining shared rule `r1`.
pub fn system() -> RawDocument {
    raw(json!({"gameSystem": {
        "id": "sys1",
        "name": "Skirmish",
        "revision": 1,
        "sharedRules": [{"id": "r1", "name": "Deep Strike", "description": "Arrives late"}],
        "categoryEntries": [{"id": "hq", "name": "HQ"}]
    }}))
}

/// Catalogue `cat1` on `sys1` with an info link to `r1`.
pub fn knights() -> RawDocument {
    raw(json!({"catalogue": {
        "id": "cat1",
        "name": "Knights",
        "revision": 2,
        "gameSystemId": "sys1",
        "sharedSelectionEntries": [{
            "id": "captain",
            "name": "Captain",
            "type": "unit",
            "infoLinks": [{"id": "il1", "targetId": "r1", "type": "rule", "name": "Deep Strike"}],
            "categoryLinks": [{"id": "cl-hq", "targetId": "hq", "name": "HQ"}]
        }]
    }}))
}

/// Catalogue `cat2` importing `lib1`, which defines `shared-entry`.
pub fn squires() -> RawDocument {
    raw(json!({"catalogue": {
        "id": "cat2",
        "name": "Squires",
        "gameSystemId": "sys1",
        "catalogueLinks": [{"id": "imp", "targetId": "lib1", "name": "Library", "type": "catalogue"}],
        "entryLinks": [{"id": "el1", "targetId": "shared-entry", "type": "selectionEntry"}]
    }}))
}

pub fn library() -> RawDocument {
    raw(json!({"catalogue": {
        "id": "lib1",
        "name": "Library",
        "gameSystemId": "sys1",
        "sharedSelectionEntries": [{"id": "shared-entry", "name": "Squire", "type": "model"}]
    }}))
}

pub fn storage_with(documents: impl IntoIterator<Item = RawDocument>) -> Arc<InMemoryStorage> {
    let storage = Arc::new(InMemoryStorage::new());
    for document in documents {
        storage.insert(document);
    }
    storage
}

pub fn registry(storage: &Arc<InMemoryStorage>) -> CatalogueRegistry {
    CatalogueRegistry::new().with_storage(Arc::clone(storage))
}

pub fn registry_with(storage: &Arc<InMemoryStorage>, config: RegistryConfig) -> CatalogueRegistry {
    registry(storage).with_config(config)
}
