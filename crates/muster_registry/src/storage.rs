//! Storage backend interface and the in-memory backend.
//!
//! The registry reaches stored documents only through [`CatalogueStorage`].
//! Backends decide how references map to documents; the contract is that a
//! reference matches by `targetId` first and by `name` as a fallback.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use muster_schema::{CatalogueReference, DocumentInfo, RawDocument};
use parking_lot::RwLock;

use crate::error::StorageError;
use crate::versioning::{BooksDate, RevisionKey};

/// Trait for catalogue storage backends.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use muster_registry::{CatalogueStorage, StorageError};
/// use muster_registry::versioning::RevisionKey;
/// use muster_schema::{CatalogueReference, RawDocument};
///
/// struct Empty;
///
/// #[async_trait]
/// impl CatalogueStorage for Empty {
///     async fn fetch(
///         &self,
///         reference: &CatalogueReference,
///         _revision: &RevisionKey,
///     ) -> Result<RawDocument, StorageError> {
///         Err(StorageError::NotFound(reference.clone()))
///     }
///
///     async fn persist(&self, _id: &str, _document: RawDocument) -> Result<(), StorageError> {
///         Err(StorageError::NotImplemented("persist"))
///     }
/// }
/// ```
#[async_trait]
pub trait CatalogueStorage: Send + Sync + 'static {
    /// Returns the stored document matching `reference` at `revision`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] when neither the id nor the name
    /// matches a stored document.
    async fn fetch(
        &self,
        reference: &CatalogueReference,
        revision: &RevisionKey,
    ) -> Result<RawDocument, StorageError>;

    /// Stores `document` under `id`, replacing any previous version.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot write.
    async fn persist(&self, id: &str, document: RawDocument) -> Result<(), StorageError>;

    /// Stores `document` as the revision of `id` dated `date`, replacing any
    /// previous document at that date. The current revision is untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotImplemented`] unless the backend keeps
    /// dated revisions.
    async fn persist_revision(
        &self,
        _id: &str,
        _date: BooksDate,
        _document: RawDocument,
    ) -> Result<(), StorageError> {
        Err(StorageError::NotImplemented("persist_revision"))
    }

    /// Summaries of every stored document.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotImplemented`] unless the backend can
    /// enumerate its contents.
    async fn list(&self) -> Result<Vec<DocumentInfo>, StorageError> {
        Err(StorageError::NotImplemented("list"))
    }

    /// Dates of the stored revisions of the document keyed by `key`.
    fn revisions(&self, _key: &str) -> Vec<BooksDate> {
        Vec::new()
    }
}

#[derive(Debug, Default, Clone)]
struct Stored {
    current: Option<RawDocument>,
    dated: BTreeMap<BooksDate, RawDocument>,
}

impl Stored {
    fn any(&self) -> Option<&RawDocument> {
        self.current
            .as_ref()
            .or_else(|| self.dated.values().next_back())
    }

    fn at(&self, revision: &RevisionKey) -> Option<&RawDocument> {
        match revision {
            RevisionKey::Dated(date) => self.dated.get(date).or(self.current.as_ref()),
            RevisionKey::Default => self.any(),
        }
    }
}

/// Storage held entirely in memory.
///
/// Counts fetches, which makes it the test double for cache behaviour.
#[derive(Default)]
pub struct InMemoryStorage {
    documents: RwLock<BTreeMap<String, Stored>>,
    fetches: AtomicUsize,
}

impl core::fmt::Debug for InMemoryStorage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryStorage")
            .field("documents", &self.documents.read().keys().collect::<Vec<_>>())
            .field("fetches", &self.fetch_count())
            .finish()
    }
}

impl InMemoryStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the current revision of a document. Documents without an id
    /// are ignored.
    pub fn insert(&self, document: RawDocument) -> bool {
        let Some(id) = document.id().map(str::to_owned) else {
            return false;
        };
        self.documents.write().entry(id).or_default().current = Some(document);
        true
    }

    /// Stores a dated revision of a document.
    pub fn insert_revision(&self, date: BooksDate, document: RawDocument) -> bool {
        let Some(id) = document.id().map(str::to_owned) else {
            return false;
        };
        self.documents
            .write()
            .entry(id)
            .or_default()
            .dated
            .insert(date, document);
        true
    }

    /// Number of [`fetch`](CatalogueStorage::fetch) calls so far.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// The stored current revision of `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<RawDocument> {
        self.documents.read().get(id)?.current.clone()
    }

    /// The stored revision of `id` dated exactly `date`.
    #[must_use]
    pub fn get_revision(&self, id: &str, date: &BooksDate) -> Option<RawDocument> {
        self.documents.read().get(id)?.dated.get(date).cloned()
    }

    fn find<'a>(
        documents: &'a BTreeMap<String, Stored>,
        reference: &CatalogueReference,
    ) -> Option<&'a Stored> {
        reference
            .target_id
            .as_deref()
            .and_then(|id| documents.get(id))
            .or_else(|| {
                let name = reference.name.as_deref()?;
                documents
                    .values()
                    .find(|stored| stored.any().and_then(RawDocument::name) == Some(name))
            })
    }
}

#[async_trait]
impl CatalogueStorage for InMemoryStorage {
    async fn fetch(
        &self,
        reference: &CatalogueReference,
        revision: &RevisionKey,
    ) -> Result<RawDocument, StorageError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let documents = self.documents.read();
        Self::find(&documents, reference)
            .and_then(|stored| stored.at(revision))
            .cloned()
            .ok_or_else(|| StorageError::NotFound(reference.clone()))
    }

    async fn persist(&self, id: &str, document: RawDocument) -> Result<(), StorageError> {
        self.documents
            .write()
            .entry(id.to_owned())
            .or_default()
            .current = Some(document);
        Ok(())
    }

    async fn persist_revision(
        &self,
        id: &str,
        date: BooksDate,
        document: RawDocument,
    ) -> Result<(), StorageError> {
        self.documents
            .write()
            .entry(id.to_owned())
            .or_default()
            .dated
            .insert(date, document);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<DocumentInfo>, StorageError> {
        Ok(self
            .documents
            .read()
            .values()
            .filter_map(|stored| stored.any()?.info())
            .collect())
    }

    fn revisions(&self, key: &str) -> Vec<BooksDate> {
        let documents = self.documents.read();
        let reference = CatalogueReference::by_id(key).with_name(key);
        Self::find(&documents, &reference)
            .map(|stored| stored.dated.keys().copied().collect())
            .unwrap_or_default()
    }
}
