//! The catalogue registry.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;

use hashbrown::HashMap;
use muster_graph::{
    Catalogue, CatalogueId, CatalogueStore, Node, NodeId, NodeRef, ResolveOptions, ResolveReport,
    Translations, release_catalogue, resolve_catalogue, resolve_links, translate, untranslate,
};
use muster_schema::{CatalogueReference, DocumentInfo, DocumentKind, RawDocument};

use crate::config::RegistryConfig;
use crate::error::{RegistryError, StorageError};
use crate::progress::LoadProgress;
use crate::storage::CatalogueStorage;
use crate::versioning::{BooksDate, RevisionKey, resolve_revision};

type KeyMap = HashMap<String, BTreeMap<RevisionKey, CatalogueId>>;

/// Owns every loaded document and the bookkeeping around it.
///
/// Documents are keyed twice, by id and by name, and then by the revision key
/// resolved for the requested [`BooksDate`]. Links that could not be resolved
/// are kept in [`unresolved_links`](Self::unresolved_links) and retried
/// whenever a document defining their target is loaded.
///
/// Every mutating operation takes `&mut self`: a registry is driven from one
/// control path, and sharing one across tasks needs an outer lock.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use muster_registry::{CatalogueRegistry, InMemoryStorage};
/// use muster_schema::RawDocument;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let storage = Arc::new(InMemoryStorage::new());
/// storage.insert(RawDocument::from_json_str(
///     r#"{"gameSystem": {"id": "sys1", "name": "Skirmish"}}"#,
/// )?);
///
/// let mut registry = CatalogueRegistry::new().with_storage(storage);
/// let id = registry.load("sys1", None, false).await?;
/// assert_eq!(registry.get_loaded_id("Skirmish", None), Some(id));
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct CatalogueRegistry {
    storage: Option<Arc<dyn CatalogueStorage>>,
    config: RegistryConfig,
    store: CatalogueStore,
    catalogues: KeyMap,
    loaded_at: HashMap<CatalogueId, Option<BooksDate>>,
    unresolved_links: HashMap<String, Vec<NodeRef>>,
    translations: Option<Translations>,
}

impl core::fmt::Debug for CatalogueRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CatalogueRegistry")
            .field("has_storage", &self.storage.is_some())
            .field("config", &self.config)
            .field("store", &self.store)
            .field("unresolved_links", &self.unresolved_count())
            .field("translations", &self.translations.as_ref().map(Translations::len))
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Key lookup
// ─────────────────────────────────────────────────────────────────────────────

fn revision_key(
    storage: Option<&dyn CatalogueStorage>,
    key: &str,
    books_date: Option<&BooksDate>,
) -> RevisionKey {
    match (storage, books_date) {
        (Some(storage), Some(date)) => resolve_revision(&storage.revisions(key), Some(date)),
        _ => RevisionKey::Default,
    }
}

/// Best match for link resolution: the requested revision, else the default
/// one, else the latest loaded.
fn lookup_any(
    catalogues: &KeyMap,
    storage: Option<&dyn CatalogueStorage>,
    key: &str,
    books_date: Option<&BooksDate>,
) -> Option<CatalogueId> {
    let revisions = catalogues.get(key)?;
    revisions
        .get(&revision_key(storage, key, books_date))
        .or_else(|| revisions.get(&RevisionKey::Default))
        .or_else(|| revisions.values().next_back())
        .copied()
}

impl CatalogueRegistry {
    /// Creates a registry without a storage backend.
    ///
    /// Only [`add_loaded`](Self::add_loaded) and
    /// [`load_document`](Self::load_document) work until a backend is set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the storage backend.
    #[must_use]
    pub fn with_storage<S: CatalogueStorage>(mut self, storage: Arc<S>) -> Self {
        self.storage = Some(storage as Arc<dyn CatalogueStorage>);
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the storage backend. Loaded documents are kept.
    pub fn set_storage(&mut self, storage: Arc<dyn CatalogueStorage>) {
        self.storage = Some(storage);
    }

    /// The storage backend, if one is installed.
    #[must_use]
    pub fn storage(&self) -> Option<&Arc<dyn CatalogueStorage>> {
        self.storage.as_ref()
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            delete_bad_links: self.config.delete_bad_links,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Cache
    // ─────────────────────────────────────────────────────────────────────────

    /// Caches `catalogue` under its id and its name.
    ///
    /// The revision key is resolved for the document id. An existing entry at
    /// the same key is replaced; a replaced document no longer cached under
    /// any key is dropped, and links from other documents into it go back to
    /// [`unresolved_links`](Self::unresolved_links).
    ///
    /// Links of `catalogue` are not resolved here; see
    /// [`load_document`](Self::load_document).
    pub fn add_loaded(&mut self, catalogue: Catalogue, books_date: Option<&BooksDate>) -> CatalogueId {
        let revision = revision_key(self.storage.as_deref(), catalogue.id(), books_date);
        let mut keys = vec![catalogue.id().to_owned()];
        let name = catalogue.source_name();
        if !name.is_empty() && name != catalogue.id() {
            keys.push(name.to_owned());
        }

        let id = self.store.insert(catalogue);
        self.loaded_at.insert(id, books_date.copied());

        let mut replaced = Vec::new();
        for key in keys {
            if let Some(previous) = self.catalogues.entry(key).or_default().insert(revision, id)
                && previous != id
            {
                replaced.push(previous);
            }
        }
        for previous in replaced {
            if !self.is_cached(previous) {
                self.evict(previous);
            }
        }
        id
    }

    fn is_cached(&self, id: CatalogueId) -> bool {
        self.catalogues
            .values()
            .any(|revisions| revisions.values().any(|cached| *cached == id))
    }

    fn evict(&mut self, id: CatalogueId) {
        if !self.store.contains(id) {
            return;
        }
        for link in release_catalogue(&mut self.store, id) {
            self.unresolved_links
                .entry(link.target_id)
                .or_default()
                .push(link.link);
        }
        for links in self.unresolved_links.values_mut() {
            links.retain(|link| link.catalogue != id);
        }
        self.unresolved_links.retain(|_, links| !links.is_empty());
        if let Some(mut catalogue) = self.store.remove(id) {
            tracing::debug!(catalogue = catalogue.id(), "evicted replaced document");
            catalogue.reset();
        }
        self.loaded_at.remove(&id);
    }

    /// Handle of the cached document for `reference` at the revision
    /// resolved for `books_date`.
    ///
    /// The reference's id is tried first, then its name.
    #[must_use]
    pub fn get_loaded_id(
        &self,
        reference: impl Into<CatalogueReference>,
        books_date: Option<&BooksDate>,
    ) -> Option<CatalogueId> {
        let reference = reference.into();
        [reference.target_id.as_deref(), reference.name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|key| !key.is_empty())
            .find_map(|key| {
                let revision = revision_key(self.storage.as_deref(), key, books_date);
                self.catalogues.get(key)?.get(&revision).copied()
            })
    }

    /// The cached document for `reference`, if any. No side effects.
    #[must_use]
    pub fn get_loaded(
        &self,
        reference: impl Into<CatalogueReference>,
        books_date: Option<&BooksDate>,
    ) -> Option<&Catalogue> {
        self.store.get(self.get_loaded_id(reference, books_date)?)
    }

    /// A loaded document by handle.
    #[must_use]
    pub fn catalogue(&self, id: CatalogueId) -> Option<&Catalogue> {
        self.store.get(id)
    }

    /// A node in any loaded document.
    #[must_use]
    pub fn node(&self, node: NodeRef) -> Option<&Node> {
        self.store.node(node)
    }

    /// Every loaded document once, in load order.
    pub fn all_loaded(&self) -> impl Iterator<Item = (CatalogueId, &Catalogue)> {
        self.store.iter()
    }

    /// Summary of a loaded document.
    #[must_use]
    pub fn catalogue_info(&self, reference: impl Into<CatalogueReference>) -> Option<DocumentInfo> {
        self.get_loaded(reference, None).map(Catalogue::info)
    }

    /// The first loaded node declaring `id`, searching documents in load
    /// order.
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<NodeRef> {
        self.store
            .iter()
            .find_map(|(catalogue_id, catalogue)| {
                Some(NodeRef::new(catalogue_id, catalogue.find_local(id)?))
            })
    }

    /// Links waiting for their target, keyed by the missing id.
    #[must_use]
    pub fn unresolved_links(&self) -> &HashMap<String, Vec<NodeRef>> {
        &self.unresolved_links
    }

    /// Links waiting for `target_id`.
    #[must_use]
    pub fn unresolved_for(&self, target_id: &str) -> &[NodeRef] {
        self.unresolved_links
            .get(target_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Total number of waiting links.
    #[must_use]
    pub fn unresolved_count(&self) -> usize {
        self.unresolved_links.values().map(Vec::len).sum()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Loading
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the cached document for `reference`, fetching it on a miss.
    ///
    /// A cache hit performs no I/O unless `force_load` is set. On a miss the
    /// document is fetched, along with any imports not yet loaded (when
    /// [`RegistryConfig::load_imports`] is on), then parsed, cached, resolved
    /// and translated. Nothing is cached if any fetch or parse fails, except
    /// that a missing import is only logged.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NotImplemented`] without a storage backend
    /// - [`RegistryError::NotFound`] when storage has no such document
    /// - [`RegistryError::Storage`] or [`RegistryError::Parse`] on bad data
    pub async fn load(
        &mut self,
        reference: impl Into<CatalogueReference>,
        books_date: Option<&BooksDate>,
        force_load: bool,
    ) -> Result<CatalogueId, RegistryError> {
        let reference = reference.into();
        if !force_load && let Some(id) = self.get_loaded_id(&reference, books_date) {
            tracing::debug!(%reference, "catalogue cache hit");
            return Ok(id);
        }

        let storage = self
            .storage
            .clone()
            .ok_or(RegistryError::NotImplemented("load"))?;
        let Some(key) = reference.key() else {
            return Err(RegistryError::NotFound { reference });
        };

        let revision = revision_key(Some(storage.as_ref()), key, books_date);
        let target = storage.fetch(&reference, &revision).await?;
        tracing::debug!(%reference, %revision, "fetched catalogue");

        let mut imports = Vec::new();
        if self.config.load_imports {
            let mut seen: HashSet<String> = [reference.target_id.clone(), reference.name.clone()]
                .into_iter()
                .flatten()
                .chain(target.id().map(str::to_owned))
                .chain(target.name().map(str::to_owned))
                .collect();
            let mut queue: VecDeque<CatalogueReference> =
                target.catalogue_links().iter().map(Into::into).collect();

            while let Some(import) = queue.pop_front() {
                let Some(key) = import.key() else {
                    continue;
                };
                if seen.contains(key) || self.get_loaded_id(&import, books_date).is_some() {
                    continue;
                }
                seen.insert(key.to_owned());

                let revision = revision_key(Some(storage.as_ref()), key, books_date);
                match storage.fetch(&import, &revision).await {
                    Ok(document) => {
                        seen.extend(document.id().map(str::to_owned));
                        seen.extend(document.name().map(str::to_owned));
                        queue.extend(document.catalogue_links().iter().map(Into::into));
                        imports.push(document);
                    }
                    Err(StorageError::NotFound(missing)) => {
                        tracing::warn!(import = %missing, "imported catalogue not found in storage");
                    }
                    Err(error) => return Err(error.into()),
                }
            }
        }

        let target = Catalogue::from_raw(target)?;
        let imports = imports
            .into_iter()
            .map(Catalogue::from_raw)
            .collect::<Result<Vec<_>, _>>()?;

        let mut loaded: Vec<CatalogueId> = imports
            .into_iter()
            .map(|import| self.add_loaded(import, books_date))
            .collect();
        let id = self.add_loaded(target, books_date);
        loaded.push(id);
        self.process(&loaded, books_date);

        if let Some(catalogue) = self.store.get(id) {
            tracing::info!(
                id = catalogue.id(),
                name = catalogue.source_name(),
                revision = catalogue.revision(),
                imports = loaded.len() - 1,
                "loaded catalogue"
            );
        }
        Ok(id)
    }

    /// Parses, caches, resolves and translates a document already in hand.
    ///
    /// No storage is needed; imports are not fetched.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Parse`] if the document is malformed.
    pub fn load_document(
        &mut self,
        document: RawDocument,
        books_date: Option<&BooksDate>,
    ) -> Result<CatalogueId, RegistryError> {
        let catalogue = Catalogue::from_raw(document)?;
        let id = self.add_loaded(catalogue, books_date);
        self.process(&[id], books_date);
        Ok(id)
    }

    fn process(&mut self, loaded: &[CatalogueId], books_date: Option<&BooksDate>) {
        let options = self.resolve_options();
        for &id in loaded {
            let report = {
                let catalogues = &self.catalogues;
                let storage = self.storage.as_deref();
                resolve_catalogue(
                    &mut self.store,
                    id,
                    |key: &str| lookup_any(catalogues, storage, key, books_date),
                    options,
                )
            };
            self.record(id, report);

            if let Some(translations) = &self.translations
                && let Some(catalogue) = self.store.get_mut(id)
            {
                translate(catalogue, translations);
            }
        }

        let mut defined: HashSet<String> = HashSet::new();
        for &id in loaded {
            if let Some(catalogue) = self.store.get(id) {
                defined.extend(catalogue.local_ids().map(|(key, _)| key.to_owned()));
                defined.insert(catalogue.source_name().to_owned());
            }
        }
        let retried = self.resolve_pending_where(|key| defined.contains(key));
        if retried > 0 {
            tracing::debug!(resolved = retried, "resolved pending links");
        }
    }

    fn record(&mut self, owner: CatalogueId, report: ResolveReport) {
        if report.pruned > 0 {
            tracing::warn!(%owner, pruned = report.pruned, "pruned links with missing targets");
        }
        if !report.unresolved.is_empty() {
            tracing::warn!(%owner, unresolved = report.unresolved.len(), "links left unresolved");
        }
        for link in report.unresolved {
            let pending = self.unresolved_links.entry(link.target_id).or_default();
            if !pending.contains(&link.link) {
                pending.push(link.link);
            }
        }
    }

    /// Retries every waiting link against the currently loaded documents.
    ///
    /// Returns how many links resolved; those leave
    /// [`unresolved_links`](Self::unresolved_links).
    pub fn resolve_pending(&mut self) -> usize {
        self.resolve_pending_where(|_| true)
    }

    fn resolve_pending_where(&mut self, retry: impl Fn(&str) -> bool) -> usize {
        let keys: Vec<String> = self
            .unresolved_links
            .keys()
            .filter(|key| retry(key))
            .cloned()
            .collect();

        let mut by_owner: BTreeMap<CatalogueId, Vec<NodeId>> = BTreeMap::new();
        for key in keys {
            for link in self.unresolved_links.remove(&key).unwrap_or_default() {
                by_owner.entry(link.catalogue).or_default().push(link.node);
            }
        }

        let options = self.resolve_options();
        let mut resolved = 0;
        for (owner, links) in by_owner {
            let books_date = self.loaded_at.get(&owner).copied().flatten();
            let report = {
                let catalogues = &self.catalogues;
                let storage = self.storage.as_deref();
                resolve_links(
                    &mut self.store,
                    owner,
                    &links,
                    |key: &str| lookup_any(catalogues, storage, key, books_date.as_ref()),
                    options,
                )
            };
            resolved += report.resolved;
            for link in report.unresolved {
                self.unresolved_links
                    .entry(link.target_id)
                    .or_default()
                    .push(link.link);
            }
        }
        resolved
    }

    /// Loads every document storage lists: game systems first, then
    /// catalogues, then a final [`resolve_pending`](Self::resolve_pending).
    ///
    /// `progress` is awaited once per document before it loads. Returns the
    /// number of documents listed.
    ///
    /// # Errors
    ///
    /// Returns the first load error; documents loaded before it stay cached.
    pub async fn load_all(&mut self, progress: &mut dyn LoadProgress) -> Result<usize, RegistryError> {
        let storage = self
            .storage
            .clone()
            .ok_or(RegistryError::NotImplemented("load_all"))?;
        let mut documents = storage.list().await?;
        documents.sort_by_key(|info| info.kind != DocumentKind::GameSystem);

        let total = documents.len();
        tracing::info!(documents = total, "loading all catalogues");
        for (current, info) in documents.into_iter().enumerate() {
            progress
                .report(current, total, Some(format!("Loading {}", info.name)))
                .await;
            let reference = CatalogueReference::by_id(info.id).with_name(info.name);
            self.load(reference, None, false).await?;
        }

        let resolved = self.resolve_pending();
        tracing::info!(
            documents = total,
            resolved,
            unresolved = self.unresolved_count(),
            "loaded all catalogues"
        );
        Ok(total)
    }

    /// Writes a loaded document back to storage with its source-language
    /// text.
    ///
    /// `books_date` picks the cached revision the same way
    /// [`get_loaded`](Self::get_loaded) does. A document cached from a dated
    /// revision is written back to that date through
    /// [`CatalogueStorage::persist_revision`]; the current revision is only
    /// replaced by a document loaded as current.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NotImplemented`] without a storage backend, or if
    ///   the backend cannot store dated revisions
    /// - [`RegistryError::NotLoaded`] if the document is not cached at that
    ///   revision
    /// - [`RegistryError::Storage`] if the backend fails
    pub async fn save(
        &self,
        reference: impl Into<CatalogueReference>,
        books_date: Option<&BooksDate>,
    ) -> Result<(), RegistryError> {
        let reference = reference.into();
        let storage = self
            .storage
            .clone()
            .ok_or(RegistryError::NotImplemented("save"))?;
        let catalogue_id = self
            .get_loaded_id(&reference, books_date)
            .ok_or_else(|| RegistryError::NotLoaded(reference.to_string()))?;
        let Some(catalogue) = self.store.get(catalogue_id) else {
            return Err(RegistryError::NotLoaded(reference.to_string()));
        };
        let id = catalogue.id().to_owned();
        let document = catalogue.to_raw();

        let loaded_at = self.loaded_at.get(&catalogue_id).copied().flatten();
        match revision_key(Some(storage.as_ref()), &id, loaded_at.as_ref()) {
            RevisionKey::Dated(date) => {
                storage.persist_revision(&id, date, document).await?;
                tracing::info!(%id, %date, "saved catalogue revision");
            }
            RevisionKey::Default => {
                storage.persist(&id, document).await?;
                tracing::info!(%id, "saved catalogue");
            }
        }
        Ok(())
    }

    /// Drops every loaded document and every waiting link.
    ///
    /// Back-references are cleared before the documents go. Storage and the
    /// active dictionary are kept.
    pub fn unload_all(&mut self) {
        let count = self.store.len();
        self.store.clear();
        self.catalogues.clear();
        self.loaded_at.clear();
        self.unresolved_links.clear();
        tracing::info!(documents = count, "unloaded all catalogues");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Translation
    // ─────────────────────────────────────────────────────────────────────────

    /// Swaps the display dictionary.
    ///
    /// Every loaded document is untranslated first (when a dictionary was
    /// active), then translated with the new one (when given).
    pub fn set_translations(&mut self, translations: Option<Translations>) {
        let previous = self.translations.take();
        let mut restored = 0;
        let mut substituted = 0;
        for (_, catalogue) in self.store.iter_mut() {
            if previous.is_some() {
                restored += untranslate(catalogue);
            }
            if let Some(translations) = &translations {
                substituted += translate(catalogue, translations);
            }
        }
        tracing::info!(
            entries = translations.as_ref().map_or(0, Translations::len),
            restored,
            substituted,
            "switched translations"
        );
        self.translations = translations;
    }

    /// The active dictionary.
    #[must_use]
    pub fn translations(&self) -> Option<&Translations> {
        self.translations.as_ref()
    }
}
