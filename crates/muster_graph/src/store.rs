//! Arena of loaded documents.

use std::collections::BTreeMap;

use crate::catalogue::Catalogue;
use crate::node::{CatalogueId, Node, NodeRef};

/// Owns every loaded [`Catalogue`], addressed by [`CatalogueId`].
///
/// Ids are never reused, so a stale [`NodeRef`] into a removed document
/// resolves to `None` rather than to some other document's node.
#[derive(Default)]
pub struct CatalogueStore {
    catalogues: BTreeMap<CatalogueId, Catalogue>,
    next_id: u32,
}

impl CatalogueStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a document and returns its handle.
    pub fn insert(&mut self, catalogue: Catalogue) -> CatalogueId {
        let id = CatalogueId(self.next_id);
        self.next_id += 1;
        self.catalogues.insert(id, catalogue);
        id
    }

    /// Removes a document.
    pub fn remove(&mut self, id: CatalogueId) -> Option<Catalogue> {
        self.catalogues.remove(&id)
    }

    /// A document by handle.
    #[must_use]
    pub fn get(&self, id: CatalogueId) -> Option<&Catalogue> {
        self.catalogues.get(&id)
    }

    /// A document by handle, mutably.
    pub fn get_mut(&mut self, id: CatalogueId) -> Option<&mut Catalogue> {
        self.catalogues.get_mut(&id)
    }

    /// Whether `id` is loaded.
    #[must_use]
    pub fn contains(&self, id: CatalogueId) -> bool {
        self.catalogues.contains_key(&id)
    }

    /// A node anywhere in the store.
    #[must_use]
    pub fn node(&self, node: NodeRef) -> Option<&Node> {
        self.get(node.catalogue)?.node(node.node)
    }

    pub(crate) fn node_mut(&mut self, node: NodeRef) -> Option<&mut Node> {
        self.get_mut(node.catalogue)?.node_mut(node.node)
    }

    /// Documents in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (CatalogueId, &Catalogue)> {
        self.catalogues.iter().map(|(id, catalogue)| (*id, catalogue))
    }

    /// Documents in insertion order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (CatalogueId, &mut Catalogue)> {
        self.catalogues
            .iter_mut()
            .map(|(id, catalogue)| (*id, catalogue))
    }

    /// Number of loaded documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.catalogues.len()
    }

    /// Whether nothing is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.catalogues.is_empty()
    }

    /// Drops every document after clearing its back-references.
    pub fn clear(&mut self) {
        for catalogue in self.catalogues.values_mut() {
            catalogue.reset();
        }
        self.catalogues.clear();
    }
}

impl core::fmt::Debug for CatalogueStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CatalogueStore")
            .field(
                "catalogues",
                &self
                    .catalogues
                    .iter()
                    .map(|(id, catalogue)| (*id, catalogue.id()))
                    .collect::<Vec<_>>(),
            )
            .field("next_id", &self.next_id)
            .finish()
    }
}
