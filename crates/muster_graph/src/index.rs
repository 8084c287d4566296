//! Combined id index over a set of participating documents.

use hashbrown::HashMap;

use crate::node::{CatalogueId, NodeRef};
use crate::store::CatalogueStore;

/// Maps node ids to nodes across several documents.
///
/// Built from a participant list ordered nearest-first (the owning document,
/// then its imports, then theirs). Nearer documents shadow farther ones.
#[derive(Debug, Default, Clone)]
pub struct LinkIndex {
    entries: HashMap<String, NodeRef>,
}

impl LinkIndex {
    /// Indexes every declared id of `participants`.
    #[must_use]
    pub fn build(store: &CatalogueStore, participants: &[CatalogueId]) -> Self {
        let mut entries = HashMap::new();
        for &catalogue_id in participants.iter().rev() {
            let Some(catalogue) = store.get(catalogue_id) else {
                continue;
            };
            for (id, node) in catalogue.local_ids() {
                entries.insert(id.to_owned(), NodeRef::new(catalogue_id, node));
            }
        }
        Self { entries }
    }

    /// The node declaring `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<NodeRef> {
        self.entries.get(id).copied()
    }

    /// Number of indexed ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
