//! Cross-document link resolution.
//!
//! Resolution never fails a load. A link whose target is missing is either
//! reported back as an [`UnresolvedLink`] for a later retry, or detached from
//! its parent when [`ResolveOptions::delete_bad_links`] is set.
//!
//! Document lookup (by id or name) is supplied by the caller as a closure,
//! since only the registry knows which revision of a document is current.

use std::collections::{HashSet, VecDeque};

use muster_schema::CatalogueReference;

use crate::index::LinkIndex;
use crate::node::{CatalogueId, LinkKind, NodeId, NodeRef};
use crate::store::CatalogueStore;

/// How to treat links that cannot be resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Detach dangling links instead of reporting them.
    pub delete_bad_links: bool,
}

/// A link whose target was not found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedLink {
    /// The missing `targetId` (or document name, for an import without one).
    pub target_id: String,
    /// The link node.
    pub link: NodeRef,
}

/// Outcome of one resolution pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResolveReport {
    /// Links that now point at a node.
    pub resolved: usize,
    /// Links still dangling.
    pub unresolved: Vec<UnresolvedLink>,
    /// Links detached because their target was missing.
    pub pruned: usize,
}

impl ResolveReport {
    /// Folds another pass into this one.
    pub fn merge(&mut self, other: ResolveReport) {
        self.resolved += other.resolved;
        self.unresolved.extend(other.unresolved);
        self.pruned += other.pruned;
    }
}

/// Documents taking part in resolving `owner`'s links, nearest first.
///
/// Breadth-first over import declarations and the game system, starting at
/// `owner`. Documents `lookup` cannot find are skipped.
pub fn participants<F>(store: &CatalogueStore, owner: CatalogueId, lookup: F) -> Vec<CatalogueId>
where
    F: Fn(&str) -> Option<CatalogueId>,
{
    let mut order = Vec::new();
    let mut seen = HashSet::from([owner]);
    let mut queue = VecDeque::from([owner]);

    while let Some(current) = queue.pop_front() {
        let Some(catalogue) = store.get(current) else {
            continue;
        };
        order.push(current);

        let imports = catalogue
            .catalogue_links()
            .into_iter()
            .filter_map(|reference| find_document(&reference, &lookup));
        let system = catalogue.game_system_id().and_then(&lookup);
        for next in imports.chain(system) {
            if seen.insert(next) {
                queue.push_back(next);
            }
        }
    }
    order
}

fn find_document<F>(reference: &CatalogueReference, lookup: &F) -> Option<CatalogueId>
where
    F: Fn(&str) -> Option<CatalogueId>,
{
    reference
        .target_id
        .as_deref()
        .and_then(lookup)
        .or_else(|| reference.name.as_deref().and_then(lookup))
}

/// Resolves every attached link of `owner`.
pub fn resolve_catalogue<F>(
    store: &mut CatalogueStore,
    owner: CatalogueId,
    lookup: F,
    options: ResolveOptions,
) -> ResolveReport
where
    F: Fn(&str) -> Option<CatalogueId>,
{
    let links = store
        .get(owner)
        .map(crate::Catalogue::links)
        .unwrap_or_default();
    resolve_links(store, owner, &links, lookup, options)
}

/// Resolves the given links of `owner` against a freshly built index.
///
/// Links that are already resolved are left alone, so this doubles as the
/// retry pass for previously reported links.
pub fn resolve_links<F>(
    store: &mut CatalogueStore,
    owner: CatalogueId,
    links: &[NodeId],
    lookup: F,
    options: ResolveOptions,
) -> ResolveReport
where
    F: Fn(&str) -> Option<CatalogueId>,
{
    let mut report = ResolveReport::default();
    if links.is_empty() {
        return report;
    }

    let scope = participants(store, owner, &lookup);
    let index = LinkIndex::build(store, &scope);
    tracing::debug!(
        %owner,
        links = links.len(),
        participants = scope.len(),
        indexed = index.len(),
        "resolving links"
    );

    for &link_id in links {
        let link_ref = NodeRef::new(owner, link_id);
        let Some(node) = store.node(link_ref) else {
            continue;
        };
        let Some(state) = node.link() else {
            continue;
        };
        if state.resolved.is_some() {
            continue;
        }

        let (key, target) = if state.kind == LinkKind::Catalogue {
            let reference = CatalogueReference {
                target_id: state.target_id.clone(),
                name: node.original_text("name").map(str::to_owned),
            };
            let target = find_document(&reference, &lookup).map(|id| NodeRef::new(id, NodeId::ROOT));
            (reference.key().map(str::to_owned), target)
        } else {
            let target = state.target_id.as_deref().and_then(|id| index.get(id));
            (state.target_id.clone(), target)
        };

        let Some(key) = key else {
            tracing::warn!(link = %link_ref, "link has no target id, skipping");
            continue;
        };

        match target {
            Some(target) => {
                if let Some(found) = store.node(target)
                    && !state.kind.accepts(found.kind())
                {
                    tracing::debug!(
                        link = %link_ref,
                        target_id = %key,
                        expected = ?state.kind,
                        found = ?found.kind(),
                        "link target has unexpected kind"
                    );
                }
                attach(store, link_ref, target);
                report.resolved += 1;
            }
            None if options.delete_bad_links => {
                if store
                    .get_mut(owner)
                    .is_some_and(|catalogue| catalogue.detach(link_id))
                {
                    tracing::debug!(link = %link_ref, target_id = %key, "pruned dangling link");
                    report.pruned += 1;
                }
            }
            None => {
                tracing::debug!(link = %link_ref, target_id = %key, "link unresolved");
                report.unresolved.push(UnresolvedLink {
                    target_id: key,
                    link: link_ref,
                });
            }
        }
    }
    report
}

fn attach(store: &mut CatalogueStore, link: NodeRef, target: NodeRef) {
    if let Some(state) = store.node_mut(link).and_then(|node| node.link.as_mut()) {
        state.resolved = Some(target);
    }
    if let Some(node) = store.node_mut(target) {
        let refs = if link.catalogue == target.catalogue {
            &mut node.refs
        } else {
            &mut node.other_refs
        };
        if !refs.contains(&link) {
            refs.push(link);
        }
    }
}

/// Cuts every edge between `released` and the rest of the store.
///
/// Back-references pointing into `released` are dropped, and links elsewhere
/// that resolved into it are reset. Those links are returned so they can be
/// retried once a replacement is loaded. `released` itself is not modified.
pub fn release_catalogue(store: &mut CatalogueStore, released: CatalogueId) -> Vec<UnresolvedLink> {
    let mut requeued = Vec::new();
    for (catalogue_id, catalogue) in store.iter_mut() {
        if catalogue_id == released {
            continue;
        }
        for (index, node) in catalogue.nodes_mut().iter_mut().enumerate() {
            node.refs.retain(|link| link.catalogue != released);
            node.other_refs.retain(|link| link.catalogue != released);

            let key_name = node.original_text("name").map(str::to_owned);
            let Some(state) = node.link.as_mut() else {
                continue;
            };
            if state.resolved.is_some_and(|target| target.catalogue == released) {
                state.resolved = None;
                if let Some(target_id) = state.target_id.clone().or(key_name) {
                    requeued.push(UnresolvedLink {
                        target_id,
                        link: NodeRef::new(catalogue_id, NodeId(index)),
                    });
                }
            }
        }
    }
    if !requeued.is_empty() {
        tracing::debug!(%released, requeued = requeued.len(), "released catalogue");
    }
    requeued
}
