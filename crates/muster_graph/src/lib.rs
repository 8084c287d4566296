//! Entity graph for Muster catalogues.
//!
//! A loaded document is a [`Catalogue`]: an arena of [`Node`]s addressed by
//! [`NodeId`]. Every loaded document lives in a [`CatalogueStore`] and is
//! addressed by [`CatalogueId`], so edges between documents are plain
//! [`NodeRef`] values rather than owning pointers.
//!
//! # Modules
//!
//! - [`catalogue`] - parsing a [`RawDocument`](muster_schema::RawDocument)
//!   into an arena and serialising it back
//! - [`resolver`] - building a [`LinkIndex`] over a document and its imports
//!   and resolving every link against it
//! - [`translation`] - the reversible `original_<field>` overlay
//! - [`keys`] - the container allow-list shared by parsing and translation
//!
//! # Example
//!
//! ```
//! use muster_graph::{Catalogue, CatalogueStore, ResolveOptions, resolve_catalogue};
//! use muster_schema::RawDocument;
//!
//! let system = RawDocument::from_json_str(r#"{"gameSystem": {
//!     "id": "sys1", "name": "Skirmish",
//!     "sharedRules": [{"id": "r1", "name": "Deep Strike"}]
//! }}"#).unwrap();
//! let catalogue = RawDocument::from_json_str(r#"{"catalogue": {
//!     "id": "cat1", "name": "Knights", "gameSystemId": "sys1",
//!     "infoLinks": [{"id": "l1", "targetId": "r1", "type": "rule"}]
//! }}"#).unwrap();
//!
//! let mut store = CatalogueStore::new();
//! let sys = store.insert(Catalogue::from_raw(system).unwrap());
//! let cat = store.insert(Catalogue::from_raw(catalogue).unwrap());
//!
//! let lookup = |key: &str| (key == "sys1").then_some(sys);
//! let report = resolve_catalogue(&mut store, cat, lookup, ResolveOptions::default());
//! assert_eq!(report.resolved, 1);
//! assert!(report.unresolved.is_empty());
//! ```

pub mod catalogue;
pub mod error;
pub mod index;
pub mod keys;
pub mod node;
pub mod resolver;
pub mod store;
pub mod translation;

pub use catalogue::Catalogue;
pub use error::ParseError;
pub use index::LinkIndex;
pub use node::{CatalogueId, LinkKind, LinkState, Node, NodeId, NodeKind, NodeRef};
pub use resolver::{
    ResolveOptions, ResolveReport, UnresolvedLink, participants, release_catalogue,
    resolve_catalogue, resolve_links,
};
pub use store::CatalogueStore;
pub use translation::{ORIGINAL_PREFIX, Translations, translate, untranslate};
