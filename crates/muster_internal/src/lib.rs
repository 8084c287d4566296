//! # Muster Internal Library
//!
//! Re-exports the core Muster crates for convenience.

/// Layer 1: rule schema and raw exchange format.
pub use muster_schema;

/// Layer 2: entity graph, link resolution and translation.
pub use muster_graph;

/// Layer 3: the catalogue registry and storage backends.
pub use muster_registry;

/// Logging setup for binaries.
pub use muster_core;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use muster_core::{TracingFormat, TracingSetup};
    pub use muster_graph::{
        Catalogue, CatalogueId, CatalogueStore, LinkKind, LinkState, Node, NodeId, NodeKind,
        NodeRef, ResolveOptions, Translations,
    };
    pub use muster_registry::{
        BooksDate, CatalogueRegistry, CatalogueStorage, FileSystemStorage, InMemoryStorage,
        LoadProgress, RegistryConfig, RegistryError, StorageError,
    };
    pub use muster_schema::{CatalogueReference, DocumentKind, RawDocument};
}
