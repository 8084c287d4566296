//! Catalogue registry for Muster.
//!
//! [`CatalogueRegistry`] owns loaded documents, picks revisions by date
//! ([`versioning`]), fetches through a [`CatalogueStorage`] backend and keeps
//! track of links that are still waiting for their target.
//!
//! # Storage backends
//!
//! | Backend | Use |
//! |---------|-----|
//! | [`InMemoryStorage`] | tests, embedding; counts fetches |
//! | [`FileSystemStorage`] | a directory of `*.json` documents |

pub mod config;
pub mod error;
pub mod fs;
pub mod progress;
pub mod registry;
pub mod storage;
pub mod versioning;

pub use config::RegistryConfig;
pub use error::{RegistryError, StorageError};
pub use fs::FileSystemStorage;
pub use progress::{LoadProgress, NoProgress};
pub use registry::CatalogueRegistry;
pub use storage::{CatalogueStorage, InMemoryStorage};
pub use versioning::{BooksDate, ParseDateError, RevisionKey, resolve_revision};
