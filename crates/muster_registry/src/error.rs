//! Error types for storage backends and the registry.

use muster_graph::ParseError;
use muster_schema::CatalogueReference;

/// Error returned by a [`CatalogueStorage`](crate::CatalogueStorage) backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No stored document matches the reference.
    #[error("no stored document matches {0}")]
    NotFound(CatalogueReference),

    /// The backend does not support this operation.
    #[error("storage backend does not implement '{0}'")]
    NotImplemented(&'static str),

    /// Underlying I/O failure.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored document is not valid JSON for the exchange format.
    #[error("malformed stored document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error returned by [`CatalogueRegistry`](crate::CatalogueRegistry) operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Storage could not locate the document.
    #[error("couldn't load catalogue with {reference}, perhaps it wasn't uploaded?")]
    NotFound {
        /// The id and/or name that was looked up.
        reference: CatalogueReference,
    },

    /// The operation needs a storage backend and none is installed.
    #[error("'{0}' is not implemented without a storage backend")]
    NotImplemented(&'static str),

    /// The operation needs a loaded document and it is not loaded.
    #[error("catalogue '{0}' is not loaded")]
    NotLoaded(String),

    /// Any other storage failure.
    #[error(transparent)]
    Storage(StorageError),

    /// A fetched document could not be turned into a graph.
    #[error("failed to parse catalogue: {0}")]
    Parse(#[from] ParseError),
}

impl From<StorageError> for RegistryError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::NotFound(reference) => Self::NotFound { reference },
            StorageError::NotImplemented(operation) => Self::NotImplemented(operation),
            other => Self::Storage(other),
        }
    }
}
