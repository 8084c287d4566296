//! Error types for building a graph from a raw document.

/// Error turning a [`RawDocument`](muster_schema::RawDocument) into a graph.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// A required field is absent on the document root.
    #[error("missing required field '{0}' on document root")]
    MissingField(&'static str),

    /// A container field holds something other than objects.
    #[error("collection '{0}' must contain objects")]
    InvalidCollection(String),

    /// A rule collection does not match its schema.
    #[error("invalid rule data in '{key}': {source}")]
    InvalidRule {
        /// The offending collection.
        key: String,
        /// Underlying schema error.
        #[source]
        source: serde_json::Error,
    },
}
