//! Registry configuration.

use serde::{Deserialize, Serialize};

/// Options controlling how the registry loads and resolves documents.
///
/// # Example
///
/// ```
/// use muster_registry::RegistryConfig;
///
/// let config = RegistryConfig::new().with_delete_bad_links(true);
/// assert!(config.delete_bad_links);
/// assert!(config.load_imports);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegistryConfig {
    /// Detach links whose target cannot be found instead of recording them.
    pub delete_bad_links: bool,
    /// Fetch a document's `catalogueLinks` imports along with it.
    pub load_imports: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            delete_bad_links: false,
            load_imports: true,
        }
    }
}

impl RegistryConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether dangling links are pruned.
    #[must_use]
    pub fn with_delete_bad_links(mut self, delete_bad_links: bool) -> Self {
        self.delete_bad_links = delete_bad_links;
        self
    }

    /// Sets whether imports are fetched automatically.
    #[must_use]
    pub fn with_load_imports(mut self, load_imports: bool) -> Self {
        self.load_imports = load_imports;
        self
    }
}
