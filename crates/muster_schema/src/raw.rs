//! The raw exchange format: serialized game systems and catalogues.
//!
//! A [`RawDocument`] is what storage backends hand to the registry and what
//! the registry hands back when persisting. Its body is kept as a JSON
//! object; the graph layer decides which keys are node collections, which
//! are rule data and which are plain fields.

use core::fmt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw object body of a document or node.
pub type RawBody = Map<String, Value>;

/// Which kind of root a document has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentKind {
    /// The shared game system every catalogue builds on.
    GameSystem,
    /// A catalogue of entries for one faction or supplement.
    Catalogue,
}

impl DocumentKind {
    /// The wire tag for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GameSystem => "gameSystem",
            Self::Catalogue => "catalogue",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A serialized document: `{"gameSystem": {...}}` or `{"catalogue": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawDocument {
    /// A game system document.
    #[serde(rename = "gameSystem")]
    GameSystem(RawBody),
    /// A catalogue document.
    #[serde(rename = "catalogue")]
    Catalogue(RawBody),
}

impl RawDocument {
    /// Builds a document of the given kind around `body`.
    #[must_use]
    pub fn from_parts(kind: DocumentKind, body: RawBody) -> Self {
        match kind {
            DocumentKind::GameSystem => Self::GameSystem(body),
            DocumentKind::Catalogue => Self::Catalogue(body),
        }
    }

    /// Parses a document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a tagged document.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Serializes the document as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be represented as JSON.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// The document's kind.
    #[must_use]
    pub fn kind(&self) -> DocumentKind {
        match self {
            Self::GameSystem(_) => DocumentKind::GameSystem,
            Self::Catalogue(_) => DocumentKind::Catalogue,
        }
    }

    /// The document's body.
    #[must_use]
    pub fn body(&self) -> &RawBody {
        match self {
            Self::GameSystem(body) | Self::Catalogue(body) => body,
        }
    }

    /// Mutable access to the document's body.
    pub fn body_mut(&mut self) -> &mut RawBody {
        match self {
            Self::GameSystem(body) | Self::Catalogue(body) => body,
        }
    }

    /// Consumes the document and returns its body.
    #[must_use]
    pub fn into_body(self) -> RawBody {
        match self {
            Self::GameSystem(body) | Self::Catalogue(body) => body,
        }
    }

    /// The document id, if present.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.body().get("id").and_then(Value::as_str)
    }

    /// The document name, if present.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.body().get("name").and_then(Value::as_str)
    }

    /// The revision number; `0` when absent or malformed.
    #[must_use]
    pub fn revision(&self) -> u32 {
        revision_of(self.body())
    }

    /// The game system a catalogue builds on.
    #[must_use]
    pub fn game_system_id(&self) -> Option<&str> {
        match self {
            Self::Catalogue(body) => body.get("gameSystemId").and_then(Value::as_str),
            Self::GameSystem(_) => None,
        }
    }

    /// The import declarations of a catalogue. Malformed entries are skipped.
    #[must_use]
    pub fn catalogue_links(&self) -> Vec<RawCatalogueLink> {
        match self.body().get("catalogueLinks") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect(),
            Some(item @ Value::Object(_)) => serde_json::from_value(item.clone())
                .map(|link| vec![link])
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Summary used by storage listings.
    #[must_use]
    pub fn info(&self) -> Option<DocumentInfo> {
        Some(DocumentInfo {
            id: self.id()?.to_owned(),
            name: self.name().unwrap_or_default().to_owned(),
            kind: self.kind(),
            revision: self.revision(),
        })
    }
}

/// Reads a `revision` field that may be stored as a number or a string.
#[must_use]
pub fn revision_of(body: &RawBody) -> u32 {
    match body.get("revision") {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()).unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// An import declaration inside a catalogue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCatalogueLink {
    /// Id of the link itself.
    #[serde(default)]
    pub id: String,
    /// Id of the imported document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    /// Name of the imported document; fallback key when `target_id` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Whether the imported document's root entries become selectable here.
    #[serde(default)]
    pub import_root_entries: bool,
}

/// Summary of a stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInfo {
    /// Document id.
    pub id: String,
    /// Document name.
    pub name: String,
    /// Game system or catalogue.
    pub kind: DocumentKind,
    /// Revision number.
    pub revision: u32,
}

/// How to find a document: by id, falling back to name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogueReference {
    /// Document id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    /// Document name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl CatalogueReference {
    /// A reference by document id.
    #[must_use]
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            target_id: Some(id.into()),
            name: None,
        }
    }

    /// A reference by document name.
    #[must_use]
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            target_id: None,
            name: Some(name.into()),
        }
    }

    /// Adds a fallback name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The lookup key: the id when present, otherwise the name.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.target_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .or(self.name.as_deref())
    }
}

impl From<&str> for CatalogueReference {
    fn from(key: &str) -> Self {
        Self::by_id(key)
    }
}

impl From<String> for CatalogueReference {
    fn from(key: String) -> Self {
        Self::by_id(key)
    }
}

impl From<&RawCatalogueLink> for CatalogueReference {
    fn from(link: &RawCatalogueLink) -> Self {
        Self {
            target_id: link.target_id.clone(),
            name: link.name.clone(),
        }
    }
}

impl From<&CatalogueReference> for CatalogueReference {
    fn from(reference: &CatalogueReference) -> Self {
        reference.clone()
    }
}

impl fmt::Display for CatalogueReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.target_id, &self.name) {
            (Some(id), Some(name)) => write!(f, "id {id} (name {name})"),
            (Some(id), None) => write!(f, "id {id}"),
            (None, Some(name)) => write!(f, "name {name}"),
            (None, None) => f.write_str("no id or name"),
        }
    }
}
