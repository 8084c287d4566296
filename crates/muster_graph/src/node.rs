//! Node types for catalogue graphs.
//!
//! Nodes live in a per-document arena ([`Catalogue`](crate::Catalogue)) and
//! refer to each other through ids, never through owning pointers: `parent`
//! is a [`NodeId`] into the same arena, `refs`/`other_refs` and resolved link
//! targets are [`NodeRef`]s that may point into another document.

use core::fmt;

use indexmap::IndexMap;
use muster_schema::RuleSet;
use serde_json::{Map, Value};

use crate::translation::ORIGINAL_PREFIX;

/// Index of a node within its document's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The root node of every document.
    pub const ROOT: NodeId = NodeId(0);

    /// Creates a new node ID.
    #[must_use]
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node_{}", self.0)
    }
}

/// Handle of a loaded document inside a [`CatalogueStore`](crate::CatalogueStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CatalogueId(pub(crate) u32);

impl CatalogueId {
    /// Creates a new catalogue ID.
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for CatalogueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "catalogue_{}", self.0)
    }
}

/// Address of a node across documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeRef {
    /// Owning document.
    pub catalogue: CatalogueId,
    /// Node within that document.
    pub node: NodeId,
}

impl NodeRef {
    /// Creates a node reference.
    #[must_use]
    pub fn new(catalogue: CatalogueId, node: NodeId) -> Self {
        Self { catalogue, node }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.catalogue, self.node)
    }
}

/// What a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Root of a game system document.
    GameSystem,
    /// Root of a catalogue document.
    Catalogue,
    /// A selection entry (unit, model, upgrade).
    Entry,
    /// A selection entry group.
    Group,
    /// A by-id reference to another node.
    Link,
    /// A category entry.
    Category,
    /// A force entry.
    Force,
    /// A profile.
    Profile,
    /// A rule.
    Rule,
    /// A group of profiles and rules.
    InfoGroup,
    /// A profile type declaration.
    ProfileType,
    /// A characteristic type inside a profile type.
    CharacteristicType,
    /// An attribute type inside a profile type.
    AttributeType,
    /// A cost type declaration.
    CostType,
    /// A characteristic value inside a profile.
    Characteristic,
    /// An attribute value.
    Attribute,
    /// A cost value.
    Cost,
    /// A publication.
    Publication,
    /// An association.
    Association,
}

impl NodeKind {
    /// Whether this kind is a document root.
    #[must_use]
    pub fn is_root(self) -> bool {
        matches!(self, Self::GameSystem | Self::Catalogue)
    }
}

/// Kind of node a link points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// A selection entry.
    Entry,
    /// A selection entry group.
    Group,
    /// A category.
    Category,
    /// A force.
    Force,
    /// A profile.
    Profile,
    /// A rule.
    Rule,
    /// An info group.
    InfoGroup,
    /// A whole document (import declaration).
    Catalogue,
}

impl LinkKind {
    /// Derives the link kind from the container a link lives in and its
    /// raw `type` attribute.
    #[must_use]
    pub fn from_container(container: &str, raw_type: Option<&str>) -> Self {
        match (container, raw_type) {
            ("catalogueLinks", _) => Self::Catalogue,
            ("forceEntryLinks", _) => Self::Force,
            ("categoryLinks" | "categories", _) => Self::Category,
            ("infoLinks", Some("profile")) => Self::Profile,
            ("infoLinks", Some("infoGroup")) => Self::InfoGroup,
            ("infoLinks", _) => Self::Rule,
            (_, Some("selectionEntryGroup")) => Self::Group,
            _ => Self::Entry,
        }
    }

    /// Whether a node of `kind` is an acceptable target.
    #[must_use]
    pub fn accepts(self, kind: NodeKind) -> bool {
        match self {
            Self::Entry => kind == NodeKind::Entry,
            Self::Group => kind == NodeKind::Group,
            Self::Category => kind == NodeKind::Category,
            Self::Force => kind == NodeKind::Force,
            Self::Profile => kind == NodeKind::Profile,
            Self::Rule => kind == NodeKind::Rule,
            Self::InfoGroup => kind == NodeKind::InfoGroup,
            Self::Catalogue => kind.is_root(),
        }
    }
}

/// Link-specific state of a node.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkState {
    /// Id of the target node (or document, for catalogue links).
    pub target_id: Option<String>,
    /// Kind of target.
    pub kind: LinkKind,
    /// The raw `type` attribute, kept for serialisation.
    pub raw_type: Option<String>,
    /// Resolved target, once found.
    pub resolved: Option<NodeRef>,
}

/// How a container field was written in the source document, when not as
/// an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CollectionShape {
    /// A single object instead of a one-element array.
    Single,
    /// An explicit `null`.
    Null,
}

/// A node of the entity graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) id: Option<String>,
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) parent_key: Option<String>,
    pub(crate) children: IndexMap<String, Vec<NodeId>>,
    pub(crate) shapes: IndexMap<String, CollectionShape>,
    pub(crate) fields: Map<String, Value>,
    /// Fields the translation overlay substituted.
    pub(crate) translated: Vec<String>,
    pub(crate) rules: RuleSet,
    /// Rule collections exactly as read; written back unchanged.
    pub(crate) rule_source: Map<String, Value>,
    pub(crate) link: Option<LinkState>,
    pub(crate) refs: Vec<NodeRef>,
    pub(crate) other_refs: Vec<NodeRef>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, parent: Option<NodeId>, parent_key: Option<&str>) -> Self {
        Self {
            id: None,
            kind,
            parent,
            parent_key: parent_key.map(str::to_owned),
            children: IndexMap::new(),
            shapes: IndexMap::new(),
            fields: Map::new(),
            translated: Vec::new(),
            rules: RuleSet::default(),
            rule_source: Map::new(),
            link: None,
            refs: Vec::new(),
            other_refs: Vec::new(),
        }
    }

    /// The node's id, if it has one.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The node's kind.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// The containing node, if any.
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// The container field this node lives in (e.g. `sharedRules`).
    #[must_use]
    pub fn parent_key(&self) -> Option<&str> {
        self.parent_key.as_deref()
    }

    /// The current (possibly translated) name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.field_str("name")
    }

    /// A string field's current value.
    #[must_use]
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// A field's source-language value: `original_<key>` when the overlay
    /// translated `key`, `<key>` otherwise.
    #[must_use]
    pub fn original_text(&self, key: &str) -> Option<&str> {
        let value = if self.is_translated(key) {
            self.fields.get(&format!("{ORIGINAL_PREFIX}{key}"))
        } else {
            self.fields.get(key)
        };
        value.and_then(Value::as_str)
    }

    /// Whether the overlay substituted `key`.
    #[must_use]
    pub fn is_translated(&self, key: &str) -> bool {
        self.translated.iter().any(|field| field == key)
    }

    /// Every plain field, including `original_` overlay entries.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Rule data carried by this node.
    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Children stored under a container field.
    #[must_use]
    pub fn children(&self, key: &str) -> &[NodeId] {
        self.children.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Container fields in document order with their children.
    pub fn child_collections(&self) -> impl Iterator<Item = (&str, &[NodeId])> {
        self.children
            .iter()
            .map(|(key, ids)| (key.as_str(), ids.as_slice()))
    }

    /// Link state, if this node is a link.
    #[must_use]
    pub fn link(&self) -> Option<&LinkState> {
        self.link.as_ref()
    }

    /// Whether this node is a link.
    #[must_use]
    pub fn is_link(&self) -> bool {
        self.link.is_some()
    }

    /// Links in the same document that resolved to this node.
    #[must_use]
    pub fn refs(&self) -> &[NodeRef] {
        &self.refs
    }

    /// Links in other documents that resolved to this node.
    #[must_use]
    pub fn other_refs(&self) -> &[NodeRef] {
        &self.other_refs
    }

    pub(crate) fn clear_back_references(&mut self) {
        self.refs.clear();
        self.other_refs.clear();
        if let Some(link) = &mut self.link {
            link.resolved = None;
        }
    }
}
