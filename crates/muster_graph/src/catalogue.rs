//! The loaded, in-memory form of one document.

use hashbrown::HashMap;
use muster_schema::raw::revision_of;
use muster_schema::{CatalogueReference, DocumentInfo, DocumentKind, RawBody, RawDocument, RuleSet};
use serde_json::{Map, Value};

use crate::error::ParseError;
use crate::keys::child_kind;
use crate::node::{CollectionShape, LinkKind, LinkState, Node, NodeId, NodeKind};
use crate::translation::ORIGINAL_PREFIX;

/// Arena holding every node of one game system or catalogue.
///
/// Node 0 is the document root. Nodes are never removed from the arena;
/// pruning a link only detaches it from its parent's children, so
/// [`NodeId`]s stay stable for the lifetime of the document.
///
/// # Example
///
/// ```
/// use muster_graph::Catalogue;
/// use muster_schema::RawDocument;
///
/// let raw = RawDocument::from_json_str(r#"{"gameSystem": {
///     "id": "sys1",
///     "name": "Skirmish",
///     "sharedRules": [{"id": "r1", "name": "Deep Strike"}]
/// }}"#).unwrap();
///
/// let catalogue = Catalogue::from_raw(raw).unwrap();
/// let rule = catalogue.find_local("r1").unwrap();
/// assert_eq!(catalogue.node(rule).unwrap().name(), Some("Deep Strike"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Catalogue {
    kind: DocumentKind,
    nodes: Vec<Node>,
    local_index: HashMap<String, NodeId>,
}

impl Catalogue {
    /// Builds the graph for a raw document.
    ///
    /// # Errors
    ///
    /// Returns an error if the root has no string `id`, a container holds
    /// non-objects, or rule data does not match its schema.
    pub fn from_raw(document: RawDocument) -> Result<Self, ParseError> {
        let kind = document.kind();
        let root_kind = match kind {
            DocumentKind::GameSystem => NodeKind::GameSystem,
            DocumentKind::Catalogue => NodeKind::Catalogue,
        };
        let body = document.into_body();
        if !body.get("id").is_some_and(Value::is_string) {
            return Err(ParseError::MissingField("id"));
        }

        let mut catalogue = Self {
            kind,
            nodes: Vec::new(),
            local_index: HashMap::new(),
        };
        catalogue.build(root_kind, None, None, body)?;

        tracing::debug!(
            id = catalogue.id(),
            kind = %kind,
            nodes = catalogue.nodes.len(),
            indexed = catalogue.local_index.len(),
            "parsed document"
        );
        Ok(catalogue)
    }

    fn build(
        &mut self,
        kind: NodeKind,
        parent: Option<NodeId>,
        parent_key: Option<&str>,
        body: RawBody,
    ) -> Result<NodeId, ParseError> {
        let node_id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(kind, parent, parent_key));

        let mut target_id = None;
        let mut raw_type = None;
        for (key, value) in body {
            match (key.as_str(), &value, kind) {
                ("id", Value::String(id), _) => {
                    self.local_index.entry(id.clone()).or_insert(node_id);
                    self.nodes[node_id.0].id = Some(id.clone());
                    continue;
                }
                ("targetId", Value::String(id), NodeKind::Link) => {
                    target_id = Some(id.clone());
                    continue;
                }
                ("type", Value::String(name), NodeKind::Link) => {
                    raw_type = Some(name.clone());
                    continue;
                }
                _ => {}
            }

            if let Some(child) = child_kind(&key) {
                let (items, shape) = match value {
                    Value::Array(items) => (items, None),
                    Value::Null => (Vec::new(), Some(CollectionShape::Null)),
                    single => (vec![single], Some(CollectionShape::Single)),
                };
                if let Some(shape) = shape {
                    self.nodes[node_id.0].shapes.insert(key.clone(), shape);
                }
                let mut ids = Vec::with_capacity(items.len());
                for item in items {
                    let Value::Object(map) = item else {
                        return Err(ParseError::InvalidCollection(key));
                    };
                    ids.push(self.build(child, Some(node_id), Some(&key), map)?);
                }
                self.nodes[node_id.0].children.insert(key, ids);
            } else if RuleSet::is_rule_key(&key) {
                let node = &mut self.nodes[node_id.0];
                node.rules
                    .insert_raw(&key, value.clone())
                    .map_err(|source| ParseError::InvalidRule {
                        key: key.clone(),
                        source,
                    })?;
                node.rule_source.insert(key, value);
            } else {
                self.nodes[node_id.0].fields.insert(key, value);
            }
        }

        if kind == NodeKind::Link {
            self.nodes[node_id.0].link = Some(LinkState {
                kind: LinkKind::from_container(parent_key.unwrap_or_default(), raw_type.as_deref()),
                target_id,
                raw_type,
                resolved: None,
            });
        }
        Ok(node_id)
    }

    /// Serialises the graph back into the exchange format.
    ///
    /// Translated fields are written with their source-language value, so a
    /// persisted document never carries display text. Rule data is written
    /// exactly as it was read, and containers keep their single-object or
    /// `null` form. Detached (pruned) links are omitted.
    #[must_use]
    pub fn to_raw(&self) -> RawDocument {
        RawDocument::from_parts(self.kind, self.emit(NodeId::ROOT))
    }

    fn emit(&self, id: NodeId) -> RawBody {
        let node = &self.nodes[id.0];
        let mut body = Map::new();
        if let Some(id) = &node.id {
            body.insert("id".to_owned(), Value::from(id.as_str()));
        }
        if let Some(link) = &node.link {
            if let Some(target) = &link.target_id {
                body.insert("targetId".to_owned(), Value::from(target.as_str()));
            }
            if let Some(raw_type) = &link.raw_type {
                body.insert("type".to_owned(), Value::from(raw_type.as_str()));
            }
        }
        for (key, value) in &node.fields {
            if key
                .strip_prefix(ORIGINAL_PREFIX)
                .is_some_and(|field| node.is_translated(field))
            {
                continue;
            }
            let source = if node.is_translated(key) {
                node.fields
                    .get(&format!("{ORIGINAL_PREFIX}{key}"))
                    .unwrap_or(value)
            } else {
                value
            };
            body.insert(key.clone(), source.clone());
        }
        for (key, value) in &node.rule_source {
            body.insert(key.clone(), value.clone());
        }
        for (key, children) in &node.children {
            let mut items: Vec<Value> = children
                .iter()
                .map(|child| Value::Object(self.emit(*child)))
                .collect();
            let value = match (node.shapes.get(key), items.len()) {
                (Some(CollectionShape::Single), 1) => items.remove(0),
                (Some(CollectionShape::Null), 0) => Value::Null,
                _ => Value::Array(items),
            };
            body.insert(key.clone(), value);
        }
        body
    }

    /// Game system or catalogue.
    #[must_use]
    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.nodes[NodeId::ROOT.0]
    }

    /// The document id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.root().id().unwrap_or_default()
    }

    /// The document's current (possibly translated) name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.root().name().unwrap_or_default()
    }

    /// The document's source-language name, used as a registry key.
    #[must_use]
    pub fn source_name(&self) -> &str {
        self.root().original_text("name").unwrap_or_default()
    }

    /// Revision number; `0` when absent.
    #[must_use]
    pub fn revision(&self) -> u32 {
        revision_of(&self.root().fields)
    }

    /// The game system a catalogue builds on.
    #[must_use]
    pub fn game_system_id(&self) -> Option<&str> {
        match self.kind {
            DocumentKind::Catalogue => self.root().original_text("gameSystemId"),
            DocumentKind::GameSystem => None,
        }
    }

    /// Import declarations as lookup references.
    #[must_use]
    pub fn catalogue_links(&self) -> Vec<CatalogueReference> {
        self.root()
            .children("catalogueLinks")
            .iter()
            .filter_map(|id| {
                let node = self.node(*id)?;
                Some(CatalogueReference {
                    target_id: node.link()?.target_id.clone(),
                    name: node.original_text("name").map(str::to_owned),
                })
            })
            .collect()
    }

    /// Summary of this document.
    #[must_use]
    pub fn info(&self) -> DocumentInfo {
        DocumentInfo {
            id: self.id().to_owned(),
            name: self.source_name().to_owned(),
            kind: self.kind,
            revision: self.revision(),
        }
    }

    /// A node by arena id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Every node in the arena, attached or not.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    /// Number of nodes in the arena, detached ones included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// A node declared in this document, by its string id.
    #[must_use]
    pub fn find_local(&self, id: &str) -> Option<NodeId> {
        self.local_index.get(id).copied()
    }

    /// Every string id declared in this document.
    pub fn local_ids(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.local_index.iter().map(|(id, node)| (id.as_str(), *node))
    }

    /// Attached nodes in depth-first pre-order, starting at the root.
    #[must_use]
    pub fn descendants(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![NodeId::ROOT];
        while let Some(id) = stack.pop() {
            order.push(id);
            let node = &self.nodes[id.0];
            for children in node.children.values().rev() {
                stack.extend(children.iter().rev());
            }
        }
        order
    }

    /// Attached link nodes in document order.
    #[must_use]
    pub fn links(&self) -> Vec<NodeId> {
        self.descendants()
            .into_iter()
            .filter(|id| self.nodes[id.0].is_link())
            .collect()
    }

    /// Clears every back-reference (`refs`, `other_refs`, resolved targets).
    pub fn reset(&mut self) {
        for node in &mut self.nodes {
            node.clear_back_references();
        }
    }

    /// Removes `id` from its parent's children and from the local index.
    pub(crate) fn detach(&mut self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get_mut(id.0) else {
            return false;
        };
        let Some(parent) = node.parent.take() else {
            return false;
        };
        let key = node.parent_key.clone();
        if let Some(local) = node.id.clone()
            && self.local_index.get(&local) == Some(&id)
        {
            self.local_index.remove(&local);
        }
        if let Some(children) = key.and_then(|key| self.nodes[parent.0].children.get_mut(&key)) {
            children.retain(|child| *child != id);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_catalogue() -> RawDocument {
        serde_json::from_value(json!({
            "catalogue": {
                "id": "cat1",
                "name": "Knights",
                "revision": 4,
                "gameSystemId": "sys1",
                "catalogueLinks": [{"id": "cl1", "targetId": "lib1", "name": "Library", "type": "catalogue"}],
                "sharedSelectionEntries": [{
                    "id": "e1",
                    "name": "Captain",
                    "type": "unit",
                    "hidden": false,
                    "constraints": [{"type": "max", "value": 1, "field": "selections", "scope": "roster", "shared": false, "id": "k1"}],
                    "modifiers": [{"type": "increment", "field": "k1", "value": 2, "conditionGroups": [{"conditions": []}]}],
                    "infoLinks": [{"id": "il1", "targetId": "r1", "type": "rule", "name": "Deep Strike"}],
                    "profiles": [{
                        "id": "p1",
                        "name": "Captain",
                        "typeId": "pt1",
                        "characteristics": [{"name": "M", "typeId": "ct1", "$text": "6\""}]
                    }]
                }],
                "entryLinks": [{"id": "el1", "targetId": "g1", "type": "selectionEntryGroup", "name": "Wargear"}]
            }
        }))
        .unwrap()
    }

    #[test]
    fn builds_arena_with_back_references() {
        let catalogue = Catalogue::from_raw(raw_catalogue()).unwrap();

        assert_eq!(catalogue.id(), "cat1");
        assert_eq!(catalogue.name(), "Knights");
        assert_eq!(catalogue.revision(), 4);
        assert_eq!(catalogue.game_system_id(), Some("sys1"));
        assert_eq!(catalogue.kind(), DocumentKind::Catalogue);

        let entry = catalogue.find_local("e1").unwrap();
        let entry_node = catalogue.node(entry).unwrap();
        assert_eq!(entry_node.kind(), NodeKind::Entry);
        assert_eq!(entry_node.parent(), Some(NodeId::ROOT));
        assert_eq!(entry_node.parent_key(), Some("sharedSelectionEntries"));
        assert_eq!(entry_node.rules().constraints.len(), 1);
        assert_eq!(entry_node.field_str("type"), Some("unit"));

        let info_link = catalogue.find_local("il1").unwrap();
        let link = catalogue.node(info_link).unwrap().link().unwrap();
        assert_eq!(link.target_id.as_deref(), Some("r1"));
        assert_eq!(link.kind, LinkKind::Rule);
        assert!(link.resolved.is_none());

        let group_link = catalogue.find_local("el1").unwrap();
        assert_eq!(
            catalogue.node(group_link).unwrap().link().unwrap().kind,
            LinkKind::Group
        );
    }

    #[test]
    fn characteristics_are_nodes_without_ids() {
        let catalogue = Catalogue::from_raw(raw_catalogue()).unwrap();
        let profile = catalogue.find_local("p1").unwrap();
        let characteristics = catalogue.node(profile).unwrap().children("characteristics");
        assert_eq!(characteristics.len(), 1);

        let characteristic = catalogue.node(characteristics[0]).unwrap();
        assert_eq!(characteristic.kind(), NodeKind::Characteristic);
        assert_eq!(characteristic.id(), None);
        assert_eq!(characteristic.field_str("$text"), Some("6\""));
    }

    #[test]
    fn catalogue_links_become_references() {
        let catalogue = Catalogue::from_raw(raw_catalogue()).unwrap();
        let links = catalogue.catalogue_links();
        assert_eq!(links, vec![CatalogueReference::by_id("lib1").with_name("Library")]);
    }

    #[test]
    fn descendants_are_preorder() {
        let catalogue = Catalogue::from_raw(raw_catalogue()).unwrap();
        let order: Vec<_> = catalogue
            .descendants()
            .into_iter()
            .filter_map(|id| catalogue.node(id).unwrap().id())
            .collect();
        assert_eq!(order, vec!["cat1", "cl1", "e1", "il1", "p1", "el1"]);
        assert_eq!(catalogue.links().len(), 3);
        assert_eq!(catalogue.descendants().len(), catalogue.node_count());
    }

    #[test]
    fn bare_document_is_its_root_node() {
        let raw: RawDocument =
            serde_json::from_value(json!({"gameSystem": {"id": "sys1", "name": "Skirmish"}})).unwrap();
        let catalogue = Catalogue::from_raw(raw).unwrap();
        assert_eq!(catalogue.node_count(), 1);
        assert_eq!(catalogue.root().kind(), NodeKind::GameSystem);
    }

    #[test]
    fn to_raw_reproduces_the_document() {
        let raw = raw_catalogue();
        let catalogue = Catalogue::from_raw(raw.clone()).unwrap();
        assert_eq!(catalogue.to_raw(), raw);
    }

    #[test]
    fn to_raw_keeps_rule_data_and_collection_shapes_verbatim() {
        let raw = RawDocument::from_json_str(
            r#"{"gameSystem": {
                "id": "sys1",
                "name": "Skirmish",
                "revision": 3,
                "sharedRules": {"id": "r1", "name": "Deep Strike"},
                "publications": null,
                "sharedSelectionEntries": [{
                    "id": "e1",
                    "name": "Captain",
                    "original_name": "Kept as data",
                    "constraints": {"type": "min", "value": 0, "field": "selections", "scope": "parent", "percentValue": false},
                    "modifierGroups": [{"modifiers": {"type": "set", "field": "hidden", "value": false}}],
                    "repeats": [{"field": "selections", "scope": "force", "value": 2, "repeats": 1, "roundUp": false}]
                }]
            }}"#,
        )
        .unwrap();
        let catalogue = Catalogue::from_raw(raw.clone()).unwrap();
        let entry = catalogue.node(catalogue.find_local("e1").unwrap()).unwrap();
        assert_eq!(entry.rules().constraints.len(), 1);
        assert_eq!(entry.original_text("name"), Some("Captain"));

        let written = catalogue.to_raw();
        assert_eq!(written, raw);
        assert_eq!(written.body()["sharedRules"], json!({"id": "r1", "name": "Deep Strike"}));
        assert_eq!(
            written.body()["sharedSelectionEntries"][0]["constraints"]["value"],
            json!(0)
        );
    }

    #[test]
    fn missing_root_id_is_an_error() {
        let raw = RawDocument::from_json_str(r#"{"catalogue": {"name": "Nameless"}}"#).unwrap();
        let err = Catalogue::from_raw(raw).unwrap_err();
        assert!(matches!(err, ParseError::MissingField("id")));
    }

    #[test]
    fn non_object_children_are_rejected() {
        let raw =
            RawDocument::from_json_str(r#"{"catalogue": {"id": "c", "sharedRules": ["oops"]}}"#)
                .unwrap();
        let err = Catalogue::from_raw(raw).unwrap_err();
        assert!(matches!(err, ParseError::InvalidCollection(ref key) if key == "sharedRules"));
    }

    #[test]
    fn invalid_rule_data_names_the_collection() {
        let raw = RawDocument::from_json_str(
            r#"{"catalogue": {"id": "c", "constraints": [{"type": "sometimes"}]}}"#,
        )
        .unwrap();
        let err = Catalogue::from_raw(raw).unwrap_err();
        assert!(matches!(err, ParseError::InvalidRule { ref key, .. } if key == "constraints"));
    }

    #[test]
    fn detach_removes_from_parent_and_index() {
        let mut catalogue = Catalogue::from_raw(raw_catalogue()).unwrap();
        let link = catalogue.find_local("el1").unwrap();

        assert!(catalogue.detach(link));
        assert!(catalogue.root().children("entryLinks").is_empty());
        assert_eq!(catalogue.find_local("el1"), None);
        assert!(!catalogue.links().contains(&link));
        assert!(!catalogue.detach(link), "already detached");

        let raw = catalogue.to_raw();
        assert_eq!(raw.body()["entryLinks"], json!([]));
    }
}
