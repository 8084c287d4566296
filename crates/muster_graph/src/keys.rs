//! Container field allow-list.
//!
//! Only these raw collection names become graph children. Everything else on
//! an object is either rule data ([`RULE_KEYS`](muster_schema::rules::RULE_KEYS))
//! or a plain field. Translation walks exactly these containers.

use crate::node::NodeKind;

/// Raw collection names that hold graph nodes, with the kind of node each holds.
pub const CHILD_KEYS: &[(&str, NodeKind)] = &[
    ("costTypes", NodeKind::CostType),
    ("profileTypes", NodeKind::ProfileType),
    ("characteristicTypes", NodeKind::CharacteristicType),
    ("attributeTypes", NodeKind::AttributeType),
    ("publications", NodeKind::Publication),
    ("categoryEntries", NodeKind::Category),
    ("forceEntries", NodeKind::Force),
    ("sharedForceEntries", NodeKind::Force),
    ("forces", NodeKind::Force),
    ("sharedSelectionEntries", NodeKind::Entry),
    ("selectionEntries", NodeKind::Entry),
    ("sharedSelectionEntryGroups", NodeKind::Group),
    ("selectionEntryGroups", NodeKind::Group),
    ("sharedProfiles", NodeKind::Profile),
    ("profiles", NodeKind::Profile),
    ("sharedRules", NodeKind::Rule),
    ("rules", NodeKind::Rule),
    ("sharedInfoGroups", NodeKind::InfoGroup),
    ("infoGroups", NodeKind::InfoGroup),
    ("characteristics", NodeKind::Characteristic),
    ("attributes", NodeKind::Attribute),
    ("costs", NodeKind::Cost),
    ("associations", NodeKind::Association),
    ("entryLinks", NodeKind::Link),
    ("infoLinks", NodeKind::Link),
    ("categoryLinks", NodeKind::Link),
    ("categories", NodeKind::Link),
    ("forceEntryLinks", NodeKind::Link),
    ("catalogueLinks", NodeKind::Link),
];

/// Kind of node stored under `key`, if `key` is a container field.
#[must_use]
pub fn child_kind(key: &str) -> Option<NodeKind> {
    CHILD_KEYS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, kind)| *kind)
}

/// Whether `key` is a container field.
#[must_use]
pub fn is_child_key(key: &str) -> bool {
    child_kind(key).is_some()
}
