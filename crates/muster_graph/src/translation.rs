//! Reversible display-language overlay.
//!
//! [`translate`] swaps string field values found in a [`Translations`]
//! dictionary and keeps the source value next to it under
//! `original_<field>`. [`untranslate`] folds back every field the overlay
//! substituted, and nothing else.
//! Ids, link targets and rule data are never touched: they live outside a
//! node's plain fields.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalogue::Catalogue;
use crate::node::Node;

/// Prefix of the field holding a translated field's source value.
pub const ORIGINAL_PREFIX: &str = "original_";

/// Source text to display text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Translations(HashMap<String, String>);

impl Translations {
    /// Creates an empty dictionary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry.
    #[must_use]
    pub fn with(mut self, source: impl Into<String>, display: impl Into<String>) -> Self {
        self.0.insert(source.into(), display.into());
        self
    }

    /// Display text for `source`.
    #[must_use]
    pub fn get(&self, source: &str) -> Option<&str> {
        self.0.get(source).map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the dictionary is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Translations {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(source, display)| (source.into(), display.into()))
                .collect(),
        )
    }
}

impl From<HashMap<String, String>> for Translations {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}

/// Plain fields that hold identifiers or enumerations, never display text.
const UNTRANSLATED_KEYS: &[&str] = &["type", "typeId", "gameSystemId", "childId", "publicationId"];

fn original_key(key: &str) -> String {
    format!("{ORIGINAL_PREFIX}{key}")
}

/// Substitutes every string field whose value is a dictionary key.
///
/// A field that already has an `original_` sibling is skipped, so applying a
/// second dictionary without untranslating first cannot lose source text.
/// Fields whose own name starts with `original_` are never substituted.
/// Returns the number of substituted fields.
pub fn translate(catalogue: &mut Catalogue, translations: &Translations) -> usize {
    if translations.is_empty() {
        return 0;
    }
    let mut count = 0;
    for id in catalogue.descendants() {
        if let Some(node) = catalogue.node_mut(id) {
            count += translate_node(node, translations);
        }
    }
    tracing::debug!(catalogue = catalogue.id(), fields = count, "translated");
    count
}

fn translate_node(node: &mut Node, translations: &Translations) -> usize {
    let fields = &node.fields;
    let pending: Vec<(String, String)> = fields
        .iter()
        .filter(|(key, _)| {
            !key.starts_with(ORIGINAL_PREFIX)
                && !UNTRANSLATED_KEYS.contains(&key.as_str())
                && !fields.contains_key(&original_key(key))
        })
        .filter_map(|(key, value)| {
            let display = translations.get(value.as_str()?)?;
            Some((key.clone(), display.to_owned()))
        })
        .collect();

    let count = pending.len();
    for (key, display) in pending {
        if let Some(source) = node.fields.insert(key.clone(), Value::String(display)) {
            node.fields.insert(original_key(&key), source);
            node.translated.push(key);
        }
    }
    count
}

/// Restores every translated field to its source value.
///
/// Only fields the overlay substituted are restored; an `original_` field
/// the source document carried itself is left alone. Returns the number of
/// restored fields.
pub fn untranslate(catalogue: &mut Catalogue) -> usize {
    let mut count = 0;
    for node in catalogue.nodes_mut() {
        for key in core::mem::take(&mut node.translated) {
            if let Some(source) = node.fields.remove(&original_key(&key)) {
                node.fields.insert(key, source);
                count += 1;
            }
        }
    }
    if count > 0 {
        tracing::debug!(catalogue = catalogue.id(), fields = count, "untranslated");
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use muster_schema::RawDocument;

    fn catalogue() -> Catalogue {
        let raw = RawDocument::from_json_str(
            r#"{"catalogue": {
                "id": "Rule",
                "name": "Knights",
                "sharedRules": [{"id": "r1", "name": "Rule", "description": "Arrives late"}],
                "infoLinks": [{"id": "l1", "targetId": "Rule", "type": "rule", "name": "Rule"}],
                "modifiers": [{"type": "set", "field": "name", "value": "Rule"}]
            }}"#,
        )
        .unwrap();
        Catalogue::from_raw(raw).unwrap()
    }

    fn dictionary() -> Translations {
        Translations::new()
            .with("Rule", "Regle")
            .with("Knights", "Chevaliers")
    }

    #[test]
    fn translate_substitutes_and_keeps_source() {
        let mut catalogue = catalogue();
        let count = translate(&mut catalogue, &dictionary());
        assert_eq!(count, 3);

        assert_eq!(catalogue.name(), "Chevaliers");
        assert_eq!(catalogue.source_name(), "Knights");

        let rule = catalogue.node(catalogue.find_local("r1").unwrap()).unwrap();
        assert_eq!(rule.name(), Some("Regle"));
        assert_eq!(rule.field_str("original_name"), Some("Rule"));
        assert_eq!(rule.field_str("description"), Some("Arrives late"));
    }

    #[test]
    fn ids_targets_and_rules_are_not_translated() {
        let mut catalogue = catalogue();
        translate(&mut catalogue, &dictionary());

        assert_eq!(catalogue.id(), "Rule");
        let link = catalogue.node(catalogue.find_local("l1").unwrap()).unwrap();
        assert_eq!(link.link().unwrap().target_id.as_deref(), Some("Rule"));
        assert_eq!(
            catalogue.root().rules().modifiers[0].value.as_str(),
            Some("Rule")
        );
    }

    #[test]
    fn enumerated_fields_are_not_translated() {
        let raw = RawDocument::from_json_str(
            r#"{"catalogue": {
                "id": "cat1",
                "name": "Knights",
                "sharedSelectionEntries": [{"id": "e1", "name": "unit", "type": "unit"}]
            }}"#,
        )
        .unwrap();
        let mut catalogue = Catalogue::from_raw(raw).unwrap();
        let count = translate(&mut catalogue, &Translations::new().with("unit", "unite"));
        assert_eq!(count, 1);

        let entry = catalogue.node(catalogue.find_local("e1").unwrap()).unwrap();
        assert_eq!(entry.name(), Some("unite"));
        assert_eq!(entry.field_str("type"), Some("unit"));
    }

    #[test]
    fn untranslate_restores_the_graph() {
        let original = catalogue();
        let mut catalogue = original.clone();
        translate(&mut catalogue, &dictionary());
        assert_eq!(untranslate(&mut catalogue), 3);
        assert_eq!(catalogue, original);
    }

    #[test]
    fn second_dictionary_does_not_overwrite_source() {
        let mut catalogue = catalogue();
        translate(&mut catalogue, &dictionary());
        let chained = Translations::new().with("Regle", "Regel");
        assert_eq!(translate(&mut catalogue, &chained), 0);

        let rule = catalogue.node(catalogue.find_local("r1").unwrap()).unwrap();
        assert_eq!(rule.original_text("name"), Some("Rule"));
    }

    #[test]
    fn to_raw_writes_source_text() {
        let original = catalogue();
        let mut catalogue = original.clone();
        translate(&mut catalogue, &dictionary());
        assert_eq!(catalogue.to_raw(), original.to_raw());
    }

    #[test]
    fn source_original_fields_are_plain_data() {
        let raw = RawDocument::from_json_str(
            r#"{"catalogue": {
                "id": "cat1",
                "name": "Knights",
                "sharedSelectionEntries": [{
                    "id": "e1",
                    "name": "Rule",
                    "original_name": "Old Rule",
                    "original_description": "Rule",
                    "type": "upgrade"
                }]
            }}"#,
        )
        .unwrap();
        let original = Catalogue::from_raw(raw.clone()).unwrap();
        let mut catalogue = original.clone();

        assert_eq!(translate(&mut catalogue, &dictionary()), 1);
        let entry = catalogue.node(catalogue.find_local("e1").unwrap()).unwrap();
        assert_eq!(entry.name(), Some("Rule"), "occupied original_ slot blocks translation");
        assert_eq!(entry.field_str("original_name"), Some("Old Rule"));
        assert_eq!(entry.field_str("original_description"), Some("Rule"));
        assert!(!entry.is_translated("name"));
        assert_eq!(entry.original_text("name"), Some("Rule"));
        assert_eq!(catalogue.to_raw(), raw);

        assert_eq!(untranslate(&mut catalogue), 1);
        assert_eq!(catalogue, original);
        let entry = catalogue.node(catalogue.find_local("e1").unwrap()).unwrap();
        assert_eq!(entry.field_str("original_name"), Some("Old Rule"));
        assert_eq!(catalogue.to_raw(), raw);
    }

    #[test]
    fn dictionary_from_iterator() {
        let translations: Translations = [("a", "b"), ("c", "d")].into_iter().collect();
        assert_eq!(translations.len(), 2);
        assert_eq!(translations.get("c"), Some("d"));
        assert_eq!(translations.get("b"), None);
    }
}
