//! Property tests for the translation overlay.
//!
//! Random entry trees are built from a small vocabulary so that dictionary
//! keys collide with field values often, including chains where a display
//! value is itself a dictionary key.

use muster_graph::{Catalogue, Translations, translate, untranslate};
use muster_schema::RawDocument;
use proptest::prelude::*;
use serde_json::{Value, json};

const WORDS: &[&str] = &["Alpha", "Beta", "Gamma", "Delta", "Epsilon"];

#[derive(Clone, Debug)]
struct Entry {
    name: usize,
    description: usize,
    children: Vec<Entry>,
}

impl Entry {
    fn to_json(&self, id: &mut usize) -> Value {
        *id += 1;
        let children: Vec<Value> = self.children.iter().map(|child| child.to_json(id)).collect();
        json!({
            "id": format!("e{id}"),
            "name": WORDS[self.name],
            "type": "upgrade",
            "rules": [{"id": format!("r{id}"), "name": WORDS[self.description], "description": WORDS[self.name]}],
            "selectionEntries": children,
        })
    }
}

fn arb_entry(depth: u32) -> BoxedStrategy<Entry> {
    let leaf = (0..WORDS.len(), 0..WORDS.len()).prop_map(|(name, description)| Entry {
        name,
        description,
        children: Vec::new(),
    });
    if depth == 0 {
        leaf.boxed()
    } else {
        (
            0..WORDS.len(),
            0..WORDS.len(),
            prop::collection::vec(arb_entry(depth - 1), 0..=3usize),
        )
            .prop_map(|(name, description, children)| Entry {
                name,
                description,
                children,
            })
            .boxed()
    }
}

fn arb_translations() -> impl Strategy<Value = Translations> {
    prop::collection::vec((0..WORDS.len(), 0..WORDS.len()), 0..=6usize).prop_map(|pairs| {
        pairs
            .into_iter()
            .map(|(from, to)| (WORDS[from], WORDS[to]))
            .collect()
    })
}

fn build(entries: &[Entry], name: usize) -> Catalogue {
    let mut id = 0;
    let entries: Vec<Value> = entries.iter().map(|entry| entry.to_json(&mut id)).collect();
    let raw: RawDocument = serde_json::from_value(json!({
        "catalogue": {
            "id": "cat",
            "name": WORDS[name],
            "sharedSelectionEntries": entries,
        }
    }))
    .unwrap();
    Catalogue::from_raw(raw).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn untranslate_inverts_translate(
        entries in prop::collection::vec(arb_entry(2), 0..=3usize),
        name in 0..WORDS.len(),
        translations in arb_translations(),
    ) {
        let original = build(&entries, name);
        let mut catalogue = original.clone();

        let translated = translate(&mut catalogue, &translations);
        let restored = untranslate(&mut catalogue);

        prop_assert_eq!(translated, restored);
        prop_assert_eq!(catalogue, original);
    }

    #[test]
    fn retranslating_keeps_the_source_text(
        entries in prop::collection::vec(arb_entry(2), 1..=3usize),
        name in 0..WORDS.len(),
        first in arb_translations(),
        second in arb_translations(),
    ) {
        let original = build(&entries, name);
        let mut catalogue = original.clone();

        translate(&mut catalogue, &first);
        translate(&mut catalogue, &second);
        untranslate(&mut catalogue);

        prop_assert_eq!(catalogue, original);
    }

    #[test]
    fn serialising_a_translated_graph_writes_source_text(
        entries in prop::collection::vec(arb_entry(1), 0..=3usize),
        name in 0..WORDS.len(),
        translations in arb_translations(),
    ) {
        let original = build(&entries, name);
        let mut catalogue = original.clone();
        translate(&mut catalogue, &translations);

        prop_assert_eq!(catalogue.to_raw(), original.to_raw());
    }
}
