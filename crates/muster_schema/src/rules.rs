//! Declarative rule data: conditions, constraints, modifiers and repeats.
//!
//! Every rule in a catalogue is expressed with these shapes. They are plain
//! values: nothing in this crate evaluates them. Group types (`and`/`or`) and
//! constraint types (`min`/`max`/`exactly`) are parsed strictly; every other
//! discriminator (`scope`, `field`, condition and modifier `type`) is an opaque
//! string interpreted only by a rule evaluator.
//!
//! Unknown keys are kept in an `extra` map and numbers keep their integer or
//! float representation. These types are a typed view for readers; the graph
//! persists the raw rule values it parsed them from, so defaults filled in or
//! elided here never reach storage.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

fn is_false(value: &bool) -> bool {
    !*value
}

fn zero() -> Number {
    Number::from(0)
}

/// Parses a collection that may be stored either as an array or as a single
/// object (XML-to-JSON converters emit both shapes).
///
/// # Errors
///
/// Returns an error if any element fails to deserialize as `T`.
pub fn one_or_many<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, serde_json::Error> {
    match value {
        Value::Array(items) => items.into_iter().map(serde_json::from_value).collect(),
        Value::Null => Ok(Vec::new()),
        single => Ok(vec![serde_json::from_value(single)?]),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scalars
// ─────────────────────────────────────────────────────────────────────────────

/// Logical operator combining the children of a group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    /// Every child must hold.
    #[default]
    And,
    /// At least one child must hold.
    Or,
}

/// Kind of limit a [`Constraint`] places on a count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintType {
    /// Lower bound.
    Min,
    /// Upper bound.
    Max,
    /// Exact count.
    Exactly,
}

/// A rule operand: numeric, textual or boolean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    /// Boolean operand, e.g. for `hidden`.
    Bool(bool),
    /// Numeric operand, integer or float as written.
    Number(Number),
    /// Text operand, e.g. a new name or an id.
    Text(String),
}

impl Default for RuleValue {
    fn default() -> Self {
        Self::Number(zero())
    }
}

impl RuleValue {
    /// Returns the numeric value, if this is a number.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Returns the text value, if this is text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Non-validating view of a `scope` string.
///
/// Scopes are opaque to this layer; this only names the well-known values so
/// callers do not have to compare string literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind<'a> {
    /// `self`
    SelfScope,
    /// `parent`
    Parent,
    /// `force`
    Force,
    /// `roster`
    Roster,
    /// `ancestor`
    Ancestor,
    /// `primary-catalogue`
    PrimaryCatalogue,
    /// `primary-category`
    PrimaryCategory,
    /// Any other value, taken to be an explicit entry or category id.
    Id(&'a str),
}

impl<'a> ScopeKind<'a> {
    /// Classifies a raw scope string.
    #[must_use]
    pub fn classify(scope: &'a str) -> Self {
        match scope {
            "self" => Self::SelfScope,
            "parent" => Self::Parent,
            "force" => Self::Force,
            "roster" => Self::Roster,
            "ancestor" => Self::Ancestor,
            "primary-catalogue" => Self::PrimaryCatalogue,
            "primary-category" => Self::PrimaryCategory,
            other => Self::Id(other),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Conditions
// ─────────────────────────────────────────────────────────────────────────────

/// A single comparison of a counted `field` within a `scope` against `value`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Comparison kind, e.g. `atLeast`, `instanceOf`.
    #[serde(rename = "type")]
    pub kind: String,
    /// What to count: `selections`, `forces`, or a cost type id.
    #[serde(default)]
    pub field: String,
    /// Where to count from.
    #[serde(default)]
    pub scope: String,
    /// Right-hand operand.
    #[serde(default)]
    pub value: RuleValue,
    /// Entry, group or category id being counted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_id: Option<String>,
    /// Count across every instance of the scope.
    #[serde(default, skip_serializing_if = "is_false")]
    pub shared: bool,
    /// Include nested selections when counting.
    #[serde(default, skip_serializing_if = "is_false")]
    pub include_child_selections: bool,
    /// Include nested forces when counting.
    #[serde(default, skip_serializing_if = "is_false")]
    pub include_child_forces: bool,
    /// Treat `value` as a percentage.
    #[serde(default, skip_serializing_if = "is_false")]
    pub percent_value: bool,
    /// Author comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Keys not modelled here.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Condition {
    /// Classifies this condition's scope.
    #[must_use]
    pub fn scope_kind(&self) -> ScopeKind<'_> {
        ScopeKind::classify(&self.scope)
    }
}

/// A tree of conditions joined by `and`/`or`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionGroup {
    /// How the children combine.
    #[serde(rename = "type", default)]
    pub kind: GroupType,
    /// Leaf conditions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    /// Nested groups.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub condition_groups: Vec<ConditionGroup>,
    /// Author comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Keys not modelled here.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConditionGroup {
    /// Nesting depth; a group without nested groups has depth 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        1 + self
            .condition_groups
            .iter()
            .map(ConditionGroup::depth)
            .max()
            .unwrap_or(0)
    }

    /// Number of leaf conditions in the whole tree.
    #[must_use]
    pub fn condition_count(&self) -> usize {
        self.conditions.len()
            + self
                .condition_groups
                .iter()
                .map(ConditionGroup::condition_count)
                .sum::<usize>()
    }
}

/// A condition that counts within a local scope and repeats its effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalConditionGroup {
    /// Comparison kind, e.g. `atLeast`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Where to count from.
    #[serde(default)]
    pub scope: String,
    /// What to count.
    #[serde(default)]
    pub field: String,
    /// Entry or category id being counted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_id: Option<String>,
    /// Right-hand operand.
    #[serde(default = "zero")]
    pub value: Number,
    /// Number of repetitions per satisfied count.
    #[serde(default)]
    pub repeats: u32,
    /// Round partial repetitions up.
    #[serde(default, skip_serializing_if = "is_false")]
    pub round_up: bool,
    /// Include nested selections when counting.
    #[serde(default, skip_serializing_if = "is_false")]
    pub include_child_selections: bool,
    /// Include nested forces when counting.
    #[serde(default, skip_serializing_if = "is_false")]
    pub include_child_forces: bool,
    /// Treat `value` as a percentage.
    #[serde(default, skip_serializing_if = "is_false")]
    pub percent_value: bool,
    /// Keys not modelled here.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Applies a modifier once per `value` counted in `scope`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repeat {
    /// What to count.
    #[serde(default)]
    pub field: String,
    /// Where to count from.
    #[serde(default)]
    pub scope: String,
    /// Step size.
    #[serde(default = "zero")]
    pub value: Number,
    /// Repetitions per step.
    #[serde(default)]
    pub repeats: u32,
    /// Round partial steps up.
    #[serde(default, skip_serializing_if = "is_false")]
    pub round_up: bool,
    /// Entry or category id being counted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_id: Option<String>,
    /// Count across every instance of the scope.
    #[serde(default, skip_serializing_if = "is_false")]
    pub shared: bool,
    /// Include nested selections when counting.
    #[serde(default, skip_serializing_if = "is_false")]
    pub include_child_selections: bool,
    /// Include nested forces when counting.
    #[serde(default, skip_serializing_if = "is_false")]
    pub include_child_forces: bool,
    /// Treat `value` as a percentage.
    #[serde(default, skip_serializing_if = "is_false")]
    pub percent_value: bool,
    /// Keys not modelled here.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Repeat {
    /// Classifies this repeat's scope.
    #[must_use]
    pub fn scope_kind(&self) -> ScopeKind<'_> {
        ScopeKind::classify(&self.scope)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Constraints
// ─────────────────────────────────────────────────────────────────────────────

/// A bound on how many of something may be selected within a scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraint {
    /// Constraint id; modifiers target constraints through it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Kind of bound.
    #[serde(rename = "type")]
    pub kind: ConstraintType,
    /// The bound.
    #[serde(default = "zero")]
    pub value: Number,
    /// What to count.
    #[serde(default)]
    pub field: String,
    /// Where to count from.
    #[serde(default)]
    pub scope: String,
    /// Entry or category id being counted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_id: Option<String>,
    /// Count across every instance of the scope.
    #[serde(default, skip_serializing_if = "is_false")]
    pub shared: bool,
    /// Include nested selections when counting.
    #[serde(default, skip_serializing_if = "is_false")]
    pub include_child_selections: bool,
    /// Include nested forces when counting.
    #[serde(default, skip_serializing_if = "is_false")]
    pub include_child_forces: bool,
    /// Treat `value` as a percentage.
    #[serde(default, skip_serializing_if = "is_false")]
    pub percent_value: bool,
    /// Author comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Keys not modelled here.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Constraint {
    /// Classifies this constraint's scope.
    #[must_use]
    pub fn scope_kind(&self) -> ScopeKind<'_> {
        ScopeKind::classify(&self.scope)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Modifiers
// ─────────────────────────────────────────────────────────────────────────────

/// A change to a field of the owning node, optionally gated by conditions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Modifier {
    /// Operation, e.g. `set`, `increment`, `append`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Field being changed: `name`, `hidden`, a constraint id, ...
    #[serde(default)]
    pub field: String,
    /// Operand.
    #[serde(default)]
    pub value: RuleValue,
    /// What the modifier applies to, when not the owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affects: Option<String>,
    /// Scope of `affects`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Separator for text operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join: Option<String>,
    /// Extra operand for some operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arg: Option<String>,
    /// Gating conditions, all of which must hold.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    /// Gating condition trees.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub condition_groups: Vec<ConditionGroup>,
    /// Local repeating conditions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub local_condition_groups: Vec<LocalConditionGroup>,
    /// Repeats.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repeats: Vec<Repeat>,
    /// Author comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Keys not modelled here.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Modifier {
    /// Whether any condition gates this modifier.
    #[must_use]
    pub fn is_conditional(&self) -> bool {
        !self.conditions.is_empty()
            || !self.condition_groups.is_empty()
            || !self.local_condition_groups.is_empty()
    }
}

/// A tree of modifiers sharing conditions and repeats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifierGroup {
    /// How the group's own conditions combine, when given.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<GroupType>,
    /// Leaf modifiers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<Modifier>,
    /// Nested groups.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifier_groups: Vec<ModifierGroup>,
    /// Gating conditions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    /// Gating condition trees.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub condition_groups: Vec<ConditionGroup>,
    /// Local repeating conditions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub local_condition_groups: Vec<LocalConditionGroup>,
    /// Repeats applied to every modifier in the group.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repeats: Vec<Repeat>,
    /// Author comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Keys not modelled here.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModifierGroup {
    /// Nesting depth; a group without nested groups has depth 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        1 + self
            .modifier_groups
            .iter()
            .map(ModifierGroup::depth)
            .max()
            .unwrap_or(0)
    }

    /// Number of leaf modifiers in the whole tree.
    #[must_use]
    pub fn modifier_count(&self) -> usize {
        self.modifiers.len()
            + self
                .modifier_groups
                .iter()
                .map(ModifierGroup::modifier_count)
                .sum::<usize>()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RuleSet
// ─────────────────────────────────────────────────────────────────────────────

/// Raw collection names that hold rule data rather than graph nodes.
pub const RULE_KEYS: [&str; 7] = [
    "constraints",
    "modifiers",
    "modifierGroups",
    "conditions",
    "conditionGroups",
    "localConditionGroups",
    "repeats",
];

/// The rule-bearing collections a catalogue node may carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    /// Selection limits.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
    /// Field changes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<Modifier>,
    /// Grouped field changes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifier_groups: Vec<ModifierGroup>,
    /// Conditions (on modifier-like nodes).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    /// Condition trees.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub condition_groups: Vec<ConditionGroup>,
    /// Local repeating conditions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub local_condition_groups: Vec<LocalConditionGroup>,
    /// Repeats.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repeats: Vec<Repeat>,
}

impl RuleSet {
    /// Returns `true` if `key` names a rule collection.
    #[must_use]
    pub fn is_rule_key(key: &str) -> bool {
        RULE_KEYS.contains(&key)
    }

    /// Whether no rule collection holds anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
            && self.modifiers.is_empty()
            && self.modifier_groups.is_empty()
            && self.conditions.is_empty()
            && self.condition_groups.is_empty()
            && self.local_condition_groups.is_empty()
            && self.repeats.is_empty()
    }

    /// Parses a raw collection into the matching field.
    ///
    /// Returns `Ok(false)` without consuming anything meaningful if `key` is
    /// not a rule collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection does not match its schema.
    pub fn insert_raw(&mut self, key: &str, value: Value) -> Result<bool, serde_json::Error> {
        match key {
            "constraints" => self.constraints = one_or_many(value)?,
            "modifiers" => self.modifiers = one_or_many(value)?,
            "modifierGroups" => self.modifier_groups = one_or_many(value)?,
            "conditions" => self.conditions = one_or_many(value)?,
            "conditionGroups" => self.condition_groups = one_or_many(value)?,
            "localConditionGroups" => self.local_condition_groups = one_or_many(value)?,
            "repeats" => self.repeats = one_or_many(value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn group_type_is_strict() {
        let ok: ConditionGroup = serde_json::from_value(json!({"type": "or"})).unwrap();
        assert_eq!(ok.kind, GroupType::Or);

        let err = serde_json::from_value::<ConditionGroup>(json!({"type": "xor"}));
        assert!(err.is_err(), "only and/or are valid group types");
    }

    #[test]
    fn constraint_type_is_strict() {
        let err = serde_json::from_value::<Constraint>(json!({
            "type": "atLeast", "value": 1, "field": "selections", "scope": "parent"
        }));
        assert!(err.is_err());
    }

    #[test]
    fn nested_condition_group_depth_and_count() {
        let group: ConditionGroup = serde_json::from_value(json!({
            "type": "and",
            "conditions": [{"type": "atLeast", "field": "selections", "scope": "force", "value": 1}],
            "conditionGroups": [{
                "type": "or",
                "conditions": [
                    {"type": "equalTo", "field": "selections", "scope": "parent", "value": 0},
                    {"type": "instanceOf", "field": "selections", "scope": "ancestor", "value": 1, "childId": "c1"}
                ],
                "conditionGroups": [{"type": "and"}]
            }]
        }))
        .unwrap();

        assert_eq!(group.depth(), 3);
        assert_eq!(group.condition_count(), 3);
        assert_eq!(
            group.condition_groups[0].conditions[1].scope_kind(),
            ScopeKind::Ancestor
        );
    }

    #[test]
    fn modifier_group_mirrors_condition_group() {
        let group: ModifierGroup = serde_json::from_value(json!({
            "modifiers": [{"type": "set", "field": "name", "value": "Veteran"}],
            "modifierGroups": [{
                "type": "or",
                "modifiers": [
                    {"type": "increment", "field": "c1", "value": 1},
                    {"type": "set", "field": "hidden", "value": true}
                ]
            }]
        }))
        .unwrap();

        assert_eq!(group.kind, None);
        assert_eq!(group.depth(), 2);
        assert_eq!(group.modifier_count(), 3);
        assert_eq!(group.modifiers[0].value.as_str(), Some("Veteran"));
        assert_eq!(
            group.modifier_groups[0].modifiers[1].value,
            RuleValue::Bool(true)
        );
    }

    #[test]
    fn scope_classification() {
        assert_eq!(ScopeKind::classify("self"), ScopeKind::SelfScope);
        assert_eq!(
            ScopeKind::classify("primary-catalogue"),
            ScopeKind::PrimaryCatalogue
        );
        assert_eq!(ScopeKind::classify("abcd-1234"), ScopeKind::Id("abcd-1234"));
    }

    #[test]
    fn unknown_keys_survive_serialisation() {
        let raw = json!({"type": "atLeast", "field": "selections", "scope": "self", "value": 2, "unusual": "kept"});
        let condition: Condition = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(condition.extra.get("unusual"), Some(&json!("kept")));
        assert_eq!(serde_json::to_value(&condition).unwrap(), raw);
    }

    #[test]
    fn rule_set_accepts_single_objects() {
        let mut rules = RuleSet::default();
        let handled = rules
            .insert_raw(
                "constraints",
                json!({"type": "max", "value": 3, "field": "selections", "scope": "roster", "id": "k1"}),
            )
            .unwrap();
        assert!(handled);
        assert_eq!(rules.constraints.len(), 1);
        assert_eq!(rules.constraints[0].kind, ConstraintType::Max);

        assert!(!rules.insert_raw("profiles", json!([])).unwrap());
    }

    #[test]
    fn numbers_keep_their_representation() {
        let constraint: Constraint = serde_json::from_value(json!({
            "type": "max", "value": 1, "field": "selections", "scope": "roster"
        }))
        .unwrap();
        assert_eq!(constraint.value, Number::from(1));
        assert_eq!(serde_json::to_value(&constraint).unwrap()["value"], json!(1));

        let modifier: Modifier =
            serde_json::from_value(json!({"type": "increment", "field": "c1", "value": 2})).unwrap();
        assert_eq!(modifier.value.as_f64(), Some(2.0));
        assert_eq!(serde_json::to_value(&modifier).unwrap()["value"], json!(2));

        let repeat: Repeat = serde_json::from_value(json!({"field": "selections", "scope": "parent", "value": 1.5})).unwrap();
        assert_eq!(serde_json::to_value(&repeat).unwrap()["value"], json!(1.5));
    }
}
