//! Rule schema and raw exchange format for Muster.
//!
//! This crate is the leaf of the workspace: plain data shapes with no
//! behaviour beyond parsing and a few tree helpers.
//!
//! - [`rules`] - [`Condition`], [`ConditionGroup`], [`Constraint`],
//!   [`Modifier`], [`ModifierGroup`], [`Repeat`] and the [`RuleSet`] every
//!   catalogue node may carry
//! - [`raw`] - [`RawDocument`], the tagged `gameSystem`/`catalogue` union
//!   storage backends exchange, plus [`CatalogueReference`]
//!
//! # Example
//!
//! ```
//! use muster_schema::{DocumentKind, RawDocument};
//!
//! let doc = RawDocument::from_json_str(
//!     r#"{"gameSystem": {"id": "sys1", "name": "Skirmish", "revision": 3}}"#,
//! )
//! .unwrap();
//!
//! assert_eq!(doc.kind(), DocumentKind::GameSystem);
//! assert_eq!(doc.revision(), 3);
//! ```

pub mod raw;
pub mod rules;

pub use raw::{CatalogueReference, DocumentInfo, DocumentKind, RawBody, RawCatalogueLink, RawDocument};
pub use rules::{
    Condition, ConditionGroup, Constraint, ConstraintType, GroupType, LocalConditionGroup,
    Modifier, ModifierGroup, Repeat, RuleSet, RuleValue, ScopeKind,
};
