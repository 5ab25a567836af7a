//! Hierarchical configuration validation and fallback resolution.
//!
//! Settings are supplied by up to four scopes, from lowest to highest
//! precedence:
//!
//! - **defaults**: derived from the schema itself.
//! - **global**: site-wide settings.
//! - **local**: settings attached to one named map.
//! - **embed**: settings attached to one rendered instance of a map.
//!
//! Each scope is validated against a [`Schema`] into a [`ValidationTree`]
//! of [`ValidationNode`]s. A key that is absent or invalid in a scope falls
//! back to the nearest lower scope that supplies a valid value for it
//! ([`resolve_fallback`]), so the tree always carries a complete merged
//! `config` next to the scope's own `config_self`.
//!
//! Schemas are authored as [`FieldDef`] trees and compiled with
//! [`Schema::from_defs`]; [`check_schema`] reports every authoring mistake at
//! once. Custom checks are plugged in by name through a
//! [`ValidatorRegistry`]. [`Cascade`] keeps a full set of scopes validated in
//! precedence order.
//!
//! # Example
//!
//! ```
//! use config_cascade_core::*;
//! use serde_json::json;
//!
//! let schema = Schema::from_defs(vec![
//!     FieldDef::boolean("enablePopups", true).with_alias("allowPopups"),
//!     FieldDef::string("sortMarkers", "latitude")
//!         .with_valid_values(["latitude", "longitude", "category", "unsorted"]),
//! ])
//! .unwrap();
//!
//! let mut cascade = Cascade::new(schema, ValidatorRegistry::default());
//! cascade.insert(ScopeConfig::global(json!({ "sortMarkers": "category" }))).unwrap();
//! cascade.insert(ScopeConfig::local("Atlas", json!({ "allowPopups": "no" }))).unwrap();
//!
//! let local = cascade.tree(ScopeKind::Local, "Atlas").unwrap();
//! assert_eq!(local.config, json!({ "enablePopups": false, "sortMarkers": "category" }));
//! assert_eq!(local.config_self, json!({ "enablePopups": false }));
//!
//! let popups = local.node("enablePopups").unwrap();
//! assert!(popups.is_aliased && popups.is_resolved);
//! assert!(popups.has_message(&MessageCode::Coerced));
//! ```

mod cascade;
mod coerce;
mod error;
mod fallback;
mod field;
mod message;
mod node;
mod path;
mod schema;
mod scope;
mod validate;
mod validators;

pub mod builtin;

pub use cascade::Cascade;
pub use coerce::{Coercion, coerce};
pub use error::{CascadeError, SchemaDefinitionError};
pub use fallback::{Fallback, resolve_fallback};
pub use message::{IssueKind, Message, MessageCode};
pub use node::{NodeKey, NodeState, ValidationNode};
pub use path::{Found, value_at_path};
pub use schema::{
    ELEMENT_SEGMENT, FieldDef, FieldId, FieldSpec, OneOrMany, Schema, TypeSet, ValueKind,
    check_schema, is_empty_value, values_equal,
};
pub use scope::{ScopeConfig, ScopeKind, ScopeMeta, ScopeRegistry};
pub use validate::{ConfigValidator, Summary, ValidationTree, digest};
pub use validators::{
    CustomOutcome, CustomValidator, PATH_POINTS, PointsLayout, ValidatorRegistry, points_layout,
};
