//! Whole-scope validation.
//!
//! [`ConfigValidator::validate_config`] runs the field validator over every
//! root field of the schema and projects the result twice: `config_self`
//! holds only what the scope itself supplied, `config` is the complete merged
//! configuration.
//!
//! Scopes must be validated after the scopes they fall back to: defaults,
//! then global, then locals, then embeds. [`Cascade`](crate::Cascade) takes
//! care of that ordering.
//!
//! # Examples
//!
//! ```
//! use config_cascade_core::*;
//! use serde_json::json;
//!
//! let schema = Schema::from_defs(vec![
//!     FieldDef::boolean("enablePopups", true).with_alias("allowPopups"),
//!     FieldDef::string("sortMarkers", "latitude"),
//! ])
//! .unwrap();
//! let validators = ValidatorRegistry::default();
//! let registry = ScopeRegistry::new();
//!
//! let tree = ConfigValidator::new(&schema, &validators, &registry)
//!     .validate_config(&ScopeConfig::global(json!({ "allowPopups": "no", "foo": 1 })));
//!
//! assert_eq!(tree.config, json!({ "enablePopups": false, "sortMarkers": "latitude" }));
//! assert_eq!(tree.config_self, json!({ "enablePopups": false }));
//! assert_eq!(tree.children_self, vec!["enablePopups".to_string()]);
//! assert_eq!(tree.unknown_fields().count(), 1);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::field::{FieldValidator, Location};
use crate::{
    IssueKind, Schema, ScopeConfig, ScopeMeta, ScopeRegistry, ValidationNode, ValidatorRegistry,
};

/// Validation result of one scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationTree {
    pub meta: ScopeMeta,
    /// SHA-256 of the raw input, hex encoded.
    pub digest: String,
    /// One node per root field in schema order, then one per unknown key.
    pub children: Vec<ValidationNode>,
    /// Keys of root nodes whose value this scope supplied itself.
    pub children_self: Vec<String>,
    pub config_self: Value,
    /// Every root field of the schema; `null` where nothing resolved.
    pub config: Value,
}

impl ValidationTree {
    /// Returns the root node for a declared field.
    pub fn node(&self, key: &str) -> Option<&ValidationNode> {
        self.children
            .iter()
            .find(|node| !node.is_unknown() && node.matches_segment(key))
    }

    /// Returns the node at a dotted location path, array positions given as
    /// indices.
    pub fn node_at_path(&self, path: &str) -> Option<&ValidationNode> {
        match path.split_once('.') {
            Some((first, rest)) => self.node(first)?.descendant(rest),
            None => self.node(path),
        }
    }

    /// Root nodes listed in `children_self`.
    pub fn self_children(&self) -> impl Iterator<Item = &ValidationNode> {
        self.children.iter().filter(|node| {
            node.canonical_key
                .as_ref()
                .is_some_and(|key| self.children_self.contains(key))
        })
    }

    /// Root nodes for keys the schema does not declare.
    pub fn unknown_fields(&self) -> impl Iterator<Item = &ValidationNode> {
        self.children.iter().filter(|node| node.is_unknown())
    }

    /// Every node of the tree, depth-first.
    pub fn iter(&self) -> impl Iterator<Item = &ValidationNode> {
        self.children.iter().flat_map(ValidationNode::iter)
    }

    /// Counts nodes, fallbacks and messages by issue kind.
    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for node in self.iter() {
            summary.nodes += 1;
            if node.is_fallback {
                summary.fallbacks += 1;
            }
            for message in &node.messages {
                *summary.counts.entry(message.issue_kind()).or_default() += 1;
            }
        }
        summary
    }
}

/// Message counts of a [`ValidationTree`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub nodes: usize,
    pub fallbacks: usize,
    pub counts: BTreeMap<IssueKind, usize>,
}

impl Summary {
    pub fn count(&self, kind: IssueKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Number of messages that are not notices.
    pub fn problems(&self) -> usize {
        self.counts
            .iter()
            .filter(|(kind, _)| kind.is_problem())
            .map(|(_, count)| count)
            .sum()
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} nodes, {} fallbacks", self.nodes, self.fallbacks)?;
        for kind in IssueKind::ALL {
            let count = self.count(kind);
            if count > 0 {
                write!(f, ", {kind}: {count}")?;
            }
        }
        Ok(())
    }
}

/// Hex-encoded SHA-256 of a raw scope value.
pub fn digest(raw: &Value) -> String {
    let bytes = serde_json::to_vec(raw).unwrap_or_default();
    format!("{:x}", Sha256::digest(&bytes))
}

/// Validates whole scopes against a schema.
#[derive(Debug, Clone, Copy)]
pub struct ConfigValidator<'a> {
    schema: &'a Schema,
    validators: &'a ValidatorRegistry,
    registry: &'a ScopeRegistry,
}

impl<'a> ConfigValidator<'a> {
    /// Creates a validator reading fallbacks from `registry`.
    pub fn new(schema: &'a Schema, validators: &'a ValidatorRegistry, registry: &'a ScopeRegistry) -> Self {
        Self {
            schema,
            validators,
            registry,
        }
    }

    /// Validates the schema-derived defaults scope.
    pub fn validate_defaults(&self) -> ValidationTree {
        let raw = Value::Object(self.schema.defaults_document());
        self.validate_config(&ScopeConfig::new(ScopeMeta::defaults(), raw))
    }

    /// Validates one scope.
    ///
    /// Never fails: a raw value that is not an object is treated as an empty
    /// object, so every field resolves through fallback.
    pub fn validate_config(&self, scope: &ScopeConfig) -> ValidationTree {
        let empty = Value::Object(Map::new());
        let raw = if scope.raw.is_object() {
            &scope.raw
        } else {
            warn!(scope = %scope.meta.kind, source = %scope.meta.source_id, "Scope config is not an object, ignoring it");
            &empty
        };

        let fields = FieldValidator {
            schema: self.schema,
            validators: self.validators,
            registry: self.registry,
            meta: &scope.meta,
        };
        let roots = self.schema.roots();
        let children = fields.validate_object(roots, raw, &Location::root());

        let own: Vec<&ValidationNode> = children.iter().filter(|node| node.is_own()).collect();
        let children_self = own
            .iter()
            .filter_map(|node| node.canonical_key.clone())
            .collect();
        let config_self: Map<String, Value> = own
            .iter()
            .filter_map(|node| Some((node.canonical_key.clone()?, node.value.clone())))
            .collect();

        // Declared fields come first, in root order.
        let config: Map<String, Value> = roots
            .iter()
            .zip(&children)
            .map(|(id, node)| {
                let value = if node.is_usable() { node.value.clone() } else { Value::Null };
                (self.schema.spec(*id).name.clone(), value)
            })
            .collect();

        let tree = ValidationTree {
            meta: scope.meta.clone(),
            digest: digest(&scope.raw),
            children,
            children_self,
            config_self: Value::Object(config_self),
            config: Value::Object(config),
        };
        debug!(
            scope = %tree.meta.kind,
            source = %tree.meta.source_id,
            summary = %tree.summary(),
            "Validated scope"
        );
        tree
    }
}
