//! Fallback resolution along the scope precedence chain.

use serde_json::Value;
use tracing::debug;

use crate::{Schema, ScopeKind, ScopeMeta, ScopeRegistry, ValidationNode, ValueKind, value_at_path};

/// A substitute value found in a lower scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Fallback<'r> {
    pub value: Value,
    pub kind: ValueKind,
    pub matched_key: String,
    pub source: ScopeKind,
    /// The already validated node at the same path in the source scope.
    /// Always `None` for the defaults scope, whose values come straight
    /// from the schema.
    pub candidate: Option<&'r ValidationNode>,
}

/// Finds the value that applies to `path` below the `requester` scope.
///
/// Walks down from the next scope under `requester` and returns the first
/// scope that supplies a value. Non-defaults scopes are read from the
/// validated own values (`config_self`) of their trees in `registry`; a
/// scope without a tree is skipped. The defaults scope is always available.
///
/// # Examples
///
/// ```
/// use config_cascade_core::*;
/// use serde_json::json;
///
/// let schema = Schema::from_defs(vec![FieldDef::string("sortMarkers", "latitude")]).unwrap();
/// let validators = ValidatorRegistry::default();
/// let mut registry = ScopeRegistry::new();
///
/// let fallback = resolve_fallback(&schema, &registry, "sortMarkers", &ScopeMeta::local("Atlas")).unwrap();
/// assert_eq!(fallback.source, ScopeKind::Defaults);
///
/// let global = ConfigValidator::new(&schema, &validators, &registry)
///     .validate_config(&ScopeConfig::global(json!({ "sortMarkers": "category" })));
/// registry.insert(global);
///
/// let fallback = resolve_fallback(&schema, &registry, "sortMarkers", &ScopeMeta::local("Atlas")).unwrap();
/// assert_eq!(fallback.source, ScopeKind::Global);
/// assert_eq!(fallback.value, json!("category"));
/// assert!(fallback.candidate.is_some());
/// ```
pub fn resolve_fallback<'r>(
    schema: &Schema,
    registry: &'r ScopeRegistry,
    path: &str,
    requester: &ScopeMeta,
) -> Option<Fallback<'r>> {
    let mut next = requester.kind.next_down();
    while let Some(kind) = next {
        if let Some(fallback) = lookup(schema, registry, path, requester, kind) {
            debug!(path, source = %kind, requester = %requester.kind, "Resolved fallback");
            return Some(fallback);
        }
        next = kind.next_down();
    }
    None
}

fn lookup<'r>(
    schema: &Schema,
    registry: &'r ScopeRegistry,
    path: &str,
    requester: &ScopeMeta,
    kind: ScopeKind,
) -> Option<Fallback<'r>> {
    if kind == ScopeKind::Defaults {
        let found = value_at_path(schema, path, &Value::Null, kind)?;
        return Some(Fallback {
            value: found.value,
            kind: found.kind,
            matched_key: found.matched_key,
            source: kind,
            candidate: None,
        });
    }

    let tree = registry.candidate(kind, requester)?;
    let found = value_at_path(schema, path, &tree.config_self, kind)?;
    Some(Fallback {
        value: found.value,
        kind: found.kind,
        matched_key: found.matched_key,
        source: kind,
        candidate: tree.node_at_path(path),
    })
}
