//! Schema integrity checks.
//!
//! [`Schema::from_defs`](super::Schema::from_defs) stops at the first
//! structural error it cannot normalize around. [`check_schema`] instead
//! collects every problem it can find, including softer ones such as a
//! default outside the declared types, so a schema author sees them all at
//! once.
//!
//! # Examples
//!
//! ```
//! use config_cascade_core::*;
//!
//! let defs = vec![FieldDef::boolean("disabled", false)];
//! assert!(check_schema(&defs).is_empty());
//!
//! let bad = vec![FieldDef::boolean("disabled", false).with_default("nope")];
//! assert!(matches!(
//!     check_schema(&bad)[0],
//!     SchemaDefinitionError::DefaultTypeMismatch { .. }
//! ));
//! ```

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::{FieldDef, OneOrMany, Schema, ValueKind};
use crate::error::SchemaDefinitionError;

static FIELD_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex must compile")
});

/// Lints a definition tree, returning every problem found.
pub fn check_schema(defs: &[FieldDef]) -> Vec<SchemaDefinitionError> {
    let mut errors = Vec::new();
    check_level(defs, "", &mut errors);

    // Redirect and completeness checks need the normalized arena. Duplicate
    // paths make the arena ambiguous, so those are reported alone.
    if errors
        .iter()
        .any(|error| matches!(error, SchemaDefinitionError::DuplicateField(_)))
    {
        return errors;
    }
    match Schema::from_defs(defs.to_vec()) {
        Ok(schema) => errors.extend(check_completeness(&schema)),
        Err(error) => errors.push(error),
    }
    errors
}

fn check_level(defs: &[FieldDef], parent_path: &str, errors: &mut Vec<SchemaDefinitionError>) {
    let mut seen: HashSet<&str> = HashSet::new();
    let names: HashSet<&str> = defs.iter().map(|def| def.name.as_str()).collect();

    for def in defs {
        let path = join(parent_path, &def.name);

        if def.name.trim().is_empty() {
            errors.push(SchemaDefinitionError::EmptyFieldName(parent_path.to_string()));
        } else if !FIELD_NAME_RE.is_match(&def.name) {
            errors.push(SchemaDefinitionError::InvalidFieldName(path.clone()));
        }

        if !seen.insert(def.name.as_str()) {
            errors.push(SchemaDefinitionError::DuplicateField(path.clone()));
        }

        if let Some(alias) = &def.alias {
            if names.contains(alias.as_str()) {
                errors.push(SchemaDefinitionError::AliasCollision {
                    path: path.clone(),
                    alias: alias.clone(),
                });
            }
        }

        if let (Some(default), Some(kind)) = (&def.default, &def.kind) {
            let accepted = OneOrMany::to_type_set(kind);
            let found = ValueKind::of(default);
            if !accepted.accepts(found) {
                errors.push(SchemaDefinitionError::DefaultTypeMismatch {
                    path: path.clone(),
                    expected: accepted.to_string(),
                    found,
                });
            }
        }

        check_level(&def.children, &path, errors);
    }
}

/// Required fields reachable from the root must be supplied by the defaults
/// scope, otherwise the merged config could lack them.
fn check_completeness(schema: &Schema) -> Vec<SchemaDefinitionError> {
    schema
        .iter()
        .filter(|spec| spec.required && !spec.synthetic)
        .filter(|spec| !schema.is_inside_array(spec.id))
        .filter(|spec| schema.effective_default(spec.id).is_none())
        .map(|spec| SchemaDefinitionError::RequiredWithoutDefault(spec.path.clone()))
        .collect()
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_schema_has_no_errors() {
        let defs = vec![
            FieldDef::boolean("enablePopups", true).with_alias("allowPopups"),
            FieldDef::object(
                "ruler",
                vec![FieldDef::number("pixelsToMeters", 100.0).required()],
            ),
        ];
        assert!(check_schema(&defs).is_empty());
    }

    #[test]
    fn test_collects_multiple_errors() {
        let defs = vec![
            FieldDef::boolean("bad-name", false),
            FieldDef::string("mode", "a").with_alias("other"),
            FieldDef::string("other", "b"),
        ];
        let errors = check_schema(&defs);
        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors[0],
            SchemaDefinitionError::InvalidFieldName("bad-name".to_string())
        );
        assert!(matches!(
            errors[1],
            SchemaDefinitionError::AliasCollision { ref alias, .. } if alias == "other"
        ));
    }

    #[test]
    fn test_duplicates_skip_arena_checks() {
        let defs = vec![
            FieldDef::redirect("a", "missing"),
            FieldDef::boolean("a", true),
        ];
        let errors = check_schema(&defs);
        assert_eq!(errors, vec![SchemaDefinitionError::DuplicateField("a".to_string())]);
    }

    #[test]
    fn test_reports_unresolved_redirect() {
        let errors = check_schema(&[FieldDef::redirect("style", "styles.style")]);
        assert!(matches!(
            errors[0],
            SchemaDefinitionError::UnresolvedRedirect { .. }
        ));
    }

    #[test]
    fn test_required_without_default() {
        let defs = vec![
            FieldDef::new("title", ValueKind::String).required(),
            FieldDef::array_of("items", ValueKind::Object).with_children(vec![FieldDef::object(
                "item",
                vec![FieldDef::new("id", ValueKind::String).required()],
            )]),
        ];
        // Required fields inside array elements are never defaulted.
        assert_eq!(
            check_schema(&defs),
            vec![SchemaDefinitionError::RequiredWithoutDefault("title".to_string())]
        );
    }

    #[test]
    fn test_self_referential_object_completes() {
        let defs = vec![FieldDef::object(
            "node",
            vec![
                FieldDef::string("label", "x"),
                FieldDef::redirect("next", "node").required(),
            ],
        )];
        assert!(check_schema(&defs).is_empty());

        // The recursive default is cut at the cycle, so a required leaf with
        // no default is still reported.
        let defs = vec![FieldDef::object(
            "node",
            vec![
                FieldDef::new("label", ValueKind::String).required(),
                FieldDef::redirect("next", "node").required(),
            ],
        )];
        assert_eq!(
            check_schema(&defs),
            vec![
                SchemaDefinitionError::RequiredWithoutDefault("node.label".to_string()),
                SchemaDefinitionError::RequiredWithoutDefault("node.next".to_string()),
            ]
        );
    }
}
