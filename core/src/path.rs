//! Dotted-path lookup into raw configuration data.
//!
//! Schema lookups live on [`Schema::spec_at_path`]; this module walks the
//! data side of the same path, matching each segment against the field's
//! canonical name and then its alias.

use serde_json::Value;

use crate::{Schema, ScopeKind, ValueKind};

/// A value located by [`value_at_path`].
#[derive(Debug, Clone, PartialEq)]
pub struct Found {
    pub value: Value,
    /// Key the final segment matched in the data: the canonical name, the
    /// alias, or the literal segment for undeclared paths.
    pub matched_key: String,
    pub kind: ValueKind,
}

/// Looks up `path` in `raw`.
///
/// The defaults scope is the schema's own defaults, so for
/// [`ScopeKind::Defaults`] the raw data is ignored and the field's
/// effective default is returned instead. A field without a default is not
/// found there.
///
/// # Examples
///
/// ```
/// use config_cascade_core::*;
/// use serde_json::json;
///
/// let schema = Schema::from_defs(vec![
///     FieldDef::boolean("enablePopups", true).with_alias("allowPopups"),
/// ])
/// .unwrap();
///
/// let raw = json!({ "allowPopups": false });
/// let found = value_at_path(&schema, "enablePopups", &raw, ScopeKind::Local).unwrap();
/// assert_eq!(found.value, json!(false));
/// assert_eq!(found.matched_key, "allowPopups");
///
/// let found = value_at_path(&schema, "enablePopups", &raw, ScopeKind::Defaults).unwrap();
/// assert_eq!(found.value, json!(true));
/// ```
pub fn value_at_path(schema: &Schema, path: &str, raw: &Value, scope: ScopeKind) -> Option<Found> {
    if scope == ScopeKind::Defaults {
        let id = schema.spec_at_path(path)?;
        let value = schema.effective_default(id)?;
        return Some(Found {
            kind: ValueKind::of(&value),
            matched_key: schema.spec(id).name.clone(),
            value,
        });
    }

    let mut current = raw;
    let mut matched_key = String::new();
    let mut prefix = String::new();
    for segment in path.split('.') {
        if !prefix.is_empty() {
            prefix.push('.');
        }
        prefix.push_str(segment);

        let object = current.as_object()?;
        let alias = schema
            .spec_at_path(&prefix)
            .and_then(|id| schema.spec(id).alias.as_deref());
        let (key, value) = match object.get_key_value(segment) {
            Some(entry) => entry,
            None => object.get_key_value(alias?)?,
        };
        matched_key = key.clone();
        current = value;
    }

    Some(Found {
        value: current.clone(),
        matched_key,
        kind: ValueKind::of(current),
    })
}
