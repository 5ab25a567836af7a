//! Serializable field definitions.
//!
//! A schema is authored as a tree of [`FieldDef`] values, either in Rust via
//! the builder methods or loaded from JSON/YAML. The tree is plain data:
//! custom validation is referenced by name, not embedded as code.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::kind::{OneOrMany, ValueKind};

/// Definition of one configuration key.
///
/// # Examples
///
/// ```
/// use config_cascade_core::{FieldDef, ValueKind};
/// use serde_json::json;
///
/// let popups = FieldDef::boolean("enablePopups", true).with_alias("allowPopups");
/// assert_eq!(popups.alias.as_deref(), Some("allowPopups"));
/// assert_eq!(popups.default, Some(json!(true)));
///
/// let sort = FieldDef::string("sortMarkers", "latitude")
///     .with_valid_values(["latitude", "longitude", "category", "unsorted"]);
/// assert_eq!(sort.valid_values.as_ref().map(Vec::len), Some(4));
///
/// let hidden = FieldDef::array_of("hiddenCategories", ValueKind::String);
/// assert_eq!(hidden.default, Some(json!([])));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    /// Canonical key.
    pub name: String,
    /// Legacy key accepted in place of `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Dotted path of another definition whose type and children are reused.
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    /// Whether the key must be present.
    #[serde(default)]
    pub presence: bool,
    /// Value used by the defaults scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Accepted kind(s).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<OneOrMany<ValueKind>>,
    /// Accepted element kind(s) for arrays without an element child.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_type: Option<OneOrMany<ValueKind>>,
    /// Enumerated allowed values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_values: Option<Vec<Value>>,
    /// Declared children (object keys, or the single element definition of
    /// an array).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FieldDef>,
    /// Name of a registered custom validator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator: Option<String>,
}

impl FieldDef {
    /// Creates a definition accepting the given kind(s) with no default.
    pub fn new(name: &str, kind: impl Into<OneOrMany<ValueKind>>) -> Self {
        Self {
            name: name.to_string(),
            alias: None,
            redirect: None,
            presence: false,
            default: None,
            kind: Some(kind.into()),
            array_type: None,
            valid_values: None,
            children: Vec::new(),
            validator: None,
        }
    }

    /// Creates a definition accepting any of `kinds`.
    pub fn any_of(name: &str, kinds: &[ValueKind]) -> Self {
        Self::new(name, OneOrMany::Many(kinds.to_vec()))
    }

    /// Creates a boolean definition with a default.
    pub fn boolean(name: &str, default: bool) -> Self {
        Self::new(name, ValueKind::Boolean).with_default(default)
    }

    /// Creates a string definition with a default.
    pub fn string(name: &str, default: &str) -> Self {
        Self::new(name, ValueKind::String).with_default(default)
    }

    /// Creates a number definition with a default.
    pub fn number(name: &str, default: f64) -> Self {
        Self::new(name, ValueKind::Number).with_default(number_value(default))
    }

    /// Creates an array definition whose elements are of `element` kind(s),
    /// defaulting to an empty array.
    pub fn array_of(name: &str, element: impl Into<OneOrMany<ValueKind>>) -> Self {
        let mut def = Self::new(name, ValueKind::Array).with_default(Value::Array(Vec::new()));
        def.array_type = Some(element.into());
        def
    }

    /// Creates an object definition with declared children.
    pub fn object(name: &str, children: Vec<FieldDef>) -> Self {
        Self::new(name, ValueKind::Object).with_children(children)
    }

    /// Creates a definition that reuses the definition at `target`.
    pub fn redirect(name: &str, target: &str) -> Self {
        Self {
            name: name.to_string(),
            alias: None,
            redirect: Some(target.to_string()),
            presence: false,
            default: None,
            kind: None,
            array_type: None,
            valid_values: None,
            children: Vec::new(),
            validator: None,
        }
    }

    /// Sets the legacy alias.
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    /// Sets the default value.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Removes the default value.
    pub fn without_default(mut self) -> Self {
        self.default = None;
        self
    }

    /// Marks the key as required.
    pub fn required(mut self) -> Self {
        self.presence = true;
        self
    }

    /// Restricts the value to an enumerated set.
    pub fn with_valid_values<V: Into<Value>>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.valid_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the declared children.
    pub fn with_children(mut self, children: Vec<FieldDef>) -> Self {
        self.children = children;
        self
    }

    /// Sets the accepted element kind(s).
    pub fn with_array_type(mut self, element: impl Into<OneOrMany<ValueKind>>) -> Self {
        self.array_type = Some(element.into());
        self
    }

    /// Attaches a named custom validator.
    pub fn with_validator(mut self, name: &str) -> Self {
        self.validator = Some(name.to_string());
        self
    }
}

/// Converts an `f64` into a JSON number, preferring an integer
/// representation for integral values.
pub(crate) fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}
