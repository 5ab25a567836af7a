//! Value kinds and accepted-type sets.
//!
//! Every raw configuration value is classified into exactly one
//! [`ValueKind`]. A field declares the kinds it accepts as a [`TypeSet`],
//! which keeps type matching exhaustive instead of comparing loose strings.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of a JSON configuration value.
///
/// Arrays are distinguished from objects, and `null` stands in for both an
/// explicit null and a missing value.
///
/// # Examples
///
/// ```
/// use config_cascade_core::ValueKind;
/// use serde_json::json;
///
/// assert_eq!(ValueKind::of(&json!([1, 2])), ValueKind::Array);
/// assert_eq!(ValueKind::of(&json!({"a": 1})), ValueKind::Object);
/// assert_eq!(ValueKind::of(&json!(null)), ValueKind::Null);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Number,
    Boolean,
    Object,
    Array,
    Null,
}

impl ValueKind {
    /// All kinds, in declaration order.
    pub const ALL: [ValueKind; 6] = [
        ValueKind::String,
        ValueKind::Number,
        ValueKind::Boolean,
        ValueKind::Object,
        ValueKind::Array,
        ValueKind::Null,
    ];

    /// Classifies a value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::String(_) => Self::String,
            Value::Number(_) => Self::Number,
            Value::Bool(_) => Self::Boolean,
            Value::Object(_) => Self::Object,
            Value::Array(_) => Self::Array,
            Value::Null => Self::Null,
        }
    }

    /// Returns `true` for object and array kinds.
    pub fn is_container(self) -> bool {
        matches!(self, Self::Object | Self::Array)
    }

    fn bit(self) -> u8 {
        match self {
            Self::String => 1,
            Self::Number => 1 << 1,
            Self::Boolean => 1 << 2,
            Self::Object => 1 << 3,
            Self::Array => 1 << 4,
            Self::Null => 1 << 5,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Number => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
            Self::Object => write!(f, "object"),
            Self::Array => write!(f, "array"),
            Self::Null => write!(f, "null"),
        }
    }
}

/// Set of value kinds a field accepts.
///
/// An empty set places no constraint on the kind of the value.
///
/// # Examples
///
/// ```
/// use config_cascade_core::{TypeSet, ValueKind};
///
/// let set = TypeSet::from_kinds([ValueKind::String, ValueKind::Object]);
/// assert!(set.contains(ValueKind::Object));
/// assert!(!set.contains(ValueKind::Number));
/// assert_eq!(set.to_string(), "string|object");
///
/// assert!(TypeSet::any().accepts(ValueKind::Number));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TypeSet(u8);

impl TypeSet {
    /// The unconstrained set.
    pub const fn any() -> Self {
        Self(0)
    }

    /// A set holding exactly one kind.
    pub fn single(kind: ValueKind) -> Self {
        Self(kind.bit())
    }

    /// Builds a set from any collection of kinds.
    pub fn from_kinds(kinds: impl IntoIterator<Item = ValueKind>) -> Self {
        kinds
            .into_iter()
            .fold(Self::any(), |set, kind| Self(set.0 | kind.bit()))
    }

    /// Returns `true` when no kind was declared.
    pub fn is_unconstrained(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` when `kind` was declared explicitly.
    pub fn contains(self, kind: ValueKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Returns `true` when a value of `kind` satisfies this set.
    pub fn accepts(self, kind: ValueKind) -> bool {
        self.is_unconstrained() || self.contains(kind)
    }

    /// Iterates the declared kinds in [`ValueKind::ALL`] order.
    pub fn iter(self) -> impl Iterator<Item = ValueKind> {
        ValueKind::ALL
            .into_iter()
            .filter(move |kind| self.contains(*kind))
    }

    /// Number of declared kinds.
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Returns `true` when no kind was declared.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unconstrained() {
            return write!(f, "any");
        }
        let names: Vec<String> = self.iter().map(|kind| kind.to_string()).collect();
        write!(f, "{}", names.join("|"))
    }
}

impl Serialize for TypeSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

/// Either a single item or a list of items.
///
/// Schema documents may write `"type": "string"` or
/// `"type": ["string", "object"]`; both deserialize into this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl OneOrMany<ValueKind> {
    /// Normalizes into a [`TypeSet`].
    pub fn to_type_set(&self) -> TypeSet {
        match self {
            Self::One(kind) => TypeSet::single(*kind),
            Self::Many(kinds) => TypeSet::from_kinds(kinds.iter().copied()),
        }
    }
}

impl From<ValueKind> for OneOrMany<ValueKind> {
    fn from(kind: ValueKind) -> Self {
        Self::One(kind)
    }
}

impl From<TypeSet> for OneOrMany<ValueKind> {
    fn from(set: TypeSet) -> Self {
        let kinds: Vec<ValueKind> = set.iter().collect();
        match kinds.as_slice() {
            [single] => Self::One(*single),
            _ => Self::Many(kinds),
        }
    }
}

/// Returns `true` for values treated as "present but empty": an empty
/// object, an empty string, or null.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Structural equality that compares numbers by numeric value, so `100`
/// and `100.0` are equal.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}
