//! Named custom validators.
//!
//! Schemas stay plain data by referring to custom checks by name. A
//! [`ValidatorRegistry`] maps those names to functions when validation runs.
//!
//! # Examples
//!
//! ```
//! use config_cascade_core::*;
//! use serde_json::json;
//!
//! let mut validators = ValidatorRegistry::default();
//! validators.register("even", |value, _container| {
//!     if value.as_i64().is_some_and(|n| n % 2 == 0) {
//!         CustomOutcome::ok()
//!     } else {
//!         CustomOutcome::fail(vec![Message::custom("not-even", "Value must be even.")])
//!     }
//! });
//!
//! let schema = Schema::from_defs(vec![
//!     FieldDef::number("columns", 2.0).with_validator("even"),
//!     FieldDef::number("rows", 2.0).with_validator("prime"),
//! ])
//! .unwrap();
//! assert_eq!(validators.missing_for(&schema), vec![("rows".to_string(), "prime".to_string())]);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::{Message, Schema};

/// Name of the built-in validator for path `points`.
pub const PATH_POINTS: &str = "path-points";

/// Verdict of a custom validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomOutcome {
    pub valid: bool,
    pub messages: Vec<Message>,
}

impl CustomOutcome {
    pub fn ok() -> Self {
        Self {
            valid: true,
            messages: Vec::new(),
        }
    }

    pub fn fail(messages: Vec<Message>) -> Self {
        Self {
            valid: false,
            messages,
        }
    }
}

/// A custom validator: receives the field value and the object containing
/// the field (the whole scope config for root fields).
pub type CustomValidator = Arc<dyn Fn(&Value, &Value) -> CustomOutcome + Send + Sync>;

/// Registry of named custom validators.
#[derive(Clone)]
pub struct ValidatorRegistry {
    validators: BTreeMap<String, CustomValidator>,
}

impl ValidatorRegistry {
    /// Creates a registry with no validators, not even the built-ins.
    pub fn empty() -> Self {
        Self {
            validators: BTreeMap::new(),
        }
    }

    /// Registers `validator` under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: &str, validator: F)
    where
        F: Fn(&Value, &Value) -> CustomOutcome + Send + Sync + 'static,
    {
        self.validators.insert(name.to_string(), Arc::new(validator));
    }

    pub fn get(&self, name: &str) -> Option<&CustomValidator> {
        self.validators.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.validators.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.validators.keys().map(String::as_str)
    }

    /// Lists `(path, validator name)` for every schema field referring to
    /// a validator this registry does not know.
    pub fn missing_for(&self, schema: &Schema) -> Vec<(String, String)> {
        schema
            .iter()
            .filter_map(|spec| {
                let name = spec.validator.as_ref()?;
                (!self.contains(name)).then(|| (spec.path.clone(), name.clone()))
            })
            .collect()
    }
}

impl Default for ValidatorRegistry {
    /// Creates a registry holding the built-in validators.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(PATH_POINTS, validate_path_points);
        registry
    }
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.validators.keys()).finish()
    }
}

/// Nesting layout of a path's `points` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PointsLayout {
    /// A single position.
    Coordinate,
    /// A list of positions.
    Single,
    /// A polygon outline followed by holes.
    SingleWithHoles,
    /// Several lists of positions.
    Multiple,
    /// Several polygons, each with holes.
    MultipleWithHoles,
}

/// Detects the layout of `points`, `None` when the nesting is not one of the
/// known layouts.
///
/// The nesting depth at which positions first appear decides the layout. A
/// depth of two reads as outline-plus-holes only for polygons.
///
/// ```
/// use config_cascade_core::{PointsLayout, points_layout};
/// use serde_json::json;
///
/// assert_eq!(points_layout(&json!([1, 2]), None), Some(PointsLayout::Coordinate));
/// assert_eq!(points_layout(&json!([[1, 2], [3, 4]]), None), Some(PointsLayout::Single));
/// assert_eq!(
///     points_layout(&json!([[[1, 2], [3, 4], [5, 6]]]), Some("polygon")),
///     Some(PointsLayout::SingleWithHoles)
/// );
/// assert_eq!(points_layout(&json!([[[[[1, 2]]]]]), None), None);
/// ```
pub fn points_layout(points: &Value, path_type: Option<&str>) -> Option<PointsLayout> {
    match position_depth(points)? {
        0 => Some(PointsLayout::Coordinate),
        1 => Some(PointsLayout::Single),
        2 if path_type == Some("polygon") => Some(PointsLayout::SingleWithHoles),
        2 => Some(PointsLayout::Multiple),
        3 => Some(PointsLayout::MultipleWithHoles),
        _ => None,
    }
}

/// A position is an `[x, y]` pair of numbers or a named location string.
fn is_position(value: &Value) -> bool {
    match value {
        Value::String(_) => true,
        Value::Array(pair) => pair.len() == 2 && pair.iter().all(Value::is_number),
        _ => false,
    }
}

/// Depth of the first position along the chain of first elements.
fn position_depth(points: &Value) -> Option<usize> {
    let mut depth = 0;
    let mut current = points;
    loop {
        if is_position(current) {
            return Some(depth);
        }
        current = current.as_array()?.first()?;
        depth += 1;
    }
}

const MAX_POINTS_DEPTH: usize = 3;

fn validate_path_points(value: &Value, path: &Value) -> CustomOutcome {
    let mut errors = Vec::new();

    if path.get("position").is_some_and(|position| !position.is_null()) {
        errors.push(Message::custom(
            "points-one-only",
            "\"points\" and \"position\" are mutually exclusive, only one may be present.",
        ));
    }

    if value.as_array().is_some_and(Vec::is_empty) {
        errors.push(Message::custom(
            "points-empty",
            "If the points array is defined, it must contain at least one element.",
        ));
        return CustomOutcome::fail(errors);
    }

    let path_type = path.get("type").and_then(Value::as_str);
    match position_depth(value) {
        Some(depth) if depth > MAX_POINTS_DEPTH => errors.push(Message::custom(
            "points-unrecognized-depth",
            format!("The points array nests positions {depth} arrays deep, at most {MAX_POINTS_DEPTH} are supported."),
        )),
        Some(depth) => {
            if let Err(error) = check_points(value, 0, depth, &mut Vec::new(), path_type) {
                errors.push(error);
            }
        }
        None => errors.push(first_chain_error(value)),
    }

    if errors.is_empty() {
        CustomOutcome::ok()
    } else {
        CustomOutcome::fail(errors)
    }
}

fn check_points(
    value: &Value,
    depth: usize,
    position_depth: usize,
    indexes: &mut Vec<usize>,
    path_type: Option<&str>,
) -> Result<(), Message> {
    if depth == position_depth {
        return match value {
            _ if is_position(value) => Ok(()),
            Value::Array(_) => Err(Message::custom(
                "points-coords-mislength",
                format!("The position at {} does not have exactly two numeric coordinates.", locate(indexes)),
            )),
            other => Err(expected_position(other, indexes)),
        };
    }

    let Value::Array(items) = value else {
        return Err(Message::custom(
            "points-expected-array",
            format!(
                "Element at {} is a {}, but at this depth it should be an array.",
                locate(indexes),
                crate::ValueKind::of(value)
            ),
        ));
    };
    if items.is_empty() {
        return Err(empty_sub_array(indexes));
    }
    if depth + 1 == position_depth {
        let required = match path_type {
            Some("polygon") => 3,
            Some("polyline" | "line") => 2,
            _ => 0,
        };
        if items.len() < required {
            return Err(Message::custom(
                "points-too-few",
                format!(
                    "The points array at {} needs {required} or more points, but only has {}.",
                    locate(indexes),
                    items.len()
                ),
            ));
        }
    }

    for (index, item) in items.iter().enumerate() {
        indexes.push(index);
        check_points(item, depth + 1, position_depth, indexes, path_type)?;
        indexes.pop();
    }
    Ok(())
}

/// Explains why no position was found along the first-element chain.
fn first_chain_error(points: &Value) -> Message {
    let mut indexes = Vec::new();
    let mut current = points;
    while let Value::Array(items) = current {
        match items.first() {
            Some(first) => {
                indexes.push(0);
                current = first;
            }
            None => return empty_sub_array(&indexes),
        }
    }
    expected_position(current, &indexes)
}

fn expected_position(value: &Value, indexes: &[usize]) -> Message {
    Message::custom(
        "points-expected-value",
        format!(
            "Element at {} is a {}, but it needs to be either an [x, y] pair or a string.",
            locate(indexes),
            crate::ValueKind::of(value)
        ),
    )
}

fn empty_sub_array(indexes: &[usize]) -> Message {
    Message::custom(
        "points-empty-sub-array",
        format!("{} contains an empty array.", locate(indexes)),
    )
}

fn locate(indexes: &[usize]) -> String {
    indexes
        .iter()
        .fold(String::from("points"), |acc, index| format!("{acc}[{index}]"))
}
