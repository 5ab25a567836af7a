//! Coercion of mistyped values.
//!
//! Targets are tried in a fixed order: boolean, number, then structured
//! (array/object) parsing. Only the targets a field accepts are tried. Every
//! failed attempt contributes its own message, so a field accepting several
//! kinds reports why each conversion was rejected.

use serde_json::Value;

use crate::schema::number_value;
use crate::{Message, MessageCode, TypeSet, ValueKind};

const TRUE_TOKENS: [&str; 3] = ["true", "yes", "1"];
const FALSE_TOKENS: [&str; 3] = ["false", "no", "0"];

/// Result of running the coercion ladder.
#[derive(Debug, Clone, PartialEq)]
pub struct Coercion {
    /// Converted value, `None` when every attempt failed.
    pub value: Option<Value>,
    /// One message per attempt, failures and the final success alike.
    pub messages: Vec<Message>,
}

/// Tries to convert `value` into one of the `accepted` kinds.
///
/// # Examples
///
/// ```
/// use config_cascade_core::{TypeSet, ValueKind, coerce};
/// use serde_json::json;
///
/// let boolean = TypeSet::single(ValueKind::Boolean);
/// assert_eq!(coerce(&json!("Yes"), boolean).value, Some(json!(true)));
/// assert_eq!(coerce(&json!(0), boolean).value, Some(json!(false)));
/// assert_eq!(coerce(&json!("2"), boolean).value, None);
///
/// let number = TypeSet::single(ValueKind::Number);
/// assert_eq!(coerce(&json!(" 2.5 "), number).value, Some(json!(2.5)));
/// ```
pub fn coerce(value: &Value, accepted: TypeSet) -> Coercion {
    let mut messages = Vec::new();

    if accepted.contains(ValueKind::Boolean) {
        match to_boolean(value) {
            Some(converted) => {
                messages.push(coerced(value, ValueKind::Boolean));
                return success(converted, messages);
            }
            None => messages.push(failed(value, "a boolean")),
        }
    }

    if accepted.contains(ValueKind::Number) {
        match to_number(value) {
            Some(converted) => {
                messages.push(coerced(value, ValueKind::Number));
                return success(converted, messages);
            }
            None => messages.push(failed(value, "a finite number")),
        }
    }

    let wants_array = accepted.contains(ValueKind::Array);
    let wants_object = accepted.contains(ValueKind::Object);
    if wants_array || wants_object {
        let expected = match (wants_array, wants_object) {
            (true, true) => "an array or object",
            (true, false) => "an array",
            _ => "an object",
        };
        match value {
            Value::String(text) => match serde_json::from_str::<Value>(text) {
                Ok(parsed) => {
                    let kind = ValueKind::of(&parsed);
                    if (kind == ValueKind::Array && wants_array)
                        || (kind == ValueKind::Object && wants_object)
                    {
                        messages.push(coerced(value, kind));
                        return success(parsed, messages);
                    }
                    messages.push(Message::new(
                        MessageCode::ParseUnexpected,
                        format!("String parsed as JSON {kind}, but {expected} was expected."),
                    ));
                }
                Err(err) => messages.push(Message::new(
                    MessageCode::ParseFailed,
                    format!("Could not parse string as JSON: {err}"),
                )),
            },
            _ => messages.push(failed(value, expected)),
        }
    }

    Coercion {
        value: None,
        messages,
    }
}

fn success(value: Value, messages: Vec<Message>) -> Coercion {
    Coercion {
        value: Some(value),
        messages,
    }
}

fn to_boolean(value: &Value) -> Option<Value> {
    match value {
        Value::String(text) => {
            let token = text.to_lowercase();
            if TRUE_TOKENS.contains(&token.as_str()) {
                Some(Value::Bool(true))
            } else if FALSE_TOKENS.contains(&token.as_str()) {
                Some(Value::Bool(false))
            } else {
                None
            }
        }
        Value::Number(number) => match number.as_f64() {
            Some(n) if n == 1.0 => Some(Value::Bool(true)),
            Some(n) if n == 0.0 => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

fn to_number(value: &Value) -> Option<Value> {
    let text = value.as_str()?;
    let parsed = text.trim().parse::<f64>().ok()?;
    parsed.is_finite().then(|| number_value(parsed))
}

fn coerced(from: &Value, to: ValueKind) -> Message {
    Message::new(
        MessageCode::Coerced,
        format!(
            "Value should be a {to} but was passed a {}, which was successfully converted.",
            ValueKind::of(from)
        ),
    )
}

fn failed(from: &Value, target: &str) -> Message {
    Message::new(
        MessageCode::CoercionFailed,
        format!("Could not convert {} {from} to {target}.", ValueKind::of(from)),
    )
}
