//! Diagnostic messages attached to validation nodes.

use std::fmt;

use serde::{Serialize, Serializer};

/// Machine-readable message code.
///
/// Built-in codes serialize in kebab-case (`"redundant-override"`); codes
/// reported by custom validators are carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageCode {
    UnknownField,
    RequiredMissing,
    NotPresent,
    Aliased,
    IsEmpty,
    Mistyped,
    CoercionFailed,
    Coerced,
    ParseUnexpected,
    ParseFailed,
    InvalidNumber,
    InvalidValue,
    RedundantOverride,
    /// Reported by a custom validator.
    Custom(String),
}

impl MessageCode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::UnknownField => "unknown-field",
            Self::RequiredMissing => "required-missing",
            Self::NotPresent => "not-present",
            Self::Aliased => "aliased",
            Self::IsEmpty => "is-empty",
            Self::Mistyped => "mistyped",
            Self::CoercionFailed => "coercion-failed",
            Self::Coerced => "coerced",
            Self::ParseUnexpected => "parse-unexpected",
            Self::ParseFailed => "parse-failed",
            Self::InvalidNumber => "invalid-number",
            Self::InvalidValue => "invalid-value",
            Self::RedundantOverride => "redundant-override",
            Self::Custom(code) => code,
        }
    }

    /// Category of the problem this code reports.
    pub fn issue_kind(&self) -> IssueKind {
        match self {
            Self::UnknownField => IssueKind::SchemaError,
            Self::Mistyped
            | Self::CoercionFailed
            | Self::ParseUnexpected
            | Self::ParseFailed
            | Self::InvalidNumber => IssueKind::TypeMismatch,
            Self::InvalidValue => IssueKind::EnumViolation,
            Self::Custom(_) => IssueKind::CustomValidationFailure,
            Self::RequiredMissing => IssueKind::RequiredMissing,
            Self::NotPresent
            | Self::Aliased
            | Self::IsEmpty
            | Self::Coerced
            | Self::RedundantOverride => IssueKind::Notice,
        }
    }
}

impl fmt::Display for MessageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MessageCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Diagnostic taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    SchemaError,
    TypeMismatch,
    EnumViolation,
    CustomValidationFailure,
    RequiredMissing,
    Notice,
}

impl IssueKind {
    /// Every kind, in report order.
    pub const ALL: [IssueKind; 6] = [
        IssueKind::SchemaError,
        IssueKind::TypeMismatch,
        IssueKind::EnumViolation,
        IssueKind::CustomValidationFailure,
        IssueKind::RequiredMissing,
        IssueKind::Notice,
    ];

    /// Returns `false` for informational notices.
    pub fn is_problem(self) -> bool {
        self != Self::Notice
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchemaError => write!(f, "schema error"),
            Self::TypeMismatch => write!(f, "type mismatch"),
            Self::EnumViolation => write!(f, "enum violation"),
            Self::CustomValidationFailure => write!(f, "custom validation failure"),
            Self::RequiredMissing => write!(f, "required missing"),
            Self::Notice => write!(f, "notice"),
        }
    }
}

/// A message attached to a validation node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub code: MessageCode,
    pub text: String,
}

impl Message {
    pub fn new(code: MessageCode, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    /// Creates a message with a validator-defined code.
    pub fn custom(code: &str, text: impl Into<String>) -> Self {
        Self::new(MessageCode::Custom(code.to_string()), text)
    }

    pub fn issue_kind(&self) -> IssueKind {
        self.code.issue_kind()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) {}", self.code, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_serialization() {
        let message = Message::new(MessageCode::RedundantOverride, "same as global");
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            serde_json::json!({ "code": "redundant-override", "text": "same as global" })
        );
        let custom = Message::custom("points-empty", "no points");
        assert_eq!(serde_json::to_value(&custom.code).unwrap(), "points-empty");
    }

    #[test]
    fn test_issue_kinds() {
        assert_eq!(MessageCode::ParseFailed.issue_kind(), IssueKind::TypeMismatch);
        assert_eq!(MessageCode::UnknownField.issue_kind(), IssueKind::SchemaError);
        assert_eq!(
            Message::custom("x", "y").issue_kind(),
            IssueKind::CustomValidationFailure
        );
        assert!(!MessageCode::Coerced.issue_kind().is_problem());
    }

    #[test]
    fn test_display() {
        let message = Message::new(MessageCode::Aliased, "key renamed");
        assert_eq!(message.to_string(), "(aliased) key renamed");
    }
}
