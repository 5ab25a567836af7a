//! Error types for schema construction and scope bookkeeping.
//!
//! Validation problems inside configuration data are never errors: they are
//! reported as [`Message`](crate::Message)s on the affected
//! [`ValidationNode`](crate::ValidationNode). The types here cover mistakes
//! in the schema itself and misuse of the [`Cascade`](crate::Cascade).

use thiserror::Error;

use crate::{ScopeKind, ValueKind};

/// Structural problems in a schema definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaDefinitionError {
    /// A field has an empty name.
    #[error("field name cannot be empty (under '{0}')")]
    EmptyFieldName(String),
    /// A field name is not a plain identifier.
    #[error("invalid field name: {0}")]
    InvalidFieldName(String),
    /// Two siblings resolve to the same path.
    #[error("duplicate field path: {0}")]
    DuplicateField(String),
    /// An alias shadows the canonical name of a sibling.
    #[error("alias '{alias}' of '{path}' collides with a sibling field")]
    AliasCollision { path: String, alias: String },
    /// A `use` path does not name any field.
    #[error("field '{path}' redirects to unknown path '{target}'")]
    UnresolvedRedirect { path: String, target: String },
    /// Following `use` paths loops back on itself.
    #[error("redirect cycle detected at path: {0}")]
    RedirectCycle(String),
    /// A default value is outside the declared types.
    #[error("default of '{path}' is a {found}, expected {expected}")]
    DefaultTypeMismatch {
        path: String,
        expected: String,
        found: ValueKind,
    },
    /// A required field reachable from the root has no default, so the
    /// defaults scope could not supply it.
    #[error("required field '{0}' has no default")]
    RequiredWithoutDefault(String),
}

/// Errors raised while registering scopes with a
/// [`Cascade`](crate::Cascade).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CascadeError {
    /// The defaults scope is derived from the schema and cannot be replaced.
    #[error("the defaults scope is owned by the schema")]
    DefaultsAreSchemaOwned,
    /// An embed scope does not name the local scope it inherits from.
    #[error("{0} scope '{1}' does not name its map")]
    MissingMapName(ScopeKind, String),
}
