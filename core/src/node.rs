//! Validation results for single field occurrences.
//!
//! Nodes own their children and keep no parent links. Upward context is
//! recovered by walking from the root: [`ValidationNode::walk`] hands the
//! visitor the ancestor stack of every node.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::{FieldId, Message, MessageCode, ScopeKind, ValueKind};

/// Key a node was requested under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum NodeKey {
    /// Object key.
    Name(String),
    /// Array element position.
    Index(usize),
}

impl NodeKey {
    /// Returns the key when this is an object key.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Index(_) => None,
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

/// End state of a validated node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeState {
    /// The key is not declared by the schema.
    UnknownField,
    /// Absent here, supplied by a lower scope.
    AbsentWithFallback,
    /// Required, absent here and in every lower scope.
    AbsentRequiredError,
    /// Present with an acceptable value.
    PresentValid,
    /// Present and converted to an accepted type.
    PresentCoerced,
    /// Present but unusable, replaced by a lower scope's value.
    PresentInvalidWithFallback,
    /// No scope supplied a usable value.
    Unresolved,
}

/// Result of validating one occurrence of a field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationNode {
    pub requested_key: NodeKey,
    /// Key the value was read from: canonical name, alias, the literal key
    /// for unknown fields, or the key matched in the fallback scope.
    pub found_key: Option<String>,
    /// Declared name, `None` for unknown fields.
    pub canonical_key: Option<String>,
    /// Location of this occurrence, with array positions as indices.
    pub path: String,
    pub value: Value,
    pub value_kind: ValueKind,
    /// Raw value as read, before coercion or fallback.
    pub initial_value: Option<Value>,
    pub initial_kind: Option<ValueKind>,
    #[serde(skip)]
    pub spec: Option<FieldId>,
    pub is_valid: bool,
    pub is_resolved: bool,
    pub is_present: bool,
    pub is_aliased: bool,
    pub is_fallback: bool,
    pub is_override: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_source: Option<ScopeKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_source: Option<ScopeKind>,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ValidationNode>,
}

impl ValidationNode {
    pub(crate) fn new(requested_key: NodeKey, path: String) -> Self {
        Self {
            requested_key,
            found_key: None,
            canonical_key: None,
            path,
            value: Value::Null,
            value_kind: ValueKind::Null,
            initial_value: None,
            initial_kind: None,
            spec: None,
            is_valid: true,
            is_resolved: false,
            is_present: false,
            is_aliased: false,
            is_fallback: false,
            is_override: false,
            fallback_source: None,
            override_source: None,
            messages: Vec::new(),
            children: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, code: MessageCode, text: impl Into<String>) {
        self.messages.push(Message::new(code, text));
    }

    pub(crate) fn set_value(&mut self, value: Value) {
        self.value_kind = ValueKind::of(&value);
        self.value = value;
    }

    /// Returns `true` when the node carries a message with `code`.
    pub fn has_message(&self, code: &MessageCode) -> bool {
        self.messages.iter().any(|message| &message.code == code)
    }

    /// Returns `true` for nodes whose key the schema does not declare.
    pub fn is_unknown(&self) -> bool {
        self.spec.is_none()
    }

    /// Returns `true` when the node ended with a value fit for the merged
    /// config, whether own, coerced, or inherited.
    pub fn is_usable(&self) -> bool {
        !self.is_unknown() && (self.is_valid || self.is_resolved || self.is_fallback)
    }

    /// Returns `true` when this scope itself supplied the node's value.
    pub fn is_own(&self) -> bool {
        !self.is_unknown() && !self.is_fallback && (self.is_valid || self.is_resolved)
    }

    /// Classifies the node into its end state.
    pub fn state(&self) -> NodeState {
        if self.is_unknown() {
            NodeState::UnknownField
        } else if !self.is_present {
            if self.is_fallback {
                NodeState::AbsentWithFallback
            } else if self.has_message(&MessageCode::RequiredMissing) {
                NodeState::AbsentRequiredError
            } else {
                NodeState::Unresolved
            }
        } else if self.is_fallback {
            NodeState::PresentInvalidWithFallback
        } else if self.is_resolved {
            NodeState::PresentCoerced
        } else if self.is_valid {
            NodeState::PresentValid
        } else {
            NodeState::Unresolved
        }
    }

    /// Returns the direct child with the given canonical key or index.
    pub fn child(&self, key: &str) -> Option<&ValidationNode> {
        self.children.iter().find(|child| child.matches_segment(key))
    }

    pub(crate) fn matches_segment(&self, segment: &str) -> bool {
        match &self.requested_key {
            NodeKey::Index(index) => segment.parse::<usize>().is_ok_and(|n| n == *index),
            NodeKey::Name(name) => {
                self.canonical_key.as_deref().unwrap_or(name.as_str()) == segment
            }
        }
    }

    /// Descends along dotted `path` below this node.
    pub fn descendant(&self, path: &str) -> Option<&ValidationNode> {
        path.split('.')
            .try_fold(self, |node, segment| node.child(segment))
    }

    /// Depth-first search over this node and its descendants.
    pub fn find_matching<F>(&self, predicate: F) -> Option<&ValidationNode>
    where
        F: Fn(&ValidationNode) -> bool,
    {
        self.iter().find(|node| predicate(node))
    }

    /// Iterates this node and its descendants depth-first, parents first.
    pub fn iter(&self) -> impl Iterator<Item = &ValidationNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }

    /// Visits every node with the stack of its ancestors, outermost first.
    ///
    /// ```
    /// use config_cascade_core::*;
    /// use serde_json::json;
    ///
    /// let schema = Schema::from_defs(vec![FieldDef::object(
    ///     "ruler",
    ///     vec![FieldDef::number("pixelsToMeters", 100.0)],
    /// )])
    /// .unwrap();
    /// let tree = ConfigValidator::new(&schema, &ValidatorRegistry::default(), &ScopeRegistry::new())
    ///     .validate_config(&ScopeConfig::global(json!({ "ruler": { "pixelsToMeters": 5 } })));
    ///
    /// let mut paths = Vec::new();
    /// tree.node("ruler").unwrap().walk(&mut |node, ancestors| {
    ///     paths.push((node.path.clone(), ancestors.len()));
    /// });
    /// assert_eq!(paths, vec![("ruler".to_string(), 0), ("ruler.pixelsToMeters".to_string(), 1)]);
    /// ```
    pub fn walk<F>(&self, visitor: &mut F)
    where
        F: FnMut(&ValidationNode, &[&ValidationNode]),
    {
        let mut ancestors = Vec::new();
        self.walk_inner(visitor, &mut ancestors);
    }

    fn walk_inner<'a, F>(&'a self, visitor: &mut F, ancestors: &mut Vec<&'a ValidationNode>)
    where
        F: FnMut(&ValidationNode, &[&ValidationNode]),
    {
        visitor(self, ancestors);
        ancestors.push(self);
        for child in &self.children {
            child.walk_inner(visitor, ancestors);
        }
        ancestors.pop();
    }
}
