//! Schema model and preprocessing.
//!
//! [`Schema::from_defs`] normalizes a [`FieldDef`] tree once into a flat
//! arena of [`FieldSpec`]s. Parents are stored as indices, so walking towards
//! the root never needs a reference cycle. Redirects (`use`) are resolved at
//! this point; a schema that builds successfully has no dangling redirects.

mod check;
mod def;
mod kind;

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::SchemaDefinitionError;

pub use check::check_schema;
pub use def::FieldDef;
pub(crate) use def::number_value;
pub use kind::{OneOrMany, TypeSet, ValueKind, is_empty_value, values_equal};

/// Path segment naming the element spec synthesized for arrays that only
/// declare an `arrayType`.
pub const ELEMENT_SEGMENT: &str = "*";

/// Index of a [`FieldSpec`] inside its [`Schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FieldId(pub(crate) usize);

impl FieldId {
    /// Position in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// One normalized schema node.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub id: FieldId,
    pub name: String,
    pub alias: Option<String>,
    /// Redirect path as written in the definition.
    pub redirect: Option<String>,
    /// Final non-redirecting spec the redirect points at.
    pub redirect_target: Option<FieldId>,
    pub required: bool,
    pub default_value: Option<Value>,
    pub accepted: TypeSet,
    /// Element kinds declared through `arrayType`.
    pub array_type: Option<TypeSet>,
    /// Spec every array element is validated against.
    pub element: Option<FieldId>,
    pub valid_values: Option<Vec<Value>>,
    pub children: Vec<FieldId>,
    pub validator: Option<String>,
    /// Dot-joined path from the root.
    pub path: String,
    pub parent: Option<FieldId>,
    /// `true` for element specs generated from `arrayType`.
    pub synthetic: bool,
}

/// Normalized, immutable schema.
///
/// # Examples
///
/// ```
/// use config_cascade_core::{FieldDef, Schema, ValueKind};
///
/// let schema = Schema::from_defs(vec![
///     FieldDef::boolean("enablePopups", true).with_alias("allowPopups"),
///     FieldDef::object("popup", vec![FieldDef::string("title", "Untitled")]),
///     FieldDef::array_of("hiddenCategories", ValueKind::String),
/// ])
/// .unwrap();
///
/// let title = schema.spec_at_path("popup.title").unwrap();
/// assert_eq!(schema.spec(title).path, "popup.title");
/// assert_eq!(schema.spec(schema.parent(title).unwrap()).name, "popup");
///
/// let element = schema.spec_at_path("hiddenCategories.*").unwrap();
/// assert!(schema.spec(element).synthetic);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    nodes: Vec<FieldSpec>,
    roots: Vec<FieldId>,
}

impl Schema {
    /// Normalizes a definition tree.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaDefinitionError::DuplicateField`] when two siblings
    /// share a name, [`SchemaDefinitionError::UnresolvedRedirect`] when a
    /// `use` path names nothing, and [`SchemaDefinitionError::RedirectCycle`]
    /// when redirects loop.
    pub fn from_defs(defs: Vec<FieldDef>) -> Result<Self, SchemaDefinitionError> {
        let mut schema = Self {
            nodes: Vec::new(),
            roots: Vec::new(),
        };
        let roots = schema.push_level(defs, None)?;
        schema.roots = roots;
        schema.resolve_redirects()?;
        Ok(schema)
    }

    fn push_level(
        &mut self,
        defs: Vec<FieldDef>,
        parent: Option<FieldId>,
    ) -> Result<Vec<FieldId>, SchemaDefinitionError> {
        let mut seen = HashSet::new();
        let mut ids = Vec::with_capacity(defs.len());
        for def in defs {
            if !seen.insert(def.name.clone()) {
                let path = self.child_path(parent, &def.name);
                return Err(SchemaDefinitionError::DuplicateField(path));
            }
            ids.push(self.push_node(def, parent)?);
        }
        Ok(ids)
    }

    fn push_node(
        &mut self,
        def: FieldDef,
        parent: Option<FieldId>,
    ) -> Result<FieldId, SchemaDefinitionError> {
        let id = FieldId(self.nodes.len());
        let path = self.child_path(parent, &def.name);
        let accepted = def
            .kind
            .as_ref()
            .map(OneOrMany::to_type_set)
            .unwrap_or_default();
        let array_type = def.array_type.as_ref().map(OneOrMany::to_type_set);

        self.nodes.push(FieldSpec {
            id,
            name: def.name,
            alias: def.alias,
            redirect: def.redirect,
            redirect_target: None,
            required: def.presence,
            default_value: def.default,
            accepted,
            array_type,
            element: None,
            valid_values: def.valid_values,
            children: Vec::new(),
            validator: def.validator,
            path,
            parent,
            synthetic: false,
        });

        let children = self.push_level(def.children, Some(id))?;
        let is_array = accepted.contains(ValueKind::Array);
        let element = match (is_array, children.first(), array_type) {
            (true, Some(first), _) => Some(*first),
            (true, None, Some(element_kinds)) => Some(self.push_synthetic_element(id, element_kinds)),
            _ => None,
        };

        let node = &mut self.nodes[id.0];
        node.children = children;
        node.element = element;
        Ok(id)
    }

    fn push_synthetic_element(&mut self, array: FieldId, kinds: TypeSet) -> FieldId {
        let id = FieldId(self.nodes.len());
        // Enumerations on a typed array constrain its elements.
        let valid_values = self.nodes[array.0].valid_values.take();
        let path = format!("{}.{}", self.nodes[array.0].path, ELEMENT_SEGMENT);
        self.nodes.push(FieldSpec {
            id,
            name: ELEMENT_SEGMENT.to_string(),
            alias: None,
            redirect: None,
            redirect_target: None,
            required: false,
            default_value: None,
            accepted: kinds,
            array_type: None,
            element: None,
            valid_values,
            children: Vec::new(),
            validator: None,
            path,
            parent: Some(array),
            synthetic: true,
        });
        id
    }

    fn child_path(&self, parent: Option<FieldId>, name: &str) -> String {
        match parent {
            Some(parent) => format!("{}.{}", self.nodes[parent.0].path, name),
            None => name.to_string(),
        }
    }

    fn resolve_redirects(&mut self) -> Result<(), SchemaDefinitionError> {
        for index in 0..self.nodes.len() {
            if self.nodes[index].redirect.is_none() {
                continue;
            }
            let mut visited = vec![FieldId(index)];
            let mut current = FieldId(index);
            while let Some(target_path) = self.nodes[current.0].redirect.clone() {
                let target = self.lookup_literal(&target_path).ok_or_else(|| {
                    SchemaDefinitionError::UnresolvedRedirect {
                        path: self.nodes[current.0].path.clone(),
                        target: target_path.clone(),
                    }
                })?;
                if visited.contains(&target) {
                    return Err(SchemaDefinitionError::RedirectCycle(
                        self.nodes[index].path.clone(),
                    ));
                }
                visited.push(target);
                current = target;
            }
            self.nodes[index].redirect_target = Some(current);
        }
        Ok(())
    }

    /// Looks a path up without following redirects.
    fn lookup_literal(&self, path: &str) -> Option<FieldId> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.find_in(&self.roots, first)?;
        for segment in segments {
            current = self.child_named(current, segment)?;
        }
        Some(current)
    }

    fn find_in(&self, ids: &[FieldId], name: &str) -> Option<FieldId> {
        ids.iter().copied().find(|id| self.nodes[id.0].name == name)
    }

    fn child_named(&self, id: FieldId, name: &str) -> Option<FieldId> {
        let spec = &self.nodes[id.0];
        self.find_in(&spec.children, name).or_else(|| {
            spec.element
                .filter(|element| self.nodes[element.0].name == name)
        })
    }

    /// Returns the field spec for an id.
    ///
    /// Ids are only handed out by this schema, so lookups cannot miss.
    pub fn spec(&self, id: FieldId) -> &FieldSpec {
        &self.nodes[id.0]
    }

    /// Root-level field ids in declaration order.
    pub fn roots(&self) -> &[FieldId] {
        &self.roots
    }

    /// Number of specs in the arena, synthesized element specs included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` when the schema declares no fields.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates every spec in the arena.
    pub fn iter(&self) -> impl Iterator<Item = &FieldSpec> {
        self.nodes.iter()
    }

    /// Parent of a spec, `None` for roots.
    pub fn parent(&self, id: FieldId) -> Option<FieldId> {
        self.nodes[id.0].parent
    }

    /// Walks from a spec's parent up to its root.
    pub fn ancestors(&self, id: FieldId) -> impl Iterator<Item = FieldId> + '_ {
        std::iter::successors(self.parent(id), move |current| self.parent(*current))
    }

    /// Returns `true` when the field sits below an array element.
    pub fn is_inside_array(&self, id: FieldId) -> bool {
        self.ancestors(id)
            .any(|ancestor| self.nodes[ancestor.0].element.is_some())
    }

    /// Follows a redirect to the field spec that supplies type and children.
    pub fn resolve(&self, id: FieldId) -> FieldId {
        self.nodes[id.0].redirect_target.unwrap_or(id)
    }

    /// Finds a spec by dotted path.
    ///
    /// Segments are matched against canonical names; redirects are followed
    /// before descending, so paths may continue below a `use` field.
    pub fn spec_at_path(&self, path: &str) -> Option<FieldId> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.find_in(&self.roots, first)?;
        for segment in segments {
            current = self.child_named(self.resolve(current), segment)?;
        }
        Some(current)
    }

    /// Finds the field among `ids` whose name, then alias, equals `key`.
    pub fn find_by_key(&self, ids: &[FieldId], key: &str) -> Option<FieldId> {
        self.find_in(ids, key).or_else(|| {
            ids.iter()
                .copied()
                .find(|id| self.nodes[id.0].alias.as_deref() == Some(key))
        })
    }

    /// Default the defaults scope supplies for a field.
    ///
    /// The call-site default wins, then the redirect target's default. An
    /// object field outside any array with no explicit default inherits the
    /// defaults of its children. A redirect back into an object already being
    /// derived contributes nothing, so self-referential groupings terminate.
    /// `None` means the defaults scope has no value for the field.
    pub fn effective_default(&self, id: FieldId) -> Option<Value> {
        self.default_within(id, &mut Vec::new())
    }

    fn default_within(&self, id: FieldId, deriving: &mut Vec<FieldId>) -> Option<Value> {
        let spec = &self.nodes[id.0];
        if let Some(default) = &spec.default_value {
            return Some(default.clone());
        }
        let resolved = self.resolve(id);
        if resolved != id {
            if let Some(default) = &self.nodes[resolved.0].default_value {
                return Some(default.clone());
            }
        }

        let target = &self.nodes[resolved.0];
        let is_plain_object = target.accepted == TypeSet::single(ValueKind::Object);
        if !is_plain_object
            || target.children.is_empty()
            || self.is_inside_array(id)
            || deriving.contains(&resolved)
        {
            return None;
        }
        deriving.push(resolved);
        let object = self.defaults_for(&target.children, deriving);
        deriving.pop();
        (!object.is_empty()).then_some(Value::Object(object))
    }

    fn defaults_for(&self, ids: &[FieldId], deriving: &mut Vec<FieldId>) -> Map<String, Value> {
        ids.iter()
            .filter_map(|id| {
                self.default_within(*id, deriving)
                    .map(|value| (self.nodes[id.0].name.clone(), value))
            })
            .collect()
    }

    /// Flattens the declared defaults into the defaults scope document.
    ///
    /// ```
    /// use config_cascade_core::{FieldDef, Schema};
    /// use serde_json::{Value, json};
    ///
    /// let schema = Schema::from_defs(vec![
    ///     FieldDef::boolean("disabled", false),
    ///     FieldDef::object("ruler", vec![FieldDef::number("pixelsToMeters", 100.0)]),
    ///     FieldDef::string("iconPosition", "center").without_default(),
    /// ])
    /// .unwrap();
    ///
    /// assert_eq!(
    ///     Value::Object(schema.defaults_document()),
    ///     json!({ "disabled": false, "ruler": { "pixelsToMeters": 100 } })
    /// );
    /// ```
    pub fn defaults_document(&self) -> Map<String, Value> {
        self.defaults_for(&self.roots, &mut Vec::new())
    }

    /// Rebuilds the definition tree this schema was normalized from.
    ///
    /// `Schema::from_defs(schema.to_defs())` yields an identical schema.
    pub fn to_defs(&self) -> Vec<FieldDef> {
        self.roots.iter().map(|id| self.to_def(*id)).collect()
    }

    fn to_def(&self, id: FieldId) -> FieldDef {
        let spec = &self.nodes[id.0];
        let synthetic_element = spec
            .element
            .map(|element| &self.nodes[element.0])
            .filter(|element| element.synthetic);
        let valid_values = match synthetic_element {
            Some(element) => element.valid_values.clone(),
            None => spec.valid_values.clone(),
        };
        FieldDef {
            name: spec.name.clone(),
            alias: spec.alias.clone(),
            redirect: spec.redirect.clone(),
            presence: spec.required,
            default: spec.default_value.clone(),
            kind: (!spec.accepted.is_unconstrained()).then(|| spec.accepted.into()),
            array_type: spec.array_type.map(Into::into),
            valid_values,
            children: spec.children.iter().map(|child| self.to_def(*child)).collect(),
            validator: spec.validator.clone(),
        }
    }
}
