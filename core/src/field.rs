//! Recursive validation of one field occurrence.
//!
//! A field is resolved against its spec, checked, coerced where possible,
//! recursed into, and finally either replaced by a lower scope's value or
//! compared against it. Every problem is recorded on the node; nothing here
//! fails.

use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    FieldId, FieldSpec, MessageCode, NodeKey, Schema, ScopeKind, ScopeMeta, ScopeRegistry,
    ValidationNode, ValidatorRegistry, ValueKind, coerce, is_empty_value, resolve_fallback,
    values_equal,
};

/// Position of a field occurrence.
///
/// `display` names array elements by index (`paths.0.style`); `lookup`
/// names them by their element spec (`paths.path.style`) so it can be
/// resolved against the schema and other scopes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Location {
    pub display: String,
    pub lookup: String,
}

impl Location {
    pub fn root() -> Self {
        Self::default()
    }

    fn child(&self, display: &str, lookup: &str) -> Self {
        Self {
            display: join(&self.display, display),
            lookup: join(&self.lookup, lookup),
        }
    }
}

fn join(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{parent}.{segment}")
    }
}

/// How the field spec of an occurrence is found.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Target<'t> {
    /// Match the requested key against these siblings, by name then alias.
    Among(&'t [FieldId]),
    /// Use this spec directly.
    Spec(FieldId),
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct FieldValidator<'a> {
    pub schema: &'a Schema,
    pub validators: &'a ValidatorRegistry,
    pub registry: &'a ScopeRegistry,
    pub meta: &'a ScopeMeta,
}

impl<'a> FieldValidator<'a> {
    /// Validates the declared `fields` of an object, followed by one
    /// unknown-field node per undeclared key of `value`.
    pub fn validate_object(&self, fields: &[FieldId], value: &Value, at: &Location) -> Vec<ValidationNode> {
        let mut nodes: Vec<ValidationNode> = fields
            .iter()
            .map(|id| {
                let key = NodeKey::Name(self.schema.spec(*id).name.clone());
                self.validate_field(key, Target::Spec(*id), value, at, false)
            })
            .collect();

        if let Some(object) = value.as_object() {
            for key in object.keys() {
                if self.schema.find_by_key(fields, key).is_none() {
                    nodes.push(self.validate_field(NodeKey::Name(key.clone()), Target::Among(fields), value, at, false));
                }
            }
        }
        nodes
    }

    /// Validates one occurrence of a field found under `key` in `raw_parent`.
    ///
    /// Array elements (`is_element`) never fall back or probe for overrides;
    /// only the array as a whole does.
    pub fn validate_field(
        &self,
        key: NodeKey,
        target: Target<'_>,
        raw_parent: &Value,
        at: &Location,
        is_element: bool,
    ) -> ValidationNode {
        let call_site = match (target, &key) {
            (Target::Spec(id), _) => Some(id),
            (Target::Among(ids), NodeKey::Name(name)) => self.schema.find_by_key(ids, name),
            (Target::Among(_), NodeKey::Index(_)) => None,
        };
        let Some(call_site) = call_site else {
            return self.unknown_field(key, raw_parent, at);
        };

        let site = self.schema.spec(call_site);
        let spec = self.schema.spec(self.schema.resolve(call_site));
        let here = at.child(&key.to_string(), &site.name);

        let mut node = ValidationNode::new(key, here.display.clone());
        node.canonical_key = Some(site.name.clone());
        node.spec = Some(call_site);

        match find_raw(site, &node.requested_key, raw_parent) {
            Some((found_key, value)) => {
                node.is_present = true;
                node.is_aliased = found_key != site.name && site.alias.as_deref() == Some(found_key.as_str());
                node.found_key = Some(found_key);
                node.initial_value = Some(value.clone());
                node.initial_kind = Some(ValueKind::of(value));
                node.set_value(value.clone());
                self.check_present(&mut node, site, spec, raw_parent, &here);
            }
            None => {
                node.is_valid = false;
                if site.required {
                    node.push(MessageCode::RequiredMissing, "Value is not present in the config and is required.");
                } else {
                    node.push(MessageCode::NotPresent, "Value is not present in the config, a fallback will be used.");
                }
            }
        }

        if !is_element {
            if (!node.is_valid && !node.is_resolved) || !node.is_present {
                self.apply_fallback(&mut node, spec, &here);
            } else {
                self.probe_override(&mut node, &here);
            }
        }
        node
    }

    fn unknown_field(&self, key: NodeKey, raw_parent: &Value, at: &Location) -> ValidationNode {
        let here = at.child(&key.to_string(), &key.to_string());
        let mut node = ValidationNode::new(key, here.display);
        let raw = node
            .requested_key
            .as_name()
            .and_then(|name| raw_parent.get(name))
            .cloned();
        if let Some(value) = raw {
            node.is_present = true;
            node.found_key = node.requested_key.as_name().map(str::to_string);
            node.initial_kind = Some(ValueKind::of(&value));
            node.initial_value = Some(value.clone());
            node.set_value(value);
        }
        node.is_valid = false;
        node.push(MessageCode::UnknownField, "This key is not a valid config option.");
        warn!(path = %node.path, scope = %self.meta.kind, source = %self.meta.source_id, "Unknown config key");
        node
    }

    fn check_present(
        &self,
        node: &mut ValidationNode,
        site: &FieldSpec,
        spec: &FieldSpec,
        container: &Value,
        here: &Location,
    ) {
        if node.is_aliased {
            node.push(
                MessageCode::Aliased,
                format!("This value exists under a key that has changed. Consider renaming it to '{}'.", site.name),
            );
        }

        // Empty values stay present, but the field falls back as if absent.
        if is_empty_value(&node.value) {
            node.push(MessageCode::IsEmpty, "Value is empty, a fallback will be used instead.");
            node.is_valid = false;
            return;
        }

        if !spec.accepted.accepts(node.value_kind) {
            node.is_valid = false;
            node.push(
                MessageCode::Mistyped,
                format!("Value should be of type {} but was passed a {}.", spec.accepted, node.value_kind),
            );
            let coercion = coerce(&node.value, spec.accepted);
            node.messages.extend(coercion.messages);
            match coercion.value {
                Some(value) => {
                    debug!(path = %node.path, from = %node.value_kind, to = %ValueKind::of(&value), "Coerced value");
                    node.set_value(value);
                    node.is_resolved = true;
                }
                None => return,
            }
        }

        self.check_constraints(node, site, spec, container);

        node.children = self.validate_children(spec, &node.value, here);
        self.reconcile(node);
    }

    fn check_constraints(&self, node: &mut ValidationNode, site: &FieldSpec, spec: &FieldSpec, container: &Value) {
        if let Value::Number(number) = &node.value {
            if number.as_f64().is_none_or(|n| !n.is_finite()) {
                node.push(MessageCode::InvalidNumber, "Value is not a valid number.");
                node.is_valid = false;
            }
        }

        if let Some(valid_values) = &spec.valid_values {
            if !valid_values.iter().any(|allowed| is_same_choice(&node.value, allowed)) {
                let choices: Vec<String> = valid_values.iter().map(display_choice).collect();
                node.push(MessageCode::InvalidValue, format!("Should be one of: {}", choices.join(", ")));
                node.is_valid = false;
            }
        }

        // The call site's validator takes priority over the redirect target's.
        let Some(name) = site.validator.as_ref().or(spec.validator.as_ref()) else {
            return;
        };
        let Some(validator) = self.validators.get(name) else {
            warn!(validator = %name, path = %site.path, "Unregistered validator, skipping");
            return;
        };
        let outcome = validator(&node.value, container);
        if !outcome.valid {
            node.is_valid = false;
            if outcome.messages.is_empty() {
                node.push(
                    MessageCode::Custom("custom-validation-failed".to_string()),
                    format!("Failed custom validation '{name}'."),
                );
            }
        }
        node.messages.extend(outcome.messages);
    }

    /// Validates the declared children of an object value, or every element
    /// of an array value.
    fn validate_children(&self, spec: &FieldSpec, value: &Value, here: &Location) -> Vec<ValidationNode> {
        match value {
            Value::Object(_) if !spec.children.is_empty() && spec.element.is_none() => {
                self.validate_object(&spec.children, value, here)
            }
            Value::Array(items) => match spec.element {
                Some(element) => (0..items.len())
                    .map(|index| self.validate_field(NodeKey::Index(index), Target::Spec(element), value, here, true))
                    .collect(),
                None => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    fn apply_fallback(&self, node: &mut ValidationNode, spec: &FieldSpec, here: &Location) {
        let Some(fallback) = resolve_fallback(self.schema, self.registry, &here.lookup, self.meta) else {
            return;
        };

        node.is_fallback = true;
        node.found_key = Some(fallback.matched_key);
        node.fallback_source = Some(fallback.source);
        node.set_value(fallback.value);

        node.children = match fallback.candidate {
            Some(candidate) => candidate.children.clone(),
            None if fallback.source == ScopeKind::Defaults && node.value_kind.is_container() => {
                // Rebuild the children from the defaults value, which is
                // complete for this field.
                let defaults = ScopeMeta::defaults();
                let from_defaults = FieldValidator {
                    meta: &defaults,
                    ..*self
                };
                from_defaults.validate_children(spec, &node.value, here)
            }
            None => Vec::new(),
        };
        self.reconcile(node);
    }

    fn probe_override(&self, node: &mut ValidationNode, here: &Location) {
        let Some(lower) = resolve_fallback(self.schema, self.registry, &here.lookup, self.meta) else {
            return;
        };
        node.is_override = true;
        node.override_source = Some(lower.source);
        if values_equal(&node.value, &lower.value) {
            node.push(
                MessageCode::RedundantOverride,
                format!(
                    "This option overrides {} with the same value, and may be omitted.",
                    lower.source
                ),
            );
        }
    }

    /// Writes the validated child values into the node's own value.
    ///
    /// Object keys end up under their canonical names; unknown keys and
    /// values no scope could make usable are dropped. Array elements keep
    /// their positions and only change when a usable value replaced them.
    fn reconcile(&self, node: &mut ValidationNode) {
        match &mut node.value {
            Value::Object(object) => {
                for child in &node.children {
                    let (Some(id), Some(canonical)) = (child.spec, child.canonical_key.as_deref()) else {
                        if let Some(found) = &child.found_key {
                            object.remove(found);
                        }
                        continue;
                    };
                    if let Some(alias) = &self.schema.spec(id).alias {
                        object.remove(alias);
                    }
                    if child.is_usable() {
                        object.insert(canonical.to_string(), child.value.clone());
                    } else {
                        object.remove(canonical);
                    }
                }
            }
            Value::Array(items) => {
                for child in node.children.iter().filter(|child| child.is_usable()) {
                    if let NodeKey::Index(index) = child.requested_key {
                        if let Some(slot) = items.get_mut(index) {
                            *slot = child.value.clone();
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

/// Finds the raw value of a field: canonical name, then alias, then the
/// literal requested key. Array elements are found by position.
fn find_raw<'v>(site: &FieldSpec, key: &NodeKey, raw_parent: &'v Value) -> Option<(String, &'v Value)> {
    match key {
        NodeKey::Index(index) => raw_parent
            .as_array()
            .and_then(|items| items.get(*index))
            .map(|value| (index.to_string(), value)),
        NodeKey::Name(requested) => {
            let object = raw_parent.as_object()?;
            [Some(site.name.as_str()), site.alias.as_deref(), Some(requested.as_str())]
                .into_iter()
                .flatten()
                .find_map(|candidate| object.get_key_value(candidate))
                .map(|(found, value)| (found.clone(), value))
        }
    }
}

/// Enumerated strings match case-insensitively.
fn is_same_choice(value: &Value, allowed: &Value) -> bool {
    match (value, allowed) {
        (Value::String(value), Value::String(allowed)) => value.to_lowercase() == allowed.to_lowercase(),
        _ => values_equal(value, allowed),
    }
}

fn display_choice(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{CustomOutcome, FieldDef, Message, NodeState, OneOrMany};

    struct Fixture {
        schema: Schema,
        validators: ValidatorRegistry,
        registry: ScopeRegistry,
    }

    impl Fixture {
        fn new(defs: Vec<FieldDef>) -> Self {
            Self {
                schema: Schema::from_defs(defs).unwrap(),
                validators: ValidatorRegistry::default(),
                registry: ScopeRegistry::new(),
            }
        }

        fn root(&self, meta: &ScopeMeta, raw: Value) -> Vec<ValidationNode> {
            let validator = FieldValidator {
                schema: &self.schema,
                validators: &self.validators,
                registry: &self.registry,
                meta,
            };
            validator.validate_object(self.schema.roots(), &raw, &Location::root())
        }
    }

    fn codes(node: &ValidationNode) -> Vec<String> {
        node.messages.iter().map(|m| m.code.to_string()).collect()
    }

    #[test]
    fn test_present_valid_with_override_of_defaults() {
        let fixture = Fixture::new(vec![FieldDef::string("sortMarkers", "latitude")]);
        let nodes = fixture.root(&ScopeMeta::global(), json!({ "sortMarkers": "category" }));
        let node = &nodes[0];
        assert_eq!(node.state(), NodeState::PresentValid);
        assert!(node.is_override);
        assert_eq!(node.override_source, Some(ScopeKind::Defaults));
        assert!(codes(node).is_empty());
    }

    #[test]
    fn test_absent_required_without_default() {
        let fixture = Fixture::new(vec![FieldDef::new("title", ValueKind::String).required()]);
        let nodes = fixture.root(&ScopeMeta::global(), json!({}));
        assert_eq!(nodes[0].state(), NodeState::AbsentRequiredError);
        assert_eq!(codes(&nodes[0]), vec!["required-missing"]);
        assert_eq!(nodes[0].value, Value::Null);
    }

    #[test]
    fn test_empty_value_stays_present_and_falls_back() {
        let fixture = Fixture::new(vec![FieldDef::string("fullscreenMode", "window")]);
        let nodes = fixture.root(&ScopeMeta::global(), json!({ "fullscreenMode": "" }));
        let node = &nodes[0];
        assert!(node.is_present);
        assert!(node.is_fallback);
        assert_eq!(node.state(), NodeState::PresentInvalidWithFallback);
        assert_eq!(node.value, json!("window"));
        assert_eq!(node.initial_value, Some(json!("")));
        assert_eq!(codes(node), vec!["is-empty"]);
    }

    #[test]
    fn test_valid_values_are_case_insensitive() {
        let fixture = Fixture::new(vec![
            FieldDef::string("sidebarBehaviour", "autoInitial").with_valid_values(["autoAlways", "autoInitial"]),
        ]);
        let nodes = fixture.root(&ScopeMeta::global(), json!({ "sidebarBehaviour": "AUTOALWAYS" }));
        assert!(nodes[0].is_valid);

        let nodes = fixture.root(&ScopeMeta::global(), json!({ "sidebarBehaviour": "sometimes" }));
        assert_eq!(codes(&nodes[0]), vec!["invalid-value"]);
        assert!(nodes[0].messages[0].text.contains("autoAlways, autoInitial"));
        assert_eq!(nodes[0].value, json!("autoInitial"));
    }

    #[test]
    fn test_nested_objects_reconcile_aliases() {
        let fixture = Fixture::new(vec![FieldDef::object(
            "ruler",
            vec![
                FieldDef::number("pixelsToMeters", 100.0).with_alias("scale"),
                FieldDef::boolean("enabled", true),
            ],
        )]);
        let nodes = fixture.root(&ScopeMeta::global(), json!({ "ruler": { "scale": "25", "junk": 1 } }));
        let ruler = &nodes[0];
        assert!(ruler.is_valid);
        assert_eq!(ruler.value, json!({ "pixelsToMeters": 25, "enabled": true }));

        let scale = ruler.child("pixelsToMeters").unwrap();
        assert!(scale.is_aliased && scale.is_resolved);
        assert_eq!(codes(scale), vec!["aliased", "mistyped", "coerced"]);

        let junk = ruler.child("junk").unwrap();
        assert_eq!(junk.state(), NodeState::UnknownField);
        assert_eq!(junk.path, "ruler.junk");
    }

    #[test]
    fn test_redirect_uses_target_children() {
        let fixture = Fixture::new(vec![FieldDef::array_of("categoryGroups", OneOrMany::Many(vec![ValueKind::String, ValueKind::Object]))
            .with_children(vec![FieldDef::any_of("categoryGroup", &[ValueKind::String, ValueKind::Object])
                .with_children(vec![
                    FieldDef::string("label", "Group").required(),
                    FieldDef::redirect("children", "categoryGroups"),
                ])])]);
        let raw = json!({
            "categoryGroups": [
                "loose",
                { "label": "Outer", "children": ["a", { "children": [] }] }
            ]
        });
        let nodes = fixture.root(&ScopeMeta::global(), raw);
        let groups = &nodes[0];
        assert_eq!(groups.children.len(), 2);

        let inner = groups.descendant("1.children.1").unwrap();
        assert_eq!(inner.path, "categoryGroups.1.children.1");
        // Inside the inner group the required label falls back to its default.
        let label = inner.child("label").unwrap();
        assert!(label.is_fallback);
        assert_eq!(label.fallback_source, Some(ScopeKind::Defaults));
        assert_eq!(inner.value, json!({ "label": "Group", "children": [] }));
    }

    #[test]
    fn test_custom_validator_receives_container() {
        let mut fixture = Fixture::new(vec![
            FieldDef::number("min", 0.0),
            FieldDef::number("max", 10.0).with_validator("above-min"),
        ]);
        fixture.validators.register("above-min", |value, container| {
            let min = container.get("min").and_then(Value::as_f64).unwrap_or(0.0);
            if value.as_f64().is_some_and(|max| max > min) {
                CustomOutcome::ok()
            } else {
                CustomOutcome::fail(vec![Message::custom("max-below-min", "max must exceed min")])
            }
        });

        let nodes = fixture.root(&ScopeMeta::global(), json!({ "min": 5, "max": 3 }));
        assert_eq!(codes(&nodes[1]), vec!["max-below-min"]);
        assert!(nodes[1].is_fallback);
        assert_eq!(nodes[1].value, json!(10));
    }

    #[test]
    fn test_unregistered_validator_is_ignored() {
        let fixture = Fixture::new(vec![FieldDef::number("max", 10.0).with_validator("missing")]);
        let nodes = fixture.root(&ScopeMeta::global(), json!({ "max": 3 }));
        assert!(nodes[0].is_valid);
    }

    #[test]
    fn test_defaults_fallback_rebuilds_children() {
        let fixture = Fixture::new(vec![FieldDef::object(
            "ruler",
            vec![FieldDef::number("pixelsToMeters", 100.0), FieldDef::boolean("enabled", true)],
        )]);
        let nodes = fixture.root(&ScopeMeta::local("Atlas"), json!({ "ruler": "metric" }));
        let ruler = &nodes[0];
        assert_eq!(ruler.fallback_source, Some(ScopeKind::Defaults));
        assert_eq!(ruler.value, json!({ "pixelsToMeters": 100, "enabled": true }));
        assert_eq!(ruler.children.len(), 2);
        assert!(ruler.children.iter().all(|child| child.is_valid));
        assert_eq!(codes(ruler), vec!["mistyped", "parse-failed"]);
    }

    #[test]
    fn test_array_elements_never_fall_back() {
        let fixture = Fixture::new(vec![FieldDef::array_of("visibleCategories", ValueKind::String)]);
        let nodes = fixture.root(&ScopeMeta::global(), json!({ "visibleCategories": ["a", null] }));
        let array = &nodes[0];
        assert!(array.is_valid);
        let null_element = array.child("1").unwrap();
        assert!(!null_element.is_valid && !null_element.is_fallback);
        assert!(!null_element.is_override);
        assert_eq!(array.value, json!(["a", null]));
    }

    #[test]
    fn test_call_site_validator_overrides_redirect_target() {
        let mut fixture = Fixture::new(vec![
            FieldDef::string("look", "plain").with_validator("look-check"),
            FieldDef::redirect("theme", "look").with_validator("theme-check"),
            FieldDef::redirect("shade", "look"),
        ]);
        fixture.validators.register("look-check", |_, _| {
            CustomOutcome::fail(vec![Message::custom("look-rejected", "Rejected by look-check.")])
        });
        fixture.validators.register("theme-check", |_, _| {
            CustomOutcome::fail(vec![Message::custom("theme-rejected", "Rejected by theme-check.")])
        });

        let nodes = fixture.root(&ScopeMeta::global(), json!({ "theme": "dark", "shade": "dim" }));
        let theme = &nodes[1];
        assert_eq!(codes(theme), vec!["theme-rejected"]);
        assert_eq!(theme.value, json!("plain"));

        // Without a call-site validator the target's one runs.
        let shade = &nodes[2];
        assert_eq!(codes(shade), vec!["look-rejected"]);
        assert!(shade.is_fallback);
    }
}
