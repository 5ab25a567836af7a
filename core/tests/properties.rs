use config_cascade_core::*;
use serde_json::{Value, json};

fn maps_schema() -> Schema {
    Schema::from_defs(builtin::maps_extended()).expect("built-in schema should compile")
}

fn validate_global(schema: &Schema, raw: Value) -> ValidationTree {
    let validators = ValidatorRegistry::default();
    let registry = ScopeRegistry::new();
    ConfigValidator::new(schema, &validators, &registry).validate_config(&ScopeConfig::global(raw))
}

fn cascade(scopes: Vec<ScopeConfig>) -> Cascade {
    let mut cascade = Cascade::new(maps_schema(), ValidatorRegistry::default());
    for scope in scopes {
        cascade.insert(scope).expect("scope should be accepted");
    }
    cascade
}

#[test]
fn test_config_is_complete_for_any_input() {
    let schema = maps_schema();
    let inputs = [
        json!(null),
        json!([1, 2, 3]),
        json!("not a config"),
        json!({}),
        json!({ "enablePopups": {}, "paths": "nope", "styles": 4, "collectibleCategories": "" }),
        json!({ "sortMarkers": "sideways", "popupHideDelay": "soon", "mapControls": [["zoom"], "edit"] }),
    ];

    for raw in inputs {
        let tree = validate_global(&schema, raw.clone());
        let config = tree.config.as_object().expect("config is an object");
        assert_eq!(config.len(), schema.roots().len(), "input {raw}");
        for id in schema.roots() {
            let spec = schema.spec(*id);
            let value = config.get(&spec.name).unwrap_or_else(|| panic!("missing {} for {raw}", spec.name));
            if schema.effective_default(*id).is_some() {
                assert!(!value.is_null(), "{} resolved to null for {raw}", spec.name);
            }
        }
    }
}

#[test]
fn test_revalidating_config_needs_no_coercion() {
    let schema = maps_schema();
    let first = validate_global(
        &schema,
        json!({
            "allowPopups": "no",
            "popupHideDelay": "1.5",
            "sortMarkers": "CATEGORY",
            "hiddenCategories": ["a", 2],
            "categoryGroups": ["x", { "label": "G", "children": ["y"] }],
            "foo": 1
        }),
    );
    assert!(first.iter().any(|node| node.has_message(&MessageCode::Coerced)));

    let second = validate_global(&schema, first.config.clone());
    assert!(
        second.iter().all(|node| !node.has_message(&MessageCode::Coerced)),
        "second pass coerced again"
    );
    assert_eq!(second.config, first.config);
}

#[test]
fn test_valid_values_pass_through_untouched() {
    let schema = maps_schema();
    let tree = validate_global(&schema, json!({ "sortMarkers": "category", "popupShowDelay": 0.25 }));

    for (key, expected) in [("sortMarkers", json!("category")), ("popupShowDelay", json!(0.25))] {
        let node = tree.node(key).unwrap();
        assert!(node.is_valid, "{key}");
        assert!(!node.is_resolved, "{key}");
        assert!(!node.is_fallback, "{key}");
        assert_eq!(node.state(), NodeState::PresentValid);
        assert_eq!(tree.config[key], expected);
    }
}

#[test]
fn test_boolean_coercion() {
    let schema = maps_schema();
    for raw in [json!("true"), json!("Yes"), json!(1)] {
        let tree = validate_global(&schema, json!({ "disabled": raw.clone() }));
        let node = tree.node("disabled").unwrap();
        assert!(node.is_resolved, "{raw}");
        assert_eq!(node.value, json!(true), "{raw}");
        assert_eq!(tree.config["disabled"], json!(true));
        assert_eq!(tree.config_self["disabled"], json!(true));
    }

    let tree = validate_global(&schema, json!({ "disabled": "2" }));
    let node = tree.node("disabled").unwrap();
    assert!(!node.is_valid);
    assert!(!node.is_resolved);
    assert!(node.has_message(&MessageCode::CoercionFailed));
    // Only the fallback makes it usable.
    assert!(node.is_fallback);
    assert_eq!(node.fallback_source, Some(ScopeKind::Defaults));
    assert_eq!(tree.config["disabled"], json!(false));
    assert!(tree.config_self.get("disabled").is_none());
}

#[test]
fn test_alias_surfaces_under_canonical_name() {
    let schema = maps_schema();
    let tree = validate_global(&schema, json!({ "allowFullscreen": false, "allowSearch": true }));

    for name in ["enableFullscreen", "enableSearch"] {
        let node = tree.node(name).unwrap();
        assert!(node.is_aliased, "{name}");
        assert!(node.has_message(&MessageCode::Aliased));
        assert!(tree.config_self.get(name).is_some());
    }
    assert_eq!(tree.config["enableFullscreen"], json!(false));
    assert!(tree.config.get("allowFullscreen").is_none());
    assert!(tree.config_self.get("allowSearch").is_none());
    assert!(tree.unknown_fields().next().is_none());
}

#[test]
fn test_fallback_chain_across_all_scopes() {
    let cascade = cascade(vec![
        ScopeConfig::global(json!({})),
        ScopeConfig::local("Atlas", json!({ "allowPopups": "false" })),
        ScopeConfig::embed("e1", "Atlas", json!({})),
    ]);

    let global = cascade.tree(ScopeKind::Global, "").unwrap();
    let node = global.node("enablePopups").unwrap();
    assert_eq!(global.config["enablePopups"], json!(true));
    assert!(node.is_fallback);
    assert_eq!(node.fallback_source, Some(ScopeKind::Defaults));

    let local = cascade.tree(ScopeKind::Local, "Atlas").unwrap();
    let node = local.node("enablePopups").unwrap();
    assert_eq!(local.config["enablePopups"], json!(false));
    assert!(node.is_aliased);
    assert!(node.is_resolved);
    assert!(!node.is_fallback);
    assert_eq!(local.children_self, vec!["enablePopups".to_string()]);

    let embed = cascade.tree(ScopeKind::Embed, "e1").unwrap();
    let node = embed.node("enablePopups").unwrap();
    assert_eq!(embed.config["enablePopups"], json!(false));
    assert!(node.is_fallback);
    assert_eq!(node.fallback_source, Some(ScopeKind::Local));
    assert_eq!(embed.config_self, json!({}));
}

#[test]
fn test_redundant_override_is_reported() {
    let cascade = cascade(vec![
        ScopeConfig::global(json!({ "sortMarkers": "latitude" })),
        ScopeConfig::local("Atlas", json!({ "sortMarkers": "latitude" })),
    ]);

    let local = cascade.tree(ScopeKind::Local, "Atlas").unwrap();
    let node = local.node("sortMarkers").unwrap();
    assert!(node.is_valid);
    assert!(node.is_override);
    assert_eq!(node.override_source, Some(ScopeKind::Global));
    assert!(node.has_message(&MessageCode::RedundantOverride));
    assert_eq!(node.state(), NodeState::PresentValid);
}

#[test]
fn test_array_elements_are_independent() {
    let schema = maps_schema();
    let tree = validate_global(&schema, json!({ "hiddenCategories": ["a", 2, "b"] }));

    assert_eq!(tree.config["hiddenCategories"], json!(["a", 2, "b"]));
    let array = tree.node("hiddenCategories").unwrap();
    assert_eq!(array.children.len(), 3);
    assert!(array.children.iter().all(|element| !element.is_fallback));

    let second = tree.node_at_path("hiddenCategories.1").unwrap();
    assert!(!second.is_valid);
    assert!(second.has_message(&MessageCode::Mistyped));
    assert!(tree.node_at_path("hiddenCategories.0").unwrap().is_valid);
    assert!(tree.node_at_path("hiddenCategories.2").unwrap().is_valid);
}

#[test]
fn test_unknown_field_does_not_disturb_siblings() {
    let schema = maps_schema();
    let with_unknown = validate_global(&schema, json!({ "sortMarkers": "category", "disabled": true, "foo": 1 }));
    let without = validate_global(&schema, json!({ "sortMarkers": "category", "disabled": true }));

    let unknown: Vec<&ValidationNode> = with_unknown.unknown_fields().collect();
    assert_eq!(unknown.len(), 1);
    assert_eq!(unknown[0].state(), NodeState::UnknownField);
    assert_eq!(unknown[0].messages.len(), 1);
    assert!(unknown[0].has_message(&MessageCode::UnknownField));

    assert_eq!(with_unknown.config, without.config);
    assert_eq!(with_unknown.config_self, without.config_self);
    assert_eq!(with_unknown.node("sortMarkers"), without.node("sortMarkers"));
    assert_eq!(with_unknown.summary().count(IssueKind::SchemaError), 1);
}

#[test]
fn test_nested_paths_and_styles() {
    let schema = maps_schema();
    let tree = validate_global(
        &schema,
        json!({
            "paths": [
                { "id": 1, "type": "polygon", "points": [[0, 0], [1, 0], [1, 1]], "style": { "fillColor": "red" } },
                { "id": "broken", "type": "polygon", "points": [[0, 0], [1, 1]] }
            ]
        }),
    );

    let good = tree.node_at_path("paths.0.points").unwrap();
    assert!(good.is_valid, "{:?}", good.messages);
    assert_eq!(tree.node_at_path("paths.0.style.fillColor").unwrap().value, json!("red"));
    // Unset style keys inherit their defaults.
    assert_eq!(tree.config["paths"][0]["style"]["strokeWidth"], json!(1));

    let broken = tree.node_at_path("paths.1.points").unwrap();
    assert!(!broken.is_valid);
    assert!(broken.has_message(&MessageCode::Custom("points-too-few".to_string())));
    assert_eq!(tree.summary().count(IssueKind::CustomValidationFailure), 1);
}
