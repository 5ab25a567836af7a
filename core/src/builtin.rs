//! Built-in schema for interactive map settings.
//!
//! This is declarative data: marker placement, popups, categories and their
//! recursive groups, map controls, the sidebar, vector paths and their
//! styles, the ruler and collectibles.

use crate::validators::PATH_POINTS;
use crate::{FieldDef, OneOrMany, ValueKind};

const ANCHORS: [&str; 9] = [
    "top-left",
    "top-center",
    "top-right",
    "center-left",
    "center",
    "center-right",
    "bottom-left",
    "bottom-center",
    "bottom-right",
];

const MAP_CONTROLS: [&str; 4] = ["edit", "zoom", "fullscreen", "srw_floors"];

const PATH_TYPES: [&str; 7] = [
    "polygon",
    "polyline",
    "line",
    "circle",
    "ellipse",
    "rectangle",
    "rounded_rectangle",
];

fn id_field(name: &str) -> FieldDef {
    FieldDef::any_of(name, &[ValueKind::String, ValueKind::Number])
}

fn text(name: &str) -> FieldDef {
    FieldDef::new(name, ValueKind::String)
}

/// Returns the map settings schema.
///
/// ```
/// use config_cascade_core::{Schema, builtin};
///
/// let schema = Schema::from_defs(builtin::maps_extended()).unwrap();
/// let defaults = schema.defaults_document();
/// assert_eq!(defaults["sortMarkers"], "latitude");
/// assert!(schema.spec_at_path("categoryGroups.categoryGroup.children.categoryGroup.label").is_some());
/// ```
pub fn maps_extended() -> Vec<FieldDef> {
    let mut fields = markers();
    fields.extend(popups());
    fields.extend(categories());
    fields.extend(interface());
    fields.push(paths());
    fields.push(styles());
    fields.extend(ruler_and_collectibles());
    fields
}

fn markers() -> Vec<FieldDef> {
    vec![
        FieldDef::boolean("disabled", false),
        FieldDef::string("iconAnchor", "center").with_valid_values(ANCHORS),
        text("iconPosition").with_valid_values(ANCHORS),
        FieldDef::string("sortMarkers", "latitude")
            .with_valid_values(["latitude", "longitude", "category", "unsorted"]),
    ]
}

fn popups() -> Vec<FieldDef> {
    vec![
        FieldDef::boolean("enablePopups", true).with_alias("allowPopups"),
        FieldDef::boolean("openPopupsOnHover", false),
        FieldDef::number("popupHideDelay", 0.5),
        FieldDef::number("popupShowDelay", 0.1),
        FieldDef::boolean("useCustomPopups", false),
    ]
}

fn categories() -> Vec<FieldDef> {
    let group = FieldDef::any_of("categoryGroup", &[ValueKind::String, ValueKind::Object]).with_children(vec![
        FieldDef::string("label", "Group").required(),
        FieldDef::boolean("collapsible", true),
        FieldDef::boolean("collapsed", false),
        FieldDef::boolean("hidden", false),
        FieldDef::redirect("children", "categoryGroups"),
    ]);

    vec![
        FieldDef::array_of("hiddenCategories", ValueKind::String),
        FieldDef::array_of("visibleCategories", ValueKind::String),
        FieldDef::array_of("disabledCategories", ValueKind::String),
        FieldDef::array_of(
            "categoryGroups",
            OneOrMany::Many(vec![ValueKind::String, ValueKind::Object]),
        )
        .with_children(vec![group]),
    ]
}

fn interface() -> Vec<FieldDef> {
    let control_group = FieldDef::array_of("mapControlGroup", ValueKind::String)
        .required()
        .with_children(vec![text("mapControlGroupItem").with_valid_values(MAP_CONTROLS)]);

    vec![
        FieldDef::boolean("minimalLayout", false),
        FieldDef::array_of("mapControls", ValueKind::Array).with_children(vec![control_group]),
        FieldDef::array_of("hiddenControls", ValueKind::String).with_valid_values(MAP_CONTROLS),
        FieldDef::boolean("enableFullscreen", true).with_alias("allowFullscreen"),
        FieldDef::string("fullscreenMode", "window").with_valid_values(["window", "screen"]),
        FieldDef::boolean("enableSidebar", false),
        FieldDef::boolean("sidebarOverlay", false),
        FieldDef::string("sidebarSide", "left").with_valid_values(["left", "right"]),
        FieldDef::string("sidebarBehaviour", "autoInitial")
            .with_valid_values(["autoAlways", "autoInitial", "manual"]),
        FieldDef::string("sidebarInitialState", "auto").with_valid_values(["auto", "show", "hide"]),
        FieldDef::boolean("enableSearch", true).with_alias("allowSearch"),
        FieldDef::boolean("enableTooltips", true).with_alias("allowTooltips"),
        FieldDef::string("canvasRenderOrderMode", "auto").with_valid_values(["auto", "manual"]),
    ]
}

fn paths() -> FieldDef {
    let popup = FieldDef::object(
        "popup",
        vec![
            text("title").required(),
            text("description"),
            text("image"),
            FieldDef::object("link", vec![text("url").required(), text("label").required()]),
        ],
    );

    let path = FieldDef::object(
        "path",
        vec![
            id_field("id").required(),
            id_field("styleId"),
            FieldDef::redirect("style", "styles.style"),
            id_field("categoryId"),
            text("title"),
            text("link"),
            popup,
            FieldDef::string("type", "polyline").required().with_valid_values(PATH_TYPES),
            FieldDef::boolean("scaling", true),
            FieldDef::boolean("smoothing", false),
            FieldDef::number("smoothingIterations", 5.0),
            FieldDef::any_of("position", &[ValueKind::Array, ValueKind::String]),
            FieldDef::new("points", ValueKind::Array)
                .with_array_type(ValueKind::Array)
                .with_validator(PATH_POINTS),
        ],
    );

    FieldDef::array_of("paths", ValueKind::Object).with_children(vec![path])
}

fn styles() -> FieldDef {
    let style = FieldDef::object(
        "style",
        vec![
            id_field("id"),
            FieldDef::boolean("stroke", true),
            FieldDef::string("strokeColor", "black"),
            FieldDef::number("strokeWidth", 1.0),
            FieldDef::new("lineDashArray", ValueKind::Array).with_array_type(ValueKind::Number),
            FieldDef::number("lineDashOffset", 0.0),
            FieldDef::string("lineCap", "round").with_valid_values(["butt", "round", "square"]),
            FieldDef::string("lineJoin", "round").with_valid_values(["round", "bevel", "miter"]),
            FieldDef::number("miterLimit", 1.0),
            FieldDef::boolean("fill", true),
            FieldDef::string("fillColor", "black"),
            FieldDef::string("fillRule", "evenodd").with_valid_values(["nonzero", "evenodd"]),
            text("shadowColor"),
            FieldDef::new("shadowBlur", ValueKind::Number),
            FieldDef::new("shadowOffset", ValueKind::Array).with_array_type(ValueKind::Number),
        ],
    );

    FieldDef::new("styles", ValueKind::Array)
        .with_array_type(ValueKind::Object)
        .with_children(vec![style])
}

fn ruler_and_collectibles() -> Vec<FieldDef> {
    vec![
        FieldDef::boolean("enableRuler", true),
        FieldDef::number("pixelsToMeters", 100.0),
        FieldDef::array_of("collectibleCategories", ValueKind::String).required(),
        FieldDef::boolean("enableCollectedAllNotification", true),
        FieldDef::number("collectibleExpiryTime", 2_629_743.0),
    ]
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{Schema, check_schema};

    #[test]
    fn test_builtin_schema_is_clean() {
        let defs = maps_extended();
        assert!(check_schema(&defs).is_empty(), "{:?}", check_schema(&defs));
        let schema = Schema::from_defs(defs).unwrap();
        assert!(crate::ValidatorRegistry::default().missing_for(&schema).is_empty());
    }

    #[test]
    fn test_builtin_defaults() {
        let schema = Schema::from_defs(maps_extended()).unwrap();
        let defaults = schema.defaults_document();
        assert_eq!(defaults["enablePopups"], json!(true));
        assert_eq!(defaults["collectibleExpiryTime"], json!(2_629_743));
        assert_eq!(defaults["popupHideDelay"], json!(0.5));
        assert_eq!(defaults["categoryGroups"], json!([]));
        assert!(!defaults.contains_key("iconPosition"));
        assert!(!defaults.contains_key("styles"));
    }

    #[test]
    fn test_path_style_redirects_into_styles() {
        let schema = Schema::from_defs(maps_extended()).unwrap();
        let style = schema.spec_at_path("paths.path.style").unwrap();
        let target = schema.resolve(style);
        assert_eq!(schema.spec(target).path, "styles.style");
        assert!(schema.spec_at_path("paths.path.style.fillColor").is_some());
    }
}
