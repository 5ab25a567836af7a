use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

use serde_json::{Value, json};
use tempfile::TempDir;

fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("failed to write fixture");
    path
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_config-cascade"))
        .args(args)
        .output()
        .expect("failed to run config-cascade")
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

/// Writes a global JSON file, a local YAML file and an empty embed file.
fn write_scopes(dir: &TempDir) -> (PathBuf, PathBuf, PathBuf) {
    let global = write_file(dir, "global.json", r#"{ "sortMarkers": "category", "foo": 1 }"#);
    let local = write_file(dir, "atlas.yaml", "allowPopups: \"false\"\nhiddenCategories: [a, 2, b]\n");
    let embed = write_file(dir, "embed.json", "{}");
    (global, local, embed)
}

// ---------------------------------------------------------------------------
// defaults
// ---------------------------------------------------------------------------

#[test]
fn defaults_prints_builtin_document() {
    let output = run(&["defaults"]);
    let defaults = stdout_json(&output);
    assert_eq!(defaults["sortMarkers"], json!("latitude"));
    assert_eq!(defaults["enablePopups"], json!(true));
    assert!(defaults.get("iconPosition").is_none());
}

#[test]
fn defaults_supports_yaml_output_and_custom_schema() {
    let dir = TempDir::new().unwrap();
    let schema = write_file(
        &dir,
        "schema.yaml",
        "- name: theme\n  type: string\n  default: dark\n- name: zoom\n  type: number\n  default: 3\n",
    );

    let output = run(&["defaults", "--schema", schema.to_str().unwrap(), "--format", "yaml"]);
    assert!(output.status.success());
    let defaults: Value = serde_yaml::from_slice(&output.stdout).expect("stdout should be YAML");
    assert_eq!(defaults, json!({ "theme": "dark", "zoom": 3 }));
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

#[test]
fn validate_reports_every_scope_in_precedence_order() {
    let dir = TempDir::new().unwrap();
    let (global, local, embed) = write_scopes(&dir);
    let local_arg = format!("Atlas={}", local.display());
    let embed_arg = format!("e1@Atlas={}", embed.display());

    let output = run(&[
        "validate",
        "--global",
        global.to_str().unwrap(),
        "--local",
        &local_arg,
        "--embed",
        &embed_arg,
        "--format",
        "json",
    ]);
    let report = stdout_json(&output);
    assert!(report["generatedAt"].is_string());

    let scopes = report["scopes"].as_array().unwrap();
    let kinds: Vec<&str> = scopes
        .iter()
        .map(|scope| scope["meta"]["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["defaults", "global", "local", "embed"]);

    let embed = &scopes[3];
    assert_eq!(embed["meta"]["mapName"], json!("Atlas"));
    assert_eq!(embed["config"]["enablePopups"], json!(false));
    assert_eq!(embed["config"]["sortMarkers"], json!("category"));
    assert_eq!(embed["config"]["hiddenCategories"], json!(["a", 2, "b"]));

    let global_messages = scopes[1]["messages"].as_array().unwrap();
    assert!(
        global_messages
            .iter()
            .any(|message| message["path"] == "foo" && message["code"] == "unknown-field")
    );
    let local_messages = scopes[2]["messages"].as_array().unwrap();
    assert!(
        local_messages
            .iter()
            .any(|message| message["path"] == "hiddenCategories.1" && message["kind"] == "type-mismatch")
    );
}

#[test]
fn validate_self_only_reports_own_values() {
    let dir = TempDir::new().unwrap();
    let (global, local, _) = write_scopes(&dir);
    let local_arg = format!("Atlas={}", local.display());

    let output = run(&[
        "validate",
        "--global",
        global.to_str().unwrap(),
        "--local",
        &local_arg,
        "--format",
        "json",
        "--self-only",
    ]);
    let report = stdout_json(&output);
    let local = &report["scopes"][2];
    assert!(local.get("config").is_none());
    assert_eq!(
        local["configSelf"],
        json!({ "enablePopups": false, "hiddenCategories": ["a", 2, "b"] })
    );
}

#[test]
fn validate_summary_lists_problems() {
    let dir = TempDir::new().unwrap();
    let (global, _, _) = write_scopes(&dir);

    let output = run(&["validate", "--global", global.to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("defaults:"), "{stdout}");
    assert!(stdout.contains("global:"), "{stdout}");
    assert!(stdout.contains("foo: (unknown-field)"), "{stdout}");
}

#[test]
fn validate_rejects_malformed_scope_arguments() {
    let dir = TempDir::new().unwrap();
    let embed = write_file(&dir, "embed.json", "{}");

    let output = run(&["validate", "--embed", &format!("e1={}", embed.display())]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: Invalid --embed value"), "{stderr}");
}

#[test]
fn validate_reports_unreadable_files() {
    let dir = TempDir::new().unwrap();
    let broken = write_file(&dir, "global.json", "{ not json");

    let output = run(&["validate", "--global", broken.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to parse JSON"), "{stderr}");
}

// ---------------------------------------------------------------------------
// check-schema
// ---------------------------------------------------------------------------

#[test]
fn check_schema_accepts_builtin() {
    let output = run(&["check-schema"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Schema OK"));
}

#[test]
fn check_schema_lists_every_error() {
    let dir = TempDir::new().unwrap();
    let schema = write_file(
        &dir,
        "schema.json",
        r#"[
            { "name": "theme", "type": "string", "default": "dark" },
            { "name": "theme", "type": "string" },
            { "name": "bad-name", "type": "number", "default": "three" }
        ]"#,
    );

    let output = run(&["check-schema", "--schema", schema.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 3, "{stdout}");
    assert!(String::from_utf8_lossy(&output.stderr).contains("3 schema error(s) found"));
}
