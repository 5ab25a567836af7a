use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use config_cascade_core::{
    Cascade, FieldDef, IssueKind, Message, Schema, ScopeConfig, ScopeKind, ScopeMeta, Summary,
    ValidationTree, ValidatorRegistry, builtin, check_schema,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output format for validation reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum ReportFormat {
    Json,
    Yaml,
    Summary,
}

/// Output format for plain documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum DocumentFormat {
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "config-cascade")]
#[command(about = "Validate layered configuration scopes against a schema")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate global, local and embed scopes and print the merged result.
    Validate(ValidateArgs),
    /// Check a schema file for definition errors.
    CheckSchema(CheckSchemaArgs),
    /// Print the defaults document derived from a schema.
    Defaults(DefaultsArgs),
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Schema file (JSON or YAML list of field definitions). Defaults to the
    /// built-in map settings schema.
    #[arg(long)]
    schema: Option<PathBuf>,
    /// Global scope config file.
    #[arg(long)]
    global: Option<PathBuf>,
    /// Local scope config, as NAME=FILE. Repeatable.
    #[arg(long = "local", value_name = "NAME=FILE")]
    locals: Vec<String>,
    /// Embed scope config, as ID@MAP=FILE. Repeatable.
    #[arg(long = "embed", value_name = "ID@MAP=FILE")]
    embeds: Vec<String>,
    /// Report format.
    #[arg(long, default_value = "summary")]
    format: ReportFormat,
    /// Report only the values each scope supplied itself.
    #[arg(long)]
    self_only: bool,
}

#[derive(Debug, Args)]
struct CheckSchemaArgs {
    /// Schema file. Defaults to the built-in map settings schema.
    #[arg(long)]
    schema: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct DefaultsArgs {
    /// Schema file. Defaults to the built-in map settings schema.
    #[arg(long)]
    schema: Option<PathBuf>,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: DocumentFormat,
}

/// Machine-readable validation report.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report<'a> {
    tool_version: &'static str,
    generated_at: String,
    scopes: Vec<ScopeReport<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScopeReport<'a> {
    meta: &'a ScopeMeta,
    digest: &'a str,
    summary: Summary,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    config_self: Option<&'a Value>,
    messages: Vec<Diagnostic<'a>>,
}

#[derive(Debug, Serialize)]
struct Diagnostic<'a> {
    path: &'a str,
    #[serde(flatten)]
    message: &'a Message,
    kind: IssueKind,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Validate(args) => run_validate(args),
        Command::CheckSchema(args) => run_check_schema(args),
        Command::Defaults(args) => run_defaults(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let schema = load_schema(args.schema.as_deref())?;
    let validators = ValidatorRegistry::default();
    for (path, name) in validators.missing_for(&schema) {
        warn!(path = %path, validator = %name, "Schema references an unregistered validator");
    }

    let mut scopes = Vec::new();
    if let Some(path) = &args.global {
        scopes.push(ScopeConfig::new(ScopeMeta::global(), read_document(path)?));
    }
    for raw in &args.locals {
        let (name, path) = parse_local_arg(raw)?;
        scopes.push(ScopeConfig::new(ScopeMeta::local(name), read_document(&path)?));
    }
    for raw in &args.embeds {
        let (id, map, path) = parse_embed_arg(raw)?;
        scopes.push(ScopeConfig::new(ScopeMeta::embed(id, map), read_document(&path)?));
    }

    let mut cascade = Cascade::new(schema, validators);
    for scope in scopes {
        debug!(scope = %scope.meta.kind, source = %scope.meta.source_id, "Loading scope");
        cascade.insert(scope).map_err(|err| err.to_string())?;
    }

    let trees = report_order(&cascade);
    match args.format {
        ReportFormat::Summary => {
            print!("{}", render_summary(&trees, args.self_only));
            Ok(())
        }
        ReportFormat::Json | ReportFormat::Yaml => {
            let report = build_report(&trees, args.self_only);
            let format = if args.format == ReportFormat::Json {
                DocumentFormat::Json
            } else {
                DocumentFormat::Yaml
            };
            println!("{}", format_document(&report, format)?);
            Ok(())
        }
    }
}

fn run_check_schema(args: CheckSchemaArgs) -> Result<(), String> {
    let defs = load_defs(args.schema.as_deref())?;
    let errors = check_schema(&defs);
    for error in &errors {
        println!("{error}");
    }
    if !errors.is_empty() {
        return Err(format!("{} schema error(s) found", errors.len()));
    }

    let schema = Schema::from_defs(defs).map_err(|err| err.to_string())?;
    let missing = ValidatorRegistry::default().missing_for(&schema);
    for (path, name) in &missing {
        println!("{path}: unregistered validator '{name}'");
    }
    if !missing.is_empty() {
        return Err(format!("{} unregistered validator(s) referenced", missing.len()));
    }

    println!(
        "Schema OK: {} field(s), {} root field(s).",
        schema.len(),
        schema.roots().len()
    );
    Ok(())
}

fn run_defaults(args: DefaultsArgs) -> Result<(), String> {
    let schema = load_schema(args.schema.as_deref())?;
    let defaults = Value::Object(schema.defaults_document());
    println!("{}", format_document(&defaults, args.format)?);
    Ok(())
}

/// Reads a JSON or YAML document, picked by file extension.
fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read '{}': {err}", path.display()))?;
    if is_yaml(path) {
        serde_yaml::from_str(&raw)
            .map_err(|err| format!("Failed to parse YAML '{}': {err}", path.display()))
    } else {
        serde_json::from_str(&raw)
            .map_err(|err| format!("Failed to parse JSON '{}': {err}", path.display()))
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}

fn load_defs(path: Option<&Path>) -> Result<Vec<FieldDef>, String> {
    match path {
        Some(path) => read_document(path),
        None => Ok(builtin::maps_extended()),
    }
}

fn load_schema(path: Option<&Path>) -> Result<Schema, String> {
    let defs = load_defs(path)?;
    let errors = check_schema(&defs);
    if !errors.is_empty() {
        let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
        return Err(format!("Invalid schema: {}", details.join("; ")));
    }
    Schema::from_defs(defs).map_err(|err| format!("Invalid schema: {err}"))
}

fn parse_local_arg(raw: &str) -> Result<(&str, PathBuf), String> {
    match raw.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => Ok((name, PathBuf::from(path))),
        _ => Err(format!("Invalid --local value '{raw}', expected NAME=FILE")),
    }
}

fn parse_embed_arg(raw: &str) -> Result<(&str, &str, PathBuf), String> {
    let parsed = raw.split_once('=').and_then(|(target, path)| {
        let (id, map) = target.split_once('@')?;
        let valid = !id.is_empty() && !map.is_empty() && !path.is_empty();
        valid.then(|| (id, map, PathBuf::from(path)))
    });
    parsed.ok_or_else(|| format!("Invalid --embed value '{raw}', expected ID@MAP=FILE"))
}

/// Trees in precedence order: defaults, global, locals, embeds.
fn report_order(cascade: &Cascade) -> Vec<&ValidationTree> {
    let registry = cascade.registry();
    let mut trees: Vec<&ValidationTree> = Vec::new();
    trees.extend(cascade.tree(ScopeKind::Defaults, ""));
    trees.extend(cascade.tree(ScopeKind::Global, ""));
    trees.extend(registry.locals().map(Arc::as_ref));
    trees.extend(registry.embeds().map(Arc::as_ref));
    trees
}

fn build_report<'a>(trees: &[&'a ValidationTree], self_only: bool) -> Report<'a> {
    let scopes = trees
        .iter()
        .map(|tree| ScopeReport {
            meta: &tree.meta,
            digest: &tree.digest,
            summary: tree.summary(),
            config: (!self_only).then_some(&tree.config),
            config_self: self_only.then_some(&tree.config_self),
            messages: tree
                .iter()
                .flat_map(|node| {
                    node.messages.iter().map(|message| Diagnostic {
                        path: &node.path,
                        message,
                        kind: message.issue_kind(),
                    })
                })
                .collect(),
        })
        .collect();

    Report {
        tool_version: PACKAGE_VERSION,
        generated_at: Utc::now().to_rfc3339(),
        scopes,
    }
}

fn render_summary(trees: &[&ValidationTree], self_only: bool) -> String {
    let mut out = String::new();
    for tree in trees {
        out.push_str(&format!("{}: {}\n", scope_label(&tree.meta), tree.summary()));
        if self_only {
            let keys = if tree.children_self.is_empty() {
                "(none)".to_string()
            } else {
                tree.children_self.join(", ")
            };
            out.push_str(&format!("  own keys: {keys}\n"));
        }
        for node in tree.iter() {
            for message in node.messages.iter().filter(|message| message.issue_kind().is_problem()) {
                out.push_str(&format!("  {}: {message}\n", node.path));
            }
        }
    }
    out
}

fn scope_label(meta: &ScopeMeta) -> String {
    match (meta.kind, meta.map_name.as_deref()) {
        (ScopeKind::Defaults | ScopeKind::Global, _) => meta.kind.to_string(),
        (ScopeKind::Embed, Some(map)) => format!("{} {}@{map}", meta.kind, meta.source_id),
        _ => format!("{} {}", meta.kind, meta.source_id),
    }
}

fn format_document<T: Serialize>(value: &T, format: DocumentFormat) -> Result<String, String> {
    match format {
        DocumentFormat::Json => serde_json::to_string_pretty(value)
            .map_err(|err| format!("Failed to serialize JSON output: {err}")),
        DocumentFormat::Yaml => serde_yaml::to_string(value)
            .map_err(|err| format!("Failed to serialize YAML output: {err}")),
    }
}
