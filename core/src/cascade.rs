//! Ordered (re-)validation of a full set of scopes.
//!
//! A [`Cascade`] owns the raw data of every scope and the trees validated
//! from it. Inserting a scope re-validates it and then every scope that can
//! fall back to it, always lower scopes first. Raw input is digested so
//! re-inserting unchanged data is free.
//!
//! # Examples
//!
//! ```
//! use config_cascade_core::*;
//! use serde_json::json;
//!
//! let schema = Schema::from_defs(vec![
//!     FieldDef::boolean("enablePopups", true).with_alias("allowPopups"),
//! ])
//! .unwrap();
//! let mut cascade = Cascade::new(schema, ValidatorRegistry::default());
//!
//! cascade.insert(ScopeConfig::global(json!({}))).unwrap();
//! cascade.insert(ScopeConfig::local("Atlas", json!({ "allowPopups": "false" }))).unwrap();
//! cascade.insert(ScopeConfig::embed("e1", "Atlas", json!({}))).unwrap();
//!
//! let embed = cascade.tree(ScopeKind::Embed, "e1").unwrap();
//! assert_eq!(embed.config["enablePopups"], json!(false));
//! assert_eq!(embed.node("enablePopups").unwrap().fallback_source, Some(ScopeKind::Local));
//!
//! // Unchanged input is not validated again.
//! assert!(!cascade.insert(ScopeConfig::embed("e1", "Atlas", json!({}))).unwrap());
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::prelude::*;
use serde_json::Value;
use tracing::info;

use crate::error::CascadeError;
use crate::validate::digest;
use crate::{
    ConfigValidator, Schema, ScopeConfig, ScopeKind, ScopeRegistry, ValidationTree,
    ValidatorRegistry,
};

/// Scopes and their validation trees, kept in precedence order.
#[derive(Debug)]
pub struct Cascade {
    schema: Schema,
    validators: ValidatorRegistry,
    global: Option<ScopeConfig>,
    locals: BTreeMap<String, ScopeConfig>,
    embeds: BTreeMap<String, ScopeConfig>,
    registry: ScopeRegistry,
}

impl Cascade {
    /// Creates a cascade holding only the defaults scope.
    pub fn new(schema: Schema, validators: ValidatorRegistry) -> Self {
        let defaults = ConfigValidator::new(&schema, &validators, &ScopeRegistry::new()).validate_defaults();
        let mut registry = ScopeRegistry::new();
        registry.insert(defaults);
        Self {
            schema,
            validators,
            global: None,
            locals: BTreeMap::new(),
            embeds: BTreeMap::new(),
            registry,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Completed trees, for handing to a [`ConfigValidator`] directly.
    pub fn registry(&self) -> &ScopeRegistry {
        &self.registry
    }

    /// Stores a scope and re-validates it along with its dependents.
    ///
    /// Returns `false` when the raw data is unchanged and nothing was
    /// validated.
    ///
    /// # Errors
    ///
    /// Returns [`CascadeError::DefaultsAreSchemaOwned`] for a defaults scope
    /// and [`CascadeError::MissingMapName`] for an embed that does not name
    /// its local scope.
    pub fn insert(&mut self, scope: ScopeConfig) -> Result<bool, CascadeError> {
        let meta = &scope.meta;
        match meta.kind {
            ScopeKind::Defaults => return Err(CascadeError::DefaultsAreSchemaOwned),
            ScopeKind::Embed if meta.map_name.is_none() => {
                return Err(CascadeError::MissingMapName(meta.kind, meta.source_id.clone()));
            }
            _ => {}
        }

        let unchanged = self
            .registry
            .get(meta.kind, &meta.source_id)
            .is_some_and(|tree| tree.digest == digest(&scope.raw) && tree.meta == scope.meta);
        if unchanged {
            return Ok(false);
        }

        let kind = meta.kind;
        let source_id = meta.source_id.clone();
        match kind {
            ScopeKind::Global => {
                self.global = Some(scope);
                self.revalidate_global();
                self.revalidate_locals(|_| true);
                self.revalidate_embeds(|_| true);
            }
            ScopeKind::Local => {
                self.locals.insert(source_id.clone(), scope);
                self.revalidate_locals(|id| id == source_id);
                self.revalidate_embeds(|embed| embed.meta.map_name.as_deref() == Some(source_id.as_str()));
            }
            ScopeKind::Embed => {
                self.embeds.insert(source_id.clone(), scope);
                self.revalidate_embeds(|embed| embed.meta.source_id == source_id);
            }
            ScopeKind::Defaults => {}
        }
        Ok(true)
    }

    /// Re-validates every stored scope in precedence order.
    pub fn validate_all(&mut self) {
        self.revalidate_global();
        self.revalidate_locals(|_| true);
        self.revalidate_embeds(|_| true);
    }

    /// Returns the tree of a scope. `id` is ignored for defaults and global.
    pub fn tree(&self, kind: ScopeKind, id: &str) -> Option<&ValidationTree> {
        self.registry.get(kind, id).map(Arc::as_ref)
    }

    /// Returns the merged config of a scope.
    pub fn config(&self, kind: ScopeKind, id: &str) -> Option<&Value> {
        self.tree(kind, id).map(|tree| &tree.config)
    }

    fn revalidate_global(&mut self) {
        if let Some(global) = &self.global {
            info!(scope = %global.meta.kind, "Validating scope");
            let tree = ConfigValidator::new(&self.schema, &self.validators, &self.registry).validate_config(global);
            self.registry.insert(tree);
        }
    }

    fn revalidate_locals(&mut self, selected: impl Fn(&str) -> bool) {
        let scopes: Vec<&ScopeConfig> = self
            .locals
            .iter()
            .filter(|(id, _)| selected(id))
            .map(|(_, scope)| scope)
            .collect();
        let trees = self.validate_stage(&scopes);
        for tree in trees {
            self.registry.insert(tree);
        }
    }

    fn revalidate_embeds(&mut self, selected: impl Fn(&ScopeConfig) -> bool) {
        let scopes: Vec<&ScopeConfig> = self.embeds.values().filter(|scope| selected(scope)).collect();
        let trees = self.validate_stage(&scopes);
        for tree in trees {
            self.registry.insert(tree);
        }
    }

    /// Validates scopes of one precedence tier in parallel. They only read
    /// lower tiers, so the registry stays frozen for the whole stage.
    fn validate_stage(&self, scopes: &[&ScopeConfig]) -> Vec<ValidationTree> {
        if scopes.is_empty() {
            return Vec::new();
        }
        info!(count = scopes.len(), scope = %scopes[0].meta.kind, "Validating scopes");
        let validator = ConfigValidator::new(&self.schema, &self.validators, &self.registry);
        scopes
            .par_iter()
            .map(|scope| validator.validate_config(scope))
            .collect()
    }
}
