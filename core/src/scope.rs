//! Configuration scopes and the registry of validated scopes.
//!
//! Scopes are layered narrowest-first: embed, local, global, defaults. A
//! scope that cannot supply a usable value defers to the next scope down,
//! reading from a [`ScopeRegistry`] that holds trees validated earlier.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ValidationTree;

/// Precedence tier of a configuration source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Defaults,
    Global,
    Local,
    Embed,
}

impl ScopeKind {
    /// Validation order: every scope comes after the scopes it falls back to.
    pub const VALIDATION_ORDER: [ScopeKind; 4] = [
        ScopeKind::Defaults,
        ScopeKind::Global,
        ScopeKind::Local,
        ScopeKind::Embed,
    ];

    /// The scope this one falls back to, `None` for defaults.
    ///
    /// ```
    /// use config_cascade_core::ScopeKind;
    ///
    /// assert_eq!(ScopeKind::Embed.next_down(), Some(ScopeKind::Local));
    /// assert_eq!(ScopeKind::Global.next_down(), Some(ScopeKind::Defaults));
    /// assert_eq!(ScopeKind::Defaults.next_down(), None);
    /// ```
    pub fn next_down(self) -> Option<ScopeKind> {
        match self {
            Self::Embed => Some(Self::Local),
            Self::Local => Some(Self::Global),
            Self::Global => Some(Self::Defaults),
            Self::Defaults => None,
        }
    }

    /// Returns `true` for the terminal scope.
    pub fn is_terminal(self) -> bool {
        self == Self::Defaults
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Defaults => write!(f, "defaults"),
            Self::Global => write!(f, "global"),
            Self::Local => write!(f, "local"),
            Self::Embed => write!(f, "embed"),
        }
    }
}

/// Identifying metadata of a scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeMeta {
    pub kind: ScopeKind,
    /// Unique within the scope kind.
    pub source_id: String,
    pub display_label: String,
    /// Local scope this scope inherits from. Equal to `source_id` for
    /// locals, required for embeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_name: Option<String>,
}

impl ScopeMeta {
    /// Metadata of the schema-derived defaults scope.
    pub fn defaults() -> Self {
        Self::new(ScopeKind::Defaults, "defaults", "Defaults", None)
    }

    /// Metadata of the shared global scope.
    pub fn global() -> Self {
        Self::new(ScopeKind::Global, "global", "Global", None)
    }

    /// Metadata of the local scope for one map.
    pub fn local(map_name: &str) -> Self {
        Self::new(ScopeKind::Local, map_name, &format!("Local ({map_name})"), Some(map_name))
    }

    /// Metadata of one embed of a map.
    pub fn embed(source_id: &str, map_name: &str) -> Self {
        Self::new(
            ScopeKind::Embed,
            source_id,
            &format!("Embed ({source_id} of {map_name})"),
            Some(map_name),
        )
    }

    fn new(kind: ScopeKind, source_id: &str, display_label: &str, map_name: Option<&str>) -> Self {
        Self {
            kind,
            source_id: source_id.to_string(),
            display_label: display_label.to_string(),
            map_name: map_name.map(str::to_string),
        }
    }

    /// Replaces the human-readable label.
    pub fn with_label(mut self, label: &str) -> Self {
        self.display_label = label.to_string();
        self
    }
}

/// One raw data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeConfig {
    pub meta: ScopeMeta,
    pub raw: Value,
}

impl ScopeConfig {
    pub fn new(meta: ScopeMeta, raw: Value) -> Self {
        Self { meta, raw }
    }

    pub fn global(raw: Value) -> Self {
        Self::new(ScopeMeta::global(), raw)
    }

    pub fn local(map_name: &str, raw: Value) -> Self {
        Self::new(ScopeMeta::local(map_name), raw)
    }

    pub fn embed(source_id: &str, map_name: &str, raw: Value) -> Self {
        Self::new(ScopeMeta::embed(source_id, map_name), raw)
    }
}

/// Completed validation trees, looked up during fallback resolution.
///
/// The registry is passed to the validator explicitly. Trees are shared
/// behind [`Arc`], so cloning a registry to hand a frozen snapshot to
/// parallel workers is cheap.
#[derive(Debug, Clone, Default)]
pub struct ScopeRegistry {
    defaults: Option<Arc<ValidationTree>>,
    global: Option<Arc<ValidationTree>>,
    locals: BTreeMap<String, Arc<ValidationTree>>,
    embeds: BTreeMap<String, Arc<ValidationTree>>,
}

impl ScopeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a tree under its scope metadata, replacing any previous one.
    pub fn insert(&mut self, tree: impl Into<Arc<ValidationTree>>) {
        let tree = tree.into();
        let id = tree.meta.source_id.clone();
        match tree.meta.kind {
            ScopeKind::Defaults => self.defaults = Some(tree),
            ScopeKind::Global => self.global = Some(tree),
            ScopeKind::Local => {
                self.locals.insert(id, tree);
            }
            ScopeKind::Embed => {
                self.embeds.insert(id, tree);
            }
        }
    }

    /// Returns the tree for a scope. `id` is ignored for the singleton
    /// defaults and global scopes.
    pub fn get(&self, kind: ScopeKind, id: &str) -> Option<&Arc<ValidationTree>> {
        match kind {
            ScopeKind::Defaults => self.defaults.as_ref(),
            ScopeKind::Global => self.global.as_ref(),
            ScopeKind::Local => self.locals.get(id),
            ScopeKind::Embed => self.embeds.get(id),
        }
    }

    /// Returns the tree of kind `candidate` that `requester` falls back to.
    ///
    /// An embed's local is the one named by its `map_name`.
    pub fn candidate(&self, candidate: ScopeKind, requester: &ScopeMeta) -> Option<&Arc<ValidationTree>> {
        match candidate {
            ScopeKind::Local => {
                let map_name = requester.map_name.as_deref().unwrap_or(&requester.source_id);
                self.locals.get(map_name)
            }
            kind => self.get(kind, ""),
        }
    }

    /// Iterates local trees in name order.
    pub fn locals(&self) -> impl Iterator<Item = &Arc<ValidationTree>> {
        self.locals.values()
    }

    /// Iterates embed trees in id order.
    pub fn embeds(&self) -> impl Iterator<Item = &Arc<ValidationTree>> {
        self.embeds.values()
    }
}
