//! Execution scope used by query invocations.
//!
//! # Responsibility
//! - Hold variable bindings and capability tables for one query.
//! - Delegate unresolved lookups to a parent scope.
//!
//! # Invariants
//! - A child never mutates its parent; the parent link is a shared `Arc`.
//! - Local entries shadow inherited ones with the same name.
//! - Protocol order is parent chain first, then local, each in insertion order.

use crate::capability::{Function, Plugin, Protocol};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;
use uuid::Uuid;

/// Stable identifier for one scope instance, used for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(Uuid);

impl ScopeId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for ScopeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub struct Scope {
    id: ScopeId,
    parent: Option<Arc<Scope>>,
    vars: HashMap<String, Value>,
    plugins: BTreeMap<String, Arc<dyn Plugin>>,
    functions: BTreeMap<String, Arc<dyn Function>>,
    protocols: Vec<Arc<dyn Protocol>>,
}

impl Scope {
    /// Creates an empty base scope with no parent.
    pub fn new() -> Self {
        Self {
            id: ScopeId::new(),
            parent: None,
            vars: HashMap::new(),
            plugins: BTreeMap::new(),
            functions: BTreeMap::new(),
            protocols: Vec::new(),
        }
    }

    /// Derives an empty child that delegates lookups to `parent`.
    pub fn new_child(parent: &Arc<Scope>) -> Self {
        Self {
            parent: Some(Arc::clone(parent)),
            ..Self::new()
        }
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    pub fn parent(&self) -> Option<&Arc<Scope>> {
        self.parent.as_ref()
    }

    pub fn append_plugin(&mut self, plugin: Arc<dyn Plugin>) {
        self.plugins.insert(plugin.info().name, plugin);
    }

    pub fn append_function(&mut self, function: Arc<dyn Function>) {
        self.functions.insert(function.info().name, function);
    }

    pub fn add_protocol_impl(&mut self, protocol: Arc<dyn Protocol>) {
        self.protocols.push(protocol);
    }

    /// Binds a variable in this scope only.
    pub fn set_var(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    /// Resolves a variable through the parent chain.
    pub fn resolve(&self, name: &str) -> Option<&Value> {
        match self.vars.get(name) {
            Some(value) => Some(value),
            None => self.parent.as_ref()?.resolve(name),
        }
    }

    pub fn plugin(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        match self.plugins.get(name) {
            Some(plugin) => Some(Arc::clone(plugin)),
            None => self.parent.as_ref()?.plugin(name),
        }
    }

    pub fn function(&self, name: &str) -> Option<Arc<dyn Function>> {
        match self.functions.get(name) {
            Some(function) => Some(Arc::clone(function)),
            None => self.parent.as_ref()?.function(name),
        }
    }

    /// Returns every visible protocol implementation in dispatch order.
    pub fn protocols(&self) -> Vec<Arc<dyn Protocol>> {
        let mut protocols = match &self.parent {
            Some(parent) => parent.protocols(),
            None => Vec::new(),
        };
        protocols.extend(self.protocols.iter().cloned());
        protocols
    }

    /// Returns sorted, de-duplicated plugin names visible from this scope.
    pub fn plugin_names(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        let mut current = Some(self);
        while let Some(scope) = current {
            names.extend(scope.plugins.keys().cloned());
            current = scope.parent.as_deref();
        }
        names.into_iter().collect()
    }

    /// Returns sorted, de-duplicated function names visible from this scope.
    pub fn function_names(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        let mut current = Some(self);
        while let Some(scope) = current {
            names.extend(scope.functions.keys().cloned());
            current = scope.parent.as_deref();
        }
        names.into_iter().collect()
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("parent", &self.parent.as_ref().map(|parent| parent.id))
            .field("vars", &self.vars.keys().collect::<Vec<_>>())
            .field("plugins", &self.plugins.keys().collect::<Vec<_>>())
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .field("protocols", &self.protocols.len())
            .finish()
    }
}
