//! Process-wide registration and scope entry points.
//!
//! Extension providers call the `register_*` functions during startup; the
//! query path calls [`make_scope`] once per invocation. All calls share one
//! [`ScopeFactory`] for the lifetime of the process.
//!
//! # Invariants
//! - Registration must complete before the first `make_scope`/`finalize`.
//!   Under the default policy later registrations never reach the root.

use crate::capability::{Function, Plugin, Protocol};
use crate::config::RuntimeConfig;
use crate::factory::ScopeFactory;
use crate::registry::RegistryInventory;
use crate::scope::Scope;
use once_cell::sync::Lazy;
use std::sync::Arc;

static FACTORY: Lazy<ScopeFactory> = Lazy::new(ScopeFactory::new);

/// Returns the process-wide factory.
pub fn factory() -> &'static ScopeFactory {
    &FACTORY
}

pub fn configure(config: &RuntimeConfig) {
    FACTORY.apply_config(config);
}

/// Panics when another plugin already uses the same name.
pub fn register_plugin(plugin: Arc<dyn Plugin>) {
    FACTORY.register_plugin(plugin);
}

/// Panics when another function already uses the same name.
pub fn register_function(function: Arc<dyn Function>) {
    FACTORY.register_function(function);
}

pub fn register_protocol(protocol: Arc<dyn Protocol>) {
    FACTORY.register_protocol(protocol);
}

/// Seals registration and builds the shared root scope.
pub fn finalize() -> &'static Arc<Scope> {
    FACTORY.finalize()
}

/// Returns a new isolated scope for one query invocation.
pub fn make_scope() -> Scope {
    FACTORY.make_scope()
}

/// Current value of the `vql_make_scope` counter.
pub fn scopes_constructed() -> u64 {
    FACTORY.scopes_constructed()
}

pub fn inventory() -> RegistryInventory {
    FACTORY.inventory()
}
