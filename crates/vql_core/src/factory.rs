//! Root scope bootstrap and per-query scope factory.
//!
//! # Responsibility
//! - Own the capability registry and the lazily built root scope.
//! - Hand out isolated child scopes and count them.
//!
//! # Invariants
//! - The root scope is built at most once per factory, from the registry
//!   contents present at that moment.
//! - The registry is frozen in the same critical section that snapshots it.
//! - The root scope is never mutated after construction; children only hold
//!   a shared parent link.
//!
//! # See also
//! - `registry` for late-registration handling.

use crate::capability::{Function, Plugin, Protocol};
use crate::config::{LateRegistrationPolicy, RuntimeConfig};
use crate::metrics::{Counter, MAKE_SCOPE_COUNTER_HELP, MAKE_SCOPE_COUNTER_NAME};
use crate::registry::{CapabilityRegistry, RegistryError, RegistryInventory};
use crate::scope::Scope;
use log::{debug, error, info};
use once_cell::sync::OnceCell;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

pub struct ScopeFactory {
    registry: Mutex<CapabilityRegistry>,
    root: OnceCell<Arc<Scope>>,
    scopes_constructed: Counter,
    root_builds: Counter,
}

impl ScopeFactory {
    pub fn new() -> Self {
        Self::with_policy(LateRegistrationPolicy::default())
    }

    pub fn with_policy(late_policy: LateRegistrationPolicy) -> Self {
        Self {
            registry: Mutex::new(CapabilityRegistry::with_policy(late_policy)),
            root: OnceCell::new(),
            scopes_constructed: Counter::new(MAKE_SCOPE_COUNTER_NAME, MAKE_SCOPE_COUNTER_HELP),
            root_builds: Counter::new("vql_root_scope_builds", "Root scope constructions."),
        }
    }

    pub fn apply_config(&self, config: &RuntimeConfig) {
        self.lock_registry()
            .set_late_policy(config.late_registration);
    }

    /// Registers a plugin; panics when the name is already taken.
    pub fn register_plugin(&self, plugin: Arc<dyn Plugin>) {
        let result = self.try_register_plugin(plugin);
        fail_fast(result);
    }

    /// Registers a function; panics when the name is already taken.
    pub fn register_function(&self, function: Arc<dyn Function>) {
        let result = self.try_register_function(function);
        fail_fast(result);
    }

    /// Appends a protocol implementation.
    pub fn register_protocol(&self, protocol: Arc<dyn Protocol>) {
        let result = self.try_register_protocol(protocol);
        fail_fast(result);
    }

    pub fn try_register_plugin(&self, plugin: Arc<dyn Plugin>) -> Result<(), RegistryError> {
        self.lock_registry().register_plugin(plugin)
    }

    pub fn try_register_function(&self, function: Arc<dyn Function>) -> Result<(), RegistryError> {
        self.lock_registry().register_function(function)
    }

    pub fn try_register_protocol(&self, protocol: Arc<dyn Protocol>) -> Result<(), RegistryError> {
        self.lock_registry().register_protocol(protocol)
    }

    /// Seals the registry and returns the root scope, building it on first call.
    ///
    /// Idempotent; `make_scope` calls it implicitly.
    pub fn finalize(&self) -> &Arc<Scope> {
        self.root.get_or_init(|| self.build_root())
    }

    pub fn is_finalized(&self) -> bool {
        self.root.get().is_some()
    }

    /// Returns a fresh child of the root scope.
    pub fn make_scope(&self) -> Scope {
        let root = self.finalize();
        let scope = Scope::new_child(root);
        // Why: the counter reports scopes actually handed out, so it moves only
        // once derivation has produced one.
        let total = self.scopes_constructed.inc();
        debug!(
            "event=make_scope module=factory status=ok scope_id={} root_id={} total={total}",
            scope.id(),
            root.id()
        );
        scope
    }

    /// Number of scopes handed out by `make_scope`.
    pub fn scopes_constructed(&self) -> u64 {
        self.scopes_constructed.get()
    }

    pub fn scope_counter(&self) -> &Counter {
        &self.scopes_constructed
    }

    /// Number of root scope constructions; at most one.
    pub fn root_builds(&self) -> u64 {
        self.root_builds.get()
    }

    pub fn inventory(&self) -> RegistryInventory {
        self.lock_registry().inventory()
    }

    fn build_root(&self) -> Arc<Scope> {
        let started_at = Instant::now();
        let mut registry = self.lock_registry();

        let mut root = Scope::new();
        registry.populate(&mut root);
        registry.freeze();
        self.root_builds.inc();

        info!(
            "event=root_scope_build module=factory status=ok root_id={} plugins={} functions={} protocols={} duration_ms={}",
            root.id(),
            registry.plugin_count(),
            registry.function_count(),
            registry.protocol_count(),
            started_at.elapsed().as_millis()
        );
        Arc::new(root)
    }

    fn lock_registry(&self) -> MutexGuard<'_, CapabilityRegistry> {
        // Why: a panicking capability `info()` must not wedge every later
        // registration and scope build behind a poisoned lock. The registry
        // itself is only mutated after all checks pass, so its state stays valid.
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ScopeFactory {
    fn default() -> Self {
        Self::new()
    }
}

fn fail_fast(result: Result<(), RegistryError>) {
    if let Err(err) = result {
        error!(
            "event={} module=factory status=error error={err}",
            failure_event(&err)
        );
        // Why: silently overwriting would make the visible capability depend on
        // registration order across independent extensions.
        panic!("{err}");
    }
}

fn failure_event(err: &RegistryError) -> &'static str {
    match err {
        RegistryError::DuplicatePlugin(_) | RegistryError::DuplicateFunction(_) => {
            "registry_duplicate"
        }
        RegistryError::RegistryFrozen { .. } => "registry_late_register",
    }
}
