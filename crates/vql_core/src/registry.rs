//! Capability registry populated by extension providers at startup.
//!
//! # Responsibility
//! - Collect plugins, functions and protocol implementations keyed the way
//!   the scope expects them.
//! - Reject identity collisions before they can shadow each other.
//!
//! # Invariants
//! - Plugin names are unique; function names are unique; the two namespaces
//!   are disjoint.
//! - Protocol implementations keep exact registration order.
//! - Once frozen, the registry either ignores or rejects further writes
//!   according to [`LateRegistrationPolicy`].

use crate::capability::{CapabilityInfo, Function, Plugin, Protocol};
use crate::config::LateRegistrationPolicy;
use crate::scope::Scope;
use log::{debug, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Capability kind used in logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityKind {
    Plugin,
    Function,
    Protocol,
}

impl CapabilityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plugin => "plugin",
            Self::Function => "function",
            Self::Protocol => "protocol",
        }
    }
}

/// Registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    DuplicatePlugin(String),
    DuplicateFunction(String),
    RegistryFrozen {
        kind: CapabilityKind,
        name: String,
    },
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicatePlugin(name) => write!(f, "multiple plugins defined: {name}"),
            Self::DuplicateFunction(name) => write!(f, "multiple functions defined: {name}"),
            Self::RegistryFrozen { kind, name } => write!(
                f,
                "{} `{name}` registered after the root scope was built",
                kind.as_str()
            ),
        }
    }
}

impl Error for RegistryError {}

/// Serializable listing of registered capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryInventory {
    pub plugins: Vec<CapabilityInfo>,
    pub functions: Vec<CapabilityInfo>,
    pub protocols: Vec<String>,
}

/// Process-lifetime capability tables.
#[derive(Default)]
pub struct CapabilityRegistry {
    plugins: BTreeMap<String, Arc<dyn Plugin>>,
    functions: BTreeMap<String, Arc<dyn Function>>,
    protocols: Vec<Arc<dyn Protocol>>,
    frozen: bool,
    late_policy: LateRegistrationPolicy,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(late_policy: LateRegistrationPolicy) -> Self {
        Self {
            late_policy,
            ..Self::default()
        }
    }

    pub fn set_late_policy(&mut self, late_policy: LateRegistrationPolicy) {
        self.late_policy = late_policy;
    }

    /// Registers one plugin keyed by its descriptor name.
    pub fn register_plugin(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), RegistryError> {
        let name = plugin.info().name;
        if self.plugins.contains_key(name.as_str()) {
            return Err(RegistryError::DuplicatePlugin(name));
        }
        self.check_frozen(CapabilityKind::Plugin, &name)?;

        debug!("event=registry_register module=registry status=ok kind=plugin name={name}");
        self.plugins.insert(name, plugin);
        Ok(())
    }

    /// Registers one function keyed by its descriptor name.
    pub fn register_function(&mut self, function: Arc<dyn Function>) -> Result<(), RegistryError> {
        let name = function.info().name;
        if self.functions.contains_key(name.as_str()) {
            return Err(RegistryError::DuplicateFunction(name));
        }
        self.check_frozen(CapabilityKind::Function, &name)?;

        debug!("event=registry_register module=registry status=ok kind=function name={name}");
        self.functions.insert(name, function);
        Ok(())
    }

    /// Appends one protocol implementation.
    ///
    /// Only fails when the registry is frozen under the `reject` policy.
    pub fn register_protocol(&mut self, protocol: Arc<dyn Protocol>) -> Result<(), RegistryError> {
        self.check_frozen(CapabilityKind::Protocol, protocol.name())?;

        debug!(
            "event=registry_register module=registry status=ok kind=protocol name={} position={}",
            protocol.name(),
            self.protocols.len()
        );
        self.protocols.push(protocol);
        Ok(())
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Marks the registry as consumed by a root scope build.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Copies every registered capability into `scope`.
    pub fn populate(&self, scope: &mut Scope) {
        for plugin in self.plugins.values() {
            scope.append_plugin(Arc::clone(plugin));
        }
        for protocol in &self.protocols {
            scope.add_protocol_impl(Arc::clone(protocol));
        }
        for function in self.functions.values() {
            scope.append_function(Arc::clone(function));
        }
    }

    pub fn len(&self) -> usize {
        self.plugins.len() + self.functions.len() + self.protocols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns sorted plugin names.
    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins.keys().cloned().collect()
    }

    /// Returns sorted function names.
    pub fn function_names(&self) -> Vec<String> {
        self.functions.keys().cloned().collect()
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn protocol_count(&self) -> usize {
        self.protocols.len()
    }

    pub fn inventory(&self) -> RegistryInventory {
        RegistryInventory {
            plugins: self.plugins.values().map(|plugin| plugin.info()).collect(),
            functions: self
                .functions
                .values()
                .map(|function| function.info())
                .collect(),
            protocols: self
                .protocols
                .iter()
                .map(|protocol| protocol.name().to_string())
                .collect(),
        }
    }

    fn check_frozen(&self, kind: CapabilityKind, name: &str) -> Result<(), RegistryError> {
        if !self.frozen {
            return Ok(());
        }
        match self.late_policy {
            LateRegistrationPolicy::Ignore => {
                warn!(
                    "event=registry_late_register module=registry status=ignored kind={} name={name}",
                    kind.as_str()
                );
                Ok(())
            }
            LateRegistrationPolicy::Reject => Err(RegistryError::RegistryFrozen {
                kind,
                name: name.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CapabilityKind, CapabilityRegistry, RegistryError};
    use crate::capability::{
        Args, CapabilityInfo, CapabilityResult, Function, Plugin, Protocol,
    };
    use crate::config::LateRegistrationPolicy;
    use crate::scope::Scope;
    use serde_json::Value;
    use std::sync::Arc;

    struct MockPlugin(&'static str);

    impl Plugin for MockPlugin {
        fn info(&self) -> CapabilityInfo {
            CapabilityInfo::new(self.0, "mock plugin")
        }

        fn call(&self, _scope: &Scope, _args: &Args) -> CapabilityResult<Vec<Value>> {
            Ok(vec![])
        }
    }

    struct MockFunction(&'static str);

    impl Function for MockFunction {
        fn info(&self) -> CapabilityInfo {
            CapabilityInfo::new(self.0, "mock function")
        }

        fn call(&self, _scope: &Scope, _args: &Args) -> CapabilityResult<Value> {
            Ok(Value::Null)
        }
    }

    struct MockProtocol(&'static str);

    impl Protocol for MockProtocol {
        fn name(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn rejects_duplicate_plugin_name() {
        let mut registry = CapabilityRegistry::new();
        registry
            .register_plugin(Arc::new(MockPlugin("glob")))
            .expect("first registration should succeed");
        let err = registry
            .register_plugin(Arc::new(MockPlugin("glob")))
            .expect_err("duplicate registration must fail");
        assert_eq!(err, RegistryError::DuplicatePlugin("glob".to_string()));
    }

    #[test]
    fn plugin_and_function_namespaces_are_disjoint() {
        let mut registry = CapabilityRegistry::new();
        registry
            .register_plugin(Arc::new(MockPlugin("glob")))
            .expect("plugin registration");
        registry
            .register_function(Arc::new(MockFunction("glob")))
            .expect("function with same name should register");
        assert_eq!(registry.plugin_names(), vec!["glob".to_string()]);
        assert_eq!(registry.function_names(), vec!["glob".to_string()]);

        let err = registry
            .register_function(Arc::new(MockFunction("glob")))
            .expect_err("duplicate function must fail");
        assert_eq!(err, RegistryError::DuplicateFunction("glob".to_string()));
    }

    #[test]
    fn keys_on_descriptor_name_as_given() {
        let mut registry = CapabilityRegistry::new();
        assert!(registry.is_empty());
        for name in ["Artifact.Linux.Sys", "parse-csv", "", "a", " a"] {
            registry
                .register_plugin(Arc::new(MockPlugin(name)))
                .expect("any distinct descriptor name should register");
        }
        assert_eq!(registry.plugin_count(), 5);
        assert_eq!(registry.len(), 5);

        let err = registry
            .register_plugin(Arc::new(MockPlugin("Artifact.Linux.Sys")))
            .expect_err("exact duplicate must fail");
        assert_eq!(
            err,
            RegistryError::DuplicatePlugin("Artifact.Linux.Sys".to_string())
        );

        let mut scope = Scope::new();
        registry.populate(&mut scope);
        assert!(scope.plugin("Artifact.Linux.Sys").is_some());
        assert!(scope.plugin(" a").is_some());
        assert_eq!(scope.plugin_names().len(), 5);
    }

    #[test]
    fn protocols_keep_registration_order() {
        let mut registry = CapabilityRegistry::new();
        for name in ["eq", "lt", "eq"] {
            registry
                .register_protocol(Arc::new(MockProtocol(name)))
                .expect("protocols never collide");
        }
        assert_eq!(registry.protocol_count(), 3);
        assert_eq!(registry.inventory().protocols, vec!["eq", "lt", "eq"]);
    }

    #[test]
    fn frozen_registry_ignores_by_default_and_rejects_when_configured() {
        let mut registry = CapabilityRegistry::new();
        registry.freeze();
        assert!(registry.is_frozen());
        registry
            .register_plugin(Arc::new(MockPlugin("late")))
            .expect("ignore policy accepts late registration");

        registry.set_late_policy(LateRegistrationPolicy::Reject);
        let err = registry
            .register_protocol(Arc::new(MockProtocol("late_protocol")))
            .expect_err("reject policy refuses late registration");
        assert_eq!(
            err,
            RegistryError::RegistryFrozen {
                kind: CapabilityKind::Protocol,
                name: "late_protocol".to_string(),
            }
        );
    }

    #[test]
    fn populate_copies_all_capabilities_into_scope() {
        let mut registry = CapabilityRegistry::new();
        registry
            .register_plugin(Arc::new(MockPlugin("info")))
            .expect("plugin");
        registry
            .register_function(Arc::new(MockFunction("count")))
            .expect("function");
        registry
            .register_protocol(Arc::new(MockProtocol("eq")))
            .expect("protocol");

        let mut scope = Scope::new();
        registry.populate(&mut scope);
        assert!(scope.plugin("info").is_some());
        assert!(scope.function("count").is_some());
        assert_eq!(scope.protocols().len(), 1);
    }

    #[test]
    fn inventory_serializes_descriptors() {
        let mut registry = CapabilityRegistry::new();
        registry
            .register_plugin(Arc::new(MockPlugin("info")))
            .expect("plugin");
        let json = serde_json::to_value(registry.inventory()).expect("inventory serializes");
        assert_eq!(json["plugins"][0]["name"], "info");
        assert_eq!(json["functions"], serde_json::json!([]));
    }
}
