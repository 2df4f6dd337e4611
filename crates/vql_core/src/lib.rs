//! Capability registry and scope bootstrap for the VQL runtime.
//! Extensions register plugins, functions and protocols at startup; every
//! query receives an isolated child of one shared root scope.

pub mod capability;
pub mod config;
pub mod factory;
pub mod global;
pub mod logging;
pub mod metrics;
pub mod registry;
pub mod scope;

pub use capability::{
    Args, CapabilityError, CapabilityInfo, CapabilityResult, Function, Plugin, Protocol,
};
pub use config::{ConfigError, LateRegistrationPolicy, RuntimeConfig};
pub use factory::ScopeFactory;
pub use global::{
    finalize, make_scope, register_function, register_plugin, register_protocol,
    scopes_constructed,
};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use metrics::Counter;
pub use registry::{CapabilityKind, CapabilityRegistry, RegistryError, RegistryInventory};
pub use scope::{Scope, ScopeId};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
