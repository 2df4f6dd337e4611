//! Capability contracts consumed by the scope bootstrap.
//!
//! # Responsibility
//! - Define the minimal shape of plugins, functions and protocol
//!   implementations contributed by extension providers.
//! - Provide serializable descriptors for inventory/diagnostics output.
//!
//! # Invariants
//! - Capability objects are immutable once registered and shared as
//!   `Arc<dyn ...>` across threads.
//! - Plugin and function names live in disjoint namespaces.

use crate::scope::Scope;
use serde::Serialize;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Named arguments passed to a plugin or function call.
pub type Args = Map<String, Value>;

/// Result alias for capability execution.
pub type CapabilityResult<T> = Result<T, CapabilityError>;

/// Identifying descriptor for a named capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityInfo {
    pub name: String,
    pub description: String,
}

impl CapabilityInfo {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Row-producing capability invoked from query `FROM` clauses.
pub trait Plugin: Send + Sync {
    fn info(&self) -> CapabilityInfo;

    /// Runs the plugin against `scope` and returns the produced rows.
    fn call(&self, scope: &Scope, args: &Args) -> CapabilityResult<Vec<Value>>;
}

/// Scalar capability invoked from query expressions.
pub trait Function: Send + Sync {
    fn info(&self) -> CapabilityInfo;

    fn call(&self, scope: &Scope, args: &Args) -> CapabilityResult<Value>;
}

/// Cross-cutting protocol implementation (comparison, coercion, ...).
///
/// Dispatch lives in the query engine; this layer only needs a label for
/// diagnostics and must keep registration order.
pub trait Protocol: Send + Sync {
    fn name(&self) -> &str;
}

/// Capability execution errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    MissingArgument(String),
    InvalidArgument { name: String, reason: String },
    Execution(String),
}

impl Display for CapabilityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingArgument(name) => write!(f, "missing required argument: {name}"),
            Self::InvalidArgument { name, reason } => {
                write!(f, "argument `{name}` is invalid: {reason}")
            }
            Self::Execution(message) => write!(f, "capability execution failed: {message}"),
        }
    }
}

impl Error for CapabilityError {}
