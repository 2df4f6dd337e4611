//! In-process counters read by the embedding metrics exporter.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic, label-free counter.
#[derive(Debug)]
pub struct Counter {
    name: &'static str,
    help: &'static str,
    value: AtomicU64,
}

impl Counter {
    pub const fn new(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            help,
            value: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn help(&self) -> &'static str {
        self.help
    }

    /// Increments by one and returns the new value.
    pub fn inc(&self) -> u64 {
        self.value.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Counter incremented once per derived scope.
pub const MAKE_SCOPE_COUNTER_NAME: &str = "vql_make_scope";
pub const MAKE_SCOPE_COUNTER_HELP: &str = "Total number of Scope objects constructed.";
