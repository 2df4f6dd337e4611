//! CLI smoke entry point.
//!
//! # Responsibility
//! - Exercise registration, root bootstrap and scope derivation end to end.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `vql_cli [config.json]`

use log::info;
use serde_json::{json, Value};
use std::process::ExitCode;
use std::sync::Arc;
use vql_core::{
    Args, CapabilityError, CapabilityInfo, CapabilityResult, Function, Plugin, Protocol,
    RuntimeConfig, Scope,
};

struct GlobPlugin;

impl Plugin for GlobPlugin {
    fn info(&self) -> CapabilityInfo {
        CapabilityInfo::new("glob", "Retrieve files based on a list of glob expressions.")
    }

    fn call(&self, _scope: &Scope, args: &Args) -> CapabilityResult<Vec<Value>> {
        let globs = args
            .get("globs")
            .and_then(Value::as_array)
            .ok_or_else(|| CapabilityError::MissingArgument("globs".to_string()))?;
        Ok(globs.iter().map(|glob| json!({ "Glob": glob })).collect())
    }
}

struct GlobFunction;

impl Function for GlobFunction {
    fn info(&self) -> CapabilityInfo {
        CapabilityInfo::new("glob", "Return the glob pattern bound in scope.")
    }

    fn call(&self, scope: &Scope, _args: &Args) -> CapabilityResult<Value> {
        Ok(scope.resolve("pattern").cloned().unwrap_or(Value::Null))
    }
}

struct EqProtocol;

impl Protocol for EqProtocol {
    fn name(&self) -> &str {
        "eq"
    }
}

fn main() -> ExitCode {
    let config = match std::env::args().nth(1) {
        Some(path) => match RuntimeConfig::from_json_file(&path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("vql_cli: {err}");
                return ExitCode::FAILURE;
            }
        },
        None => RuntimeConfig::default(),
    };
    if let Err(err) = vql_core::init_logging(&config.log_level, config.log_target()) {
        eprintln!("vql_cli: {err}");
        return ExitCode::FAILURE;
    }
    vql_core::global::configure(&config);

    vql_core::register_plugin(Arc::new(GlobPlugin));
    vql_core::register_function(Arc::new(GlobFunction));
    vql_core::register_protocol(Arc::new(EqProtocol));

    let mut first = vql_core::make_scope();
    let second = vql_core::make_scope();
    first.set_var("pattern", json!("/etc/*"));
    info!(
        "event=cli_smoke module=cli status=ok first={} second={}",
        first.id(),
        second.id()
    );

    println!("vql_core version={}", vql_core::core_version());
    println!("vql_make_scope={}", vql_core::scopes_constructed());
    println!(
        "isolated={}",
        first.resolve("pattern").is_some() && second.resolve("pattern").is_none()
    );
    match serde_json::to_string_pretty(&vql_core::global::inventory()) {
        Ok(inventory) => println!("{inventory}"),
        Err(err) => {
            eprintln!("vql_cli: failed to render inventory: {err}");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}
