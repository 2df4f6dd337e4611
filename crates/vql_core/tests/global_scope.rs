use serde_json::{json, Value};
use std::sync::Arc;
use vql_core::{
    Args, CapabilityInfo, CapabilityResult, Function, Plugin, Protocol, Scope,
};

struct Info;

impl Plugin for Info {
    fn info(&self) -> CapabilityInfo {
        CapabilityInfo::new("info", "Get information about the running host.")
    }

    fn call(&self, _scope: &Scope, _args: &Args) -> CapabilityResult<Vec<Value>> {
        Ok(vec![json!({ "OS": std::env::consts::OS })])
    }
}

struct Len;

impl Function for Len {
    fn info(&self) -> CapabilityInfo {
        CapabilityInfo::new("len", "Length of a list or string.")
    }

    fn call(&self, _scope: &Scope, args: &Args) -> CapabilityResult<Value> {
        let len = match args.get("list") {
            Some(Value::Array(items)) => items.len(),
            Some(Value::String(text)) => text.chars().count(),
            _ => 0,
        };
        Ok(json!(len))
    }
}

struct EqProtocol;

impl Protocol for EqProtocol {
    fn name(&self) -> &str {
        "eq"
    }
}

struct Dup;

impl Plugin for Dup {
    fn info(&self) -> CapabilityInfo {
        CapabilityInfo::new("dup_check", "Registered twice on purpose.")
    }

    fn call(&self, _scope: &Scope, _args: &Args) -> CapabilityResult<Vec<Value>> {
        Ok(vec![])
    }
}

// Only this test derives scopes from the process-wide factory.
#[test]
fn process_wide_registration_feeds_every_scope() {
    vql_core::register_plugin(Arc::new(Info));
    vql_core::register_function(Arc::new(Len));
    vql_core::register_protocol(Arc::new(EqProtocol));

    let mut query = vql_core::make_scope();
    let other = vql_core::make_scope();
    assert_eq!(vql_core::scopes_constructed(), 2);

    query.set_var("rows", json!([1, 2, 3]));
    assert!(other.resolve("rows").is_none());

    let mut args = Args::new();
    args.insert("list".to_string(), query.resolve("rows").cloned().expect("bound"));
    let len = other.function("len").expect("len function");
    assert_eq!(len.call(&other, &args).expect("len call"), json!(3));

    assert!(other.plugin("info").is_some());
    assert_eq!(other.protocols().len(), 1);
    assert!(Arc::ptr_eq(
        vql_core::finalize(),
        query.parent().expect("child of root")
    ));
    assert_eq!(vql_core::global::factory().root_builds(), 1);
}

#[test]
#[should_panic(expected = "multiple plugins defined: dup_check")]
fn process_wide_duplicate_is_fatal() {
    vql_core::register_plugin(Arc::new(Dup));
    vql_core::register_plugin(Arc::new(Dup));
}
