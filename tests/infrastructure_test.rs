//! Test to verify test infrastructure works correctly

mod common;

use common::builders::{plugin_type, GraphBuilder};
use filtergraph_rs::{FilterRegistry, Value};

#[test]
fn test_infrastructure_setup() {
    // Test that builders work
    let graph = GraphBuilder::new()
        .constant("k", 1.0)
        .node("abs", "a")
        .edge("k", "a:in")
        .build();

    assert_eq!(graph.len(), 2);
    assert!(graph.has_node("a"));
}

#[test]
fn test_plugin_helper_registers() {
    let mut registry = FilterRegistry::new();
    registry
        .register(plugin_type("twice", &["in"], |_, inputs| {
            let x = inputs.require(0, "in")?.as_float().unwrap_or(0.0);
            Ok(Value::Float(2.0 * x))
        }))
        .unwrap();
    assert_eq!(registry.lookup("twice").unwrap().ports().len(), 1);
}

#[test]
fn test_float_comparison() {
    common::assert_float_eq(1.0, 1.0000001, 0.001);
}

#[test]
#[should_panic]
fn test_float_comparison_fails() {
    common::assert_float_eq(1.0, 2.0, 0.001);
}
