//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use filtergraph_rs::Value;

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Assert a value is a float approximately equal to `expected`
pub fn assert_value_float(value: &Value, expected: f64, epsilon: f64) {
    match value.as_float() {
        Some(actual) => assert_float_eq(actual, expected, epsilon),
        None => panic!("Expected a float value, got {:?}", value),
    }
}
