//! Integration tests for expression compilation on both backends

mod common;

use common::assert_value_float;
use common::mock_helpers::{runner_returning, MockRunner};
use filtergraph_rs::{
    Backend, Context, ExpressionError, FilterRegistry, Generator, ScriptRunner, Value,
};
use proptest::prelude::*;

const SUM_OF_SQUARES: &str = "res = (a + b)^2 + (a - b)^2";

fn context(backend: Backend, a: f64, b: f64) -> Context {
    let mut ctx = Context::new("main", FilterRegistry::global(), backend);
    ctx.registry_add(":a", a).unwrap();
    ctx.registry_add(":b", b).unwrap();
    ctx
}

fn tolerance(expected: f64) -> f64 {
    1e-9 * (1.0 + expected.abs())
}

#[test]
fn test_program_backend_matches_eager() {
    let mut eager = context(Backend::eager(), 1.5, -4.0);
    let mut program = context(Backend::program(ScriptRunner::new(), "rhai", "cpu"), 1.5, -4.0);

    Generator::new().compile(SUM_OF_SQUARES, &mut eager).unwrap();
    Generator::new().compile(SUM_OF_SQUARES, &mut program).unwrap();

    let expected = (1.5f64 - 4.0).powi(2) + (1.5f64 + 4.0).powi(2);
    assert_value_float(&eager.execute().unwrap(), expected, tolerance(expected));
    assert_value_float(&program.execute().unwrap(), expected, tolerance(expected));

    let emitted = program.emit_program().unwrap();
    assert_eq!(emitted.terminal, "res");
    assert!(emitted.source().contains("fg_pow"));
    assert_eq!(emitted.inputs.len(), 2);
}

#[test]
fn test_indexing_on_both_backends() {
    let text = "p = compose(a, b)\nq = p * 2\nr = q[1] - q[0]";
    for backend in [Backend::eager(), Backend::program(ScriptRunner::new(), "rhai", "cpu")] {
        let mut ctx = context(backend, 3.0, 10.0);
        let created = Generator::new().compile(text, &mut ctx).unwrap();
        assert_eq!(created.iter().filter(|n| n.starts_with("decompose_")).count(), 2);
        assert_eq!(ctx.execute().unwrap(), Value::Float(14.0));
    }
}

#[test]
fn test_large_arrays_on_both_backends() {
    for backend in [Backend::eager(), Backend::program(ScriptRunner::new(), "rhai", "cpu")] {
        let mut ctx = Context::new("main", FilterRegistry::global(), backend);
        ctx.registry_add(":v", vec![4.0; 200_000]).unwrap();
        Generator::new().compile("s = sqrt(v) * 2", &mut ctx).unwrap();
        assert_eq!(ctx.execute().unwrap(), Value::Array(vec![4.0; 200_000]));
    }
}

#[test]
fn test_rebinding_roots_reuses_graph() {
    let mut ctx = context(Backend::eager(), 0.0, 0.0);
    Generator::new().compile(SUM_OF_SQUARES, &mut ctx).unwrap();
    for (a, b) in [(1.0, 2.0), (-3.0, 0.5), (10.0, 10.0)] {
        ctx.registry_add(":a", a).unwrap();
        ctx.registry_add(":b", b).unwrap();
        let expected = 2.0 * (a * a + b * b);
        assert_value_float(&ctx.execute().unwrap(), expected, tolerance(expected));
    }
}

#[test]
fn test_program_backend_with_mock_runner() {
    let mut ctx = context(Backend::program(runner_returning(7.0, 2), "opencl", "gpu0"), 1.0, 1.0);
    Generator::new().compile(SUM_OF_SQUARES, &mut ctx).unwrap();
    assert_eq!(ctx.execute().unwrap(), Value::Float(7.0));
    assert_eq!(ctx.execute_terminal("res").unwrap(), Value::Float(7.0));
}

#[test]
fn test_runner_sees_roots_and_fragments() {
    let mut runner = MockRunner::new();
    runner
        .expect_run()
        .withf(|program, roots, _, _| {
            program.fragments.len() == 7
                && program.inputs.iter().all(|i| roots.contains(&i.root))
        })
        .times(1)
        .returning(|_, roots, _, _| Ok(roots.get(":a").cloned().unwrap_or(Value::Null)));

    let mut ctx = context(Backend::program(runner, "rhai", "cpu"), 5.0, 6.0);
    Generator::new().compile(SUM_OF_SQUARES, &mut ctx).unwrap();
    assert_eq!(ctx.execute().unwrap(), Value::Float(5.0));
}

#[test]
fn test_failed_compile_leaves_graph_untouched() {
    let mut ctx = context(Backend::eager(), 1.0, 2.0);
    Generator::new().compile("s = a + b", &mut ctx).unwrap();
    let before = ctx.to_dict();

    let err = Generator::new().compile("t = s * c", &mut ctx).unwrap_err();
    assert!(matches!(err, ExpressionError::UnboundIdentifier { ref name, .. } if name == "c"));
    assert_eq!(ctx.to_dict(), before);

    // Later text can read earlier results by node name
    Generator::new().compile("t = s * 2", &mut ctx).unwrap();
    assert_eq!(ctx.execute_terminal("t").unwrap(), Value::Float(6.0));
}

proptest! {
    #[test]
    fn prop_sum_of_squares_eager(a in -1e3f64..1e3, b in -1e3f64..1e3) {
        let mut ctx = context(Backend::eager(), a, b);
        Generator::new().compile(SUM_OF_SQUARES, &mut ctx).unwrap();

        let expected = (a + b).powf(2.0) + (a - b).powf(2.0);
        let actual = ctx.execute().unwrap().as_float().unwrap();
        prop_assert!((actual - expected).abs() <= tolerance(expected));
    }

    #[test]
    fn prop_sum_of_squares_program(a in -1e3f64..1e3, b in -1e3f64..1e3) {
        let mut ctx = context(Backend::program(ScriptRunner::new(), "rhai", "cpu"), a, b);
        Generator::new().compile(SUM_OF_SQUARES, &mut ctx).unwrap();

        let expected = (a + b).powf(2.0) + (a - b).powf(2.0);
        let actual = ctx.execute().unwrap().as_float().unwrap();
        prop_assert!((actual - expected).abs() <= tolerance(expected));
    }
}
