//! Mock construction helpers

use filtergraph_rs::pipeline::EmittedProgram;
use filtergraph_rs::{ProgramRunner, Result, RootRegistry, Value};

mockall::mock! {
    pub Runner {}

    impl ProgramRunner for Runner {
        fn run(
            &self,
            program: &EmittedProgram,
            roots: &RootRegistry,
            platform: &str,
            device: &str,
        ) -> Result<Value>;
    }
}

/// A runner expecting exactly `calls` runs, each answered with `value`
pub fn runner_returning(value: f64, calls: usize) -> MockRunner {
    let mut runner = MockRunner::new();
    runner
        .expect_run()
        .times(calls)
        .returning(move |_, _, _, _| Ok(Value::Float(value)));
    runner
}
