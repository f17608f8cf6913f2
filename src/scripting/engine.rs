//! Rhai engine backing the program-emitting backend.

use crate::config::ScriptConfig;
use crate::error::{FilterGraphError, Result, ResultExt};
use crate::pipeline::emitter::EmittedProgram;
use crate::pipeline::error::GraphError;
use crate::pipeline::nodes::arithmetic::{broadcast, map_value};
use crate::pipeline::nodes::{BinaryOp, UnaryOp};
use crate::scripting::{create_shared_cache, dynamic_to_value, value_to_dynamic, SharedScriptCache};
use crate::types::Value;
use crate::workspace::context::ProgramRunner;
use crate::workspace::roots::RootRegistry;
use rhai::{Array, Dynamic, Engine, EvalAltResult, Position, Scope};

type FnResult = std::result::Result<Dynamic, Box<EvalAltResult>>;

fn runtime_error(message: impl std::fmt::Display) -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorRuntime(
        message.to_string().into(),
        Position::NONE,
    ))
}

fn operand(value: Dynamic) -> std::result::Result<Value, Box<EvalAltResult>> {
    dynamic_to_value(value).map_err(runtime_error)
}

/// Runs emitted programs on an embedded Rhai engine
pub struct ScriptRunner {
    /// The Rhai engine instance
    engine: Engine,
    /// Cache of compiled programs
    cache: SharedScriptCache,
}

impl ScriptRunner {
    /// Create a runner with default limits
    pub fn new() -> Self {
        Self::with_config(&ScriptConfig::default())
    }

    /// Create a runner with the given limits
    pub fn with_config(config: &ScriptConfig) -> Self {
        Self::with_cache(config, create_shared_cache())
    }

    /// Create a runner sharing a program cache with other runners
    pub fn with_cache(config: &ScriptConfig, cache: SharedScriptCache) -> Self {
        let mut engine = Engine::new();
        Self::configure_engine(&mut engine, config);
        Self { engine, cache }
    }

    /// Configure the Rhai engine with the filter functions and safety limits
    fn configure_engine(engine: &mut Engine, config: &ScriptConfig) {
        // Set safety limits
        engine.set_max_expr_depths(config.max_expr_depth, config.max_expr_depth);
        engine.set_max_call_levels(config.max_call_levels);
        engine.set_max_operations(config.max_operations);
        engine.set_max_string_size(config.max_string_size);
        engine.set_max_array_size(config.max_array_size);

        for &op in BinaryOp::all() {
            engine.register_fn(format!("fg_{}", op.tag()), move |a: Dynamic, b: Dynamic| -> FnResult {
                let (a, b) = (operand(a)?, operand(b)?);
                broadcast(&a, &b, op.symbol(), |x, y| op.apply(x, y))
                    .map(|v| value_to_dynamic(&v))
                    .map_err(runtime_error)
            });
        }

        for &op in UnaryOp::all() {
            engine.register_fn(format!("fg_{}", op.tag()), move |x: Dynamic| -> FnResult {
                map_value(&operand(x)?, op.tag(), |v| op.apply(v))
                    .map(|v| value_to_dynamic(&v))
                    .map_err(runtime_error)
            });
        }

        engine.register_fn("fg_compose", |parts: Array| -> FnResult {
            let values = parts
                .into_iter()
                .map(operand)
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(value_to_dynamic(&Value::compose(values)))
        });

        engine.register_fn("fg_decompose", |source: Dynamic, index: i64| -> FnResult {
            let source = operand(source)?;
            usize::try_from(index)
                .ok()
                .and_then(|i| source.component(i))
                .map(|v| value_to_dynamic(&v))
                .ok_or_else(|| {
                    runtime_error(format!(
                        "component {} out of range for value with {} components",
                        index,
                        source.component_count()
                    ))
                })
        });
    }

    /// Get the program cache
    pub fn cache(&self) -> &SharedScriptCache {
        &self.cache
    }

    /// Compile (or fetch from cache) and evaluate a program with the given roots
    pub fn eval(&self, program: &EmittedProgram, roots: &RootRegistry) -> Result<Value> {
        let source = program.source();
        let compiled = {
            let mut cache = self
                .cache
                .write()
                .map_err(|_| FilterGraphError::Script("Program cache lock poisoned".to_string()))?;
            cache.get_or_compile(&self.engine, &program.terminal, &source)?
        };

        let mut scope = Scope::new();
        for input in &program.inputs {
            let value = roots
                .get(&input.root)
                .ok_or_else(|| GraphError::UnboundRoot(input.root.clone()))?;
            scope.push_dynamic(input.var.clone(), value_to_dynamic(value));
        }

        let result = self
            .engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, compiled.ast())
            .with_context(|| format!("Program for '{}' failed", program.terminal))?;
        dynamic_to_value(result)
    }
}

impl Default for ScriptRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramRunner for ScriptRunner {
    fn run(&self, program: &EmittedProgram, roots: &RootRegistry, platform: &str, device: &str) -> Result<Value> {
        tracing::info!(
            platform = platform,
            device = device,
            "Running program for '{}' ({} fragments)",
            program.terminal,
            program.fragments.len()
        );
        self.eval(program, roots)
    }
}
