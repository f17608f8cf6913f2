//! Execution contexts.
//!
//! A [`Context`] owns one graph, the root values it reads and the backend
//! that runs it. The execution plan is cached and rebuilt only when the
//! graph's generation changes.

use crate::config::ContextConfig;
use crate::error::Result;
use crate::pipeline::compiled_plan::{ExecutionPlan, Traversal};
use crate::pipeline::dict::GraphDict;
use crate::pipeline::emitter::{EmittedProgram, ProgramEmitter};
use crate::pipeline::error::{GraphError, GraphResult};
use crate::pipeline::executor::EagerExecutor;
use crate::pipeline::graph::FilterGraph;
use crate::pipeline::id::NodeId;
use crate::pipeline::registry::FilterRegistry;
use crate::types::{ParamValue, Value};
use crate::workspace::roots::RootRegistry;
use std::fmt;
use std::sync::Arc;

/// External compile-and-run step of the program-emitting backend.
///
/// `platform` and `device` are opaque selectors handed through untouched.
#[cfg_attr(test, mockall::automock)]
pub trait ProgramRunner: Send {
    fn run(&self, program: &EmittedProgram, roots: &RootRegistry, platform: &str, device: &str) -> Result<Value>;
}

/// How a context turns a traversal into a value.
pub enum Backend {
    /// Invoke each node's operation in plan order
    Eager(EagerExecutor),
    /// Emit one fused program and hand it to a runner
    Program {
        runner: Box<dyn ProgramRunner>,
        platform: String,
        device: String,
    },
}

impl Backend {
    pub fn eager() -> Self {
        Backend::Eager(EagerExecutor::default())
    }

    pub fn program(
        runner: impl ProgramRunner + 'static,
        platform: impl Into<String>,
        device: impl Into<String>,
    ) -> Self {
        Backend::Program {
            runner: Box::new(runner),
            platform: platform.into(),
            device: device.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Backend::Eager(_) => "eager",
            Backend::Program { .. } => "program",
        }
    }

    fn run(&self, graph: &FilterGraph, roots: &RootRegistry, traversal: &Traversal) -> Result<Value> {
        match self {
            Backend::Eager(executor) => Ok(executor.run(graph, traversal, roots)?),
            Backend::Program {
                runner,
                platform,
                device,
            } => {
                let program = ProgramEmitter::emit(graph, traversal)?;
                runner.run(&program, roots, platform, device)
            }
        }
    }
}

impl Default for Backend {
    fn default() -> Self {
        Self::eager()
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Eager(executor) => f.debug_tuple("Eager").field(executor).finish(),
            Backend::Program {
                platform, device, ..
            } => f
                .debug_struct("Program")
                .field("platform", platform)
                .field("device", device)
                .finish_non_exhaustive(),
        }
    }
}

/// A named scope owning one graph and one root registry.
#[derive(Debug)]
pub struct Context {
    name: String,
    graph: FilterGraph,
    roots: RootRegistry,
    backend: Backend,
    /// Cached plan, valid while its generation matches the graph's
    plan: Option<ExecutionPlan>,
}

impl Context {
    pub fn new(name: impl Into<String>, registry: Arc<FilterRegistry>, backend: Backend) -> Self {
        Self::with_config(name, registry, backend, &ContextConfig::default())
    }

    pub fn with_config(
        name: impl Into<String>,
        registry: Arc<FilterRegistry>,
        backend: Backend,
        config: &ContextConfig,
    ) -> Self {
        Self {
            name: name.into(),
            graph: FilterGraph::with_root_prefix(registry, config.root_prefix),
            roots: RootRegistry::new(config.root_prefix),
            backend,
            plan: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn graph(&self) -> &FilterGraph {
        &self.graph
    }

    pub fn roots(&self) -> &RootRegistry {
        &self.roots
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn set_backend(&mut self, backend: Backend) {
        tracing::debug!("Context '{}' switched to {} backend", self.name, backend.name());
        self.backend = backend;
    }

    // ── Graph ──

    /// Add a node; its name must not clash with a bound root.
    pub fn add_node(&mut self, tag: &str, name: &str) -> GraphResult<NodeId> {
        if self.roots.contains(&self.roots.root_name(name)) {
            return Err(GraphError::NameConflict(name.to_string()));
        }
        self.graph.add_node(tag, name)
    }

    pub fn remove_node(&mut self, name: &str) -> GraphResult<()> {
        self.graph.remove_node(name)
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.graph.has_node(name)
    }

    /// Reclaim the slots of removed nodes. See [`FilterGraph::compact`].
    pub fn compact(&mut self) {
        self.graph.compact();
        self.plan = None;
    }

    /// Fresh node name of the form `{base}_{n}`, lowest free `n` first,
    /// clashing with neither a node nor a bound root.
    pub fn unique_name(&self, base: &str) -> String {
        (0..)
            .map(|n| format!("{}_{}", base, n))
            .find(|candidate| {
                !self.graph.has_node(candidate) && !self.roots.contains(&self.roots.root_name(candidate))
            })
            .unwrap_or_else(|| base.to_string())
    }

    pub fn connect(&mut self, from: &str, to_port_spec: &str) -> GraphResult<()> {
        self.graph.connect(from, to_port_spec)
    }

    pub fn disconnect(&mut self, to_port_spec: &str) -> GraphResult<()> {
        self.graph.disconnect(to_port_spec).map(|_| ())
    }

    pub fn set_param(&mut self, node: &str, param: &str, value: impl Into<ParamValue>) -> GraphResult<()> {
        self.graph.set_param(node, param, value)
    }

    pub fn mark_terminal(&mut self, name: &str) -> GraphResult<()> {
        self.graph.mark_terminal(name)
    }

    // ── Roots ──

    /// Bind a root value. Re-binding replaces the previous value.
    pub fn registry_add(&mut self, name: &str, value: impl Into<Value>) -> GraphResult<Option<Value>> {
        let bare = self.roots.bare_name(name);
        if self.graph.has_node(bare) {
            return Err(GraphError::NameConflict(bare.to_string()));
        }
        self.roots.insert(name, value.into())
    }

    pub fn registry_remove(&mut self, name: &str) -> GraphResult<Value> {
        self.roots.remove(name)
    }

    pub fn registry_get(&self, name: &str) -> Option<&Value> {
        self.roots.get(name)
    }

    pub fn registry_keys(&self) -> Vec<String> {
        self.roots.keys().map(str::to_string).collect()
    }

    pub fn registry_clear(&mut self) {
        self.roots.clear();
    }

    // ── Planning and execution ──

    /// The current plan, rebuilt if the graph changed since the last build.
    pub fn plan(&mut self) -> GraphResult<&ExecutionPlan> {
        let generation = self.graph.generation();
        if let Some(plan) = self.plan.take().filter(|p| p.generation == generation) {
            return Ok(self.plan.insert(plan));
        }
        let plan = ExecutionPlan::build(&self.graph)?;
        tracing::debug!(
            "Context '{}' replanned: {} traversal(s) (gen {})",
            self.name,
            plan.traversals.len(),
            generation
        );
        Ok(self.plan.insert(plan))
    }

    /// Run the graph's single terminal.
    pub fn execute(&mut self) -> Result<Value> {
        let traversal = self.single_traversal()?;
        self.backend.run(&self.graph, &self.roots, &traversal)
    }

    /// Run the traversal ending at `terminal`.
    pub fn execute_terminal(&mut self, terminal: &str) -> Result<Value> {
        let traversal = self.named_traversal(terminal)?;
        self.backend.run(&self.graph, &self.roots, &traversal)
    }

    /// Run every traversal, returning `(terminal, value)` pairs in plan order.
    pub fn execute_all(&mut self) -> Result<Vec<(String, Value)>> {
        let traversals = self.plan()?.traversals.clone();
        traversals
            .iter()
            .map(|t| {
                self.backend
                    .run(&self.graph, &self.roots, t)
                    .map(|v| (t.terminal_name().to_string(), v))
            })
            .collect()
    }

    /// Emit the program for the single terminal without running it.
    pub fn emit_program(&mut self) -> Result<EmittedProgram> {
        let traversal = self.single_traversal()?;
        Ok(ProgramEmitter::emit(&self.graph, &traversal)?)
    }

    fn single_traversal(&mut self) -> GraphResult<Traversal> {
        let plan = self.plan()?;
        match plan.traversals.as_slice() {
            [] => Err(GraphError::NoTerminal),
            [only] => Ok(only.clone()),
            many => Err(GraphError::AmbiguousTerminal(
                many.iter().map(|t| t.terminal_name().to_string()).collect(),
            )),
        }
    }

    fn named_traversal(&mut self, terminal: &str) -> GraphResult<Traversal> {
        self.plan()?
            .traversal(terminal)
            .cloned()
            .ok_or_else(|| GraphError::UnreachableTerminal(terminal.to_string()))
    }

    // ── Serialization ──

    pub fn to_dict(&self) -> GraphDict {
        self.graph.to_dict()
    }

    /// Replace the graph with the one described by `dict`. On error the
    /// current graph is kept.
    pub fn load_dict(&mut self, dict: &GraphDict) -> GraphResult<()> {
        if let Some(name) = dict
            .nodes
            .keys()
            .find(|name| self.roots.contains(&self.roots.root_name(name)))
        {
            return Err(GraphError::NameConflict(name.clone()));
        }
        let graph = FilterGraph::from_dict(
            Arc::clone(self.graph.registry()),
            self.graph.root_prefix(),
            dict,
        )?;
        self.graph = graph;
        self.plan = None;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(self.to_dict().to_json()?)
    }

    pub fn load_json(&mut self, json: &str) -> Result<()> {
        let dict = GraphDict::from_json(json)?;
        Ok(self.load_dict(&dict)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FilterGraphError;

    fn context() -> Context {
        Context::new("main", Arc::new(FilterRegistry::with_builtins()), Backend::eager())
    }

    fn sum_graph(ctx: &mut Context) {
        ctx.add_node("add", "sum").unwrap();
        ctx.connect(":a", "sum:in_a").unwrap();
        ctx.connect(":b", "sum:in_b").unwrap();
        ctx.registry_add(":a", 2.0).unwrap();
        ctx.registry_add(":b", 3.0).unwrap();
    }

    #[test]
    fn test_eager_execute() {
        let mut ctx = context();
        sum_graph(&mut ctx);
        assert_eq!(ctx.execute().unwrap(), Value::Float(5.0));

        ctx.registry_add(":b", 10.0).unwrap();
        assert_eq!(ctx.execute().unwrap(), Value::Float(12.0));
    }

    #[test]
    fn test_name_conflicts_both_directions() {
        let mut ctx = context();
        ctx.add_node("const", "a").unwrap();
        assert!(matches!(ctx.registry_add(":a", 1.0), Err(GraphError::NameConflict(_))));

        ctx.registry_add(":b", 1.0).unwrap();
        assert!(matches!(ctx.add_node("const", "b"), Err(GraphError::NameConflict(_))));
    }

    #[test]
    fn test_unique_name_skips_roots() {
        let mut ctx = context();
        ctx.add_node("add", "add_0").unwrap();
        ctx.registry_add(":add_1", 1.0).unwrap();
        assert_eq!(ctx.unique_name("add"), "add_2");
        assert_eq!(ctx.unique_name("sub"), "sub_0");
    }

    #[test]
    fn test_terminal_selection() {
        let mut ctx = context();
        assert!(matches!(
            ctx.execute(),
            Err(FilterGraphError::Graph(GraphError::NoTerminal))
        ));

        ctx.add_node("const", "one").unwrap();
        ctx.add_node("const", "two").unwrap();
        ctx.set_param("two", "value", 2.0).unwrap();
        assert!(matches!(
            ctx.execute(),
            Err(FilterGraphError::Graph(GraphError::AmbiguousTerminal(_)))
        ));
        assert_eq!(ctx.execute_terminal("two").unwrap(), Value::Float(2.0));
        assert!(matches!(
            ctx.execute_terminal("three"),
            Err(FilterGraphError::Graph(GraphError::UnreachableTerminal(_)))
        ));

        let all = ctx.execute_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], ("one".to_string(), Value::Float(0.0)));
    }

    #[test]
    fn test_plan_cached_until_graph_changes() {
        let mut ctx = context();
        sum_graph(&mut ctx);
        let first = ctx.plan().unwrap().generation;
        assert_eq!(ctx.plan().unwrap().generation, first);
        ctx.add_node("neg", "n").unwrap();
        assert_ne!(ctx.plan().unwrap().generation, first);
    }

    #[test]
    fn test_program_backend_passes_selectors_through() {
        let mut runner = MockProgramRunner::new();
        runner
            .expect_run()
            .withf(|program, roots, platform, device| {
                program.terminal == "sum" && roots.len() == 2 && platform == "opencl" && device == "gpu0"
            })
            .times(1)
            .returning(|_, _, _, _| Ok(Value::Float(42.0)));

        let mut ctx = context();
        sum_graph(&mut ctx);
        ctx.set_backend(Backend::program(runner, "opencl", "gpu0"));
        assert_eq!(ctx.execute().unwrap(), Value::Float(42.0));
    }

    #[test]
    fn test_load_dict_keeps_graph_on_error() {
        let mut ctx = context();
        sum_graph(&mut ctx);
        let mut dict = ctx.to_dict();
        dict.nodes.get_mut("sum").unwrap().type_tag = "grad".into();
        assert!(ctx.load_dict(&dict).is_err());
        assert!(ctx.has_node("sum"));

        let json = ctx.to_json().unwrap();
        ctx.load_json(&json).unwrap();
        assert_eq!(ctx.execute().unwrap(), Value::Float(5.0));
    }

    #[test]
    fn test_emit_program() {
        let mut ctx = context();
        sum_graph(&mut ctx);
        let program = ctx.emit_program().unwrap();
        assert_eq!(program.inputs.len(), 2);
        assert_eq!(program.fragments[0].code, "fg_add(r_a, r_b)");
    }
}
