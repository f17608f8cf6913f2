//! Workspace: named contexts sharing one filter registry.
//!
//! Filter types are registered on a [`WorkspaceBuilder`]; `build()` freezes
//! the registry behind an `Arc`, so every context of the workspace sees the
//! same read-only set of types and registration during execution cannot
//! happen.
//!
//! ```text
//! Workspace ── Arc<FilterRegistry>
//!   ├── Context "main"   (graph + roots + eager backend)   ◄── active
//!   └── Context "gpu"    (graph + roots + program backend)
//! ```

pub mod context;
pub mod roots;

pub use context::{Backend, Context, ProgramRunner};
pub use roots::RootRegistry;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::expression::{ExpressionError, Generator};
use crate::pipeline::error::{GraphError, GraphResult};
use crate::pipeline::executor::EagerExecutor;
use crate::pipeline::filter_type::FilterType;
use crate::pipeline::id::NodeId;
use crate::pipeline::registry::{FilterModule, FilterRegistry};
use crate::state_space::{StateVector, StateVectorGenerator};
use crate::types::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Collects filter types and configuration before a workspace exists.
pub struct WorkspaceBuilder {
    registry: FilterRegistry,
    config: EngineConfig,
}

impl WorkspaceBuilder {
    pub fn new() -> Self {
        Self {
            registry: FilterRegistry::with_builtins(),
            config: EngineConfig::default(),
        }
    }

    /// Start from an empty registry instead of the built-ins.
    pub fn without_builtins(mut self) -> Self {
        self.registry = FilterRegistry::new();
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn register(mut self, ty: FilterType) -> GraphResult<Self> {
        self.registry.register(ty)?;
        Ok(self)
    }

    pub fn register_module(mut self, module: &dyn FilterModule) -> GraphResult<Self> {
        self.registry.register_module(module)?;
        Ok(self)
    }

    /// Freeze the registry and create the workspace with its default context.
    pub fn build(self) -> Workspace {
        Workspace::with_config(Arc::new(self.registry), self.config)
    }
}

impl Default for WorkspaceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A set of named contexts, one of which is active.
#[derive(Debug)]
pub struct Workspace {
    registry: Arc<FilterRegistry>,
    config: EngineConfig,
    contexts: BTreeMap<String, Context>,
    active: String,
}

impl Workspace {
    pub fn builder() -> WorkspaceBuilder {
        WorkspaceBuilder::new()
    }

    pub fn new(registry: Arc<FilterRegistry>) -> Self {
        Self::with_config(registry, EngineConfig::default())
    }

    /// Create a workspace holding one eager context named after
    /// `config.context.default_context`.
    pub fn with_config(registry: Arc<FilterRegistry>, config: EngineConfig) -> Self {
        let name = config.context.default_context.clone();
        let context = Context::with_config(
            name.clone(),
            Arc::clone(&registry),
            Backend::Eager(EagerExecutor::new(config.context.release_intermediates)),
            &config.context,
        );
        tracing::debug!(
            "Workspace created with {} filter types, default context '{}'",
            registry.len(),
            name
        );

        let mut contexts = BTreeMap::new();
        contexts.insert(name.clone(), context);
        Self {
            registry,
            config,
            contexts,
            active: name,
        }
    }

    pub fn registry(&self) -> &Arc<FilterRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Contexts ──

    /// Add a context with its own graph and roots.
    pub fn add_context(&mut self, name: &str, backend: Backend) -> GraphResult<&mut Context> {
        if self.contexts.contains_key(name) {
            return Err(GraphError::DuplicateContext(name.to_string()));
        }
        let context = Context::with_config(name, Arc::clone(&self.registry), backend, &self.config.context);
        tracing::debug!("Added context '{}' ({} backend)", name, context.backend().name());
        Ok(self.contexts.entry(name.to_string()).or_insert(context))
    }

    /// Remove a context. The active context cannot be removed.
    pub fn remove_context(&mut self, name: &str) -> GraphResult<Context> {
        if name == self.active {
            return Err(GraphError::InvalidName {
                name: name.to_string(),
                reason: "the active context cannot be removed".to_string(),
            });
        }
        self.contexts
            .remove(name)
            .ok_or_else(|| GraphError::UnknownContext(name.to_string()))
    }

    pub fn set_active(&mut self, name: &str) -> GraphResult<()> {
        if !self.contexts.contains_key(name) {
            return Err(GraphError::UnknownContext(name.to_string()));
        }
        tracing::debug!("Active context: '{}' -> '{}'", self.active, name);
        self.active = name.to_string();
        Ok(())
    }

    pub fn active_name(&self) -> &str {
        &self.active
    }

    pub fn context_names(&self) -> Vec<&str> {
        self.contexts.keys().map(String::as_str).collect()
    }

    pub fn context(&self, name: &str) -> GraphResult<&Context> {
        self.contexts
            .get(name)
            .ok_or_else(|| GraphError::UnknownContext(name.to_string()))
    }

    pub fn context_mut(&mut self, name: &str) -> GraphResult<&mut Context> {
        self.contexts
            .get_mut(name)
            .ok_or_else(|| GraphError::UnknownContext(name.to_string()))
    }

    pub fn active_context(&self) -> GraphResult<&Context> {
        self.context(&self.active)
    }

    pub fn active_context_mut(&mut self) -> GraphResult<&mut Context> {
        let active = self.active.clone();
        self.context_mut(&active)
    }

    // ── Delegates to the active context ──

    pub fn add_node(&mut self, tag: &str, name: &str) -> GraphResult<NodeId> {
        self.active_context_mut()?.add_node(tag, name)
    }

    pub fn remove_node(&mut self, name: &str) -> GraphResult<()> {
        self.active_context_mut()?.remove_node(name)
    }

    pub fn connect(&mut self, from: &str, to_port_spec: &str) -> GraphResult<()> {
        self.active_context_mut()?.connect(from, to_port_spec)
    }

    pub fn registry_add(&mut self, name: &str, value: impl Into<Value>) -> GraphResult<Option<Value>> {
        self.active_context_mut()?.registry_add(name, value)
    }

    /// Compile expression text into the active context's graph.
    pub fn compile(&mut self, text: &str) -> std::result::Result<Vec<String>, ExpressionError> {
        let context = self.active_context_mut()?;
        Generator::new().compile(text, context)
    }

    /// Run the active context's single terminal.
    pub fn execute(&mut self) -> Result<Value> {
        self.active_context_mut()?.execute()
    }

    pub fn execute_terminal(&mut self, terminal: &str) -> Result<Value> {
        self.active_context_mut()?.execute_terminal(terminal)
    }

    /// Replay the active context once per state vector.
    ///
    /// `bind` rebinds the context's roots for each vector before it runs.
    /// The first failure stops the sweep.
    pub fn replay<F>(&mut self, generator: &StateVectorGenerator, mut bind: F) -> Result<Vec<(usize, Value)>>
    where
        F: FnMut(&StateVector, &mut Context) -> Result<()>,
    {
        let context = self.active_context_mut()?;
        tracing::info!(
            "Replaying context '{}' over {} state vector(s) ({} mode)",
            context.name(),
            generator.len(),
            generator.mode()
        );

        let mut results = Vec::with_capacity(generator.len());
        for vector in generator {
            bind(&vector, context)?;
            let value = context.execute()?;
            results.push((vector.index, value));
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FilterGraphError;
    use crate::state_space::{StateSpace, TraversalMode};

    #[test]
    fn test_default_context() {
        let ws = Workspace::new(FilterRegistry::global());
        assert_eq!(ws.active_name(), "main");
        assert_eq!(ws.context_names(), vec!["main"]);
        assert!(ws.registry().contains("add"));
    }

    #[test]
    fn test_contexts() {
        let mut ws = Workspace::new(FilterRegistry::global());
        ws.add_context("alt", Backend::eager()).unwrap();
        assert!(matches!(
            ws.add_context("alt", Backend::eager()),
            Err(GraphError::DuplicateContext(_))
        ));
        assert!(matches!(ws.set_active("nope"), Err(GraphError::UnknownContext(_))));

        ws.add_node("const", "c").unwrap();
        ws.set_active("alt").unwrap();
        assert!(!ws.active_context().unwrap().has_node("c"));
        assert!(ws.context("main").unwrap().has_node("c"));

        assert!(ws.remove_context("alt").is_err());
        ws.set_active("main").unwrap();
        ws.remove_context("alt").unwrap();
    }

    #[test]
    fn test_builder_freezes_registry() {
        let ws = Workspace::builder()
            .without_builtins()
            .register_module(&crate::pipeline::registry::BuiltinModule)
            .unwrap()
            .build();
        assert_eq!(ws.registry().len(), FilterRegistry::with_builtins().len());
        assert!(Workspace::builder().register_module(&crate::pipeline::registry::BuiltinModule).is_err());
    }

    #[test]
    fn test_replay_rebinds_roots() {
        let mut ws = Workspace::new(FilterRegistry::global());
        ws.add_node("mult", "area").unwrap();
        ws.connect(":w", "area:in_a").unwrap();
        ws.connect(":h", "area:in_b").unwrap();

        let space = StateSpace::new()
            .with_axis("w", 2)
            .and_then(|s| s.with_axis("h", 3))
            .unwrap();
        let generator = StateVectorGenerator::new(&space, TraversalMode::Full).unwrap();

        let results = ws
            .replay(&generator, |v, ctx| {
                ctx.registry_add(":w", (v.coords[0] + 1) as f64)?;
                ctx.registry_add(":h", (v.coords[1] + 1) as f64)?;
                Ok(())
            })
            .unwrap();

        let areas: Vec<f64> = results.iter().filter_map(|(_, v)| v.as_float()).collect();
        assert_eq!(areas, vec![1.0, 2.0, 2.0, 4.0, 3.0, 6.0]);
    }

    #[test]
    fn test_replay_stops_on_failure() {
        let mut ws = Workspace::new(FilterRegistry::global());
        ws.add_node("neg", "n").unwrap();
        ws.connect(":x", "n:in").unwrap();

        let space = StateSpace::new().with_axis("x", 3).unwrap();
        let generator = StateVectorGenerator::new(&space, TraversalMode::Full).unwrap();
        let mut calls = 0;
        let err = ws
            .replay(&generator, |_, _| {
                calls += 1;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, FilterGraphError::Graph(GraphError::UnboundRoot(_))));
        assert_eq!(calls, 1);
    }
}
