//! Test data builders for creating test objects

use filtergraph_rs::pipeline::{
    FilterInputs, FilterOperation, OperationError, PortDescriptor,
};
use filtergraph_rs::{FilterGraph, FilterRegistry, FilterType, ParamMap, Value};
use std::sync::Arc;

type OperationFn = dyn Fn(&ParamMap, &FilterInputs) -> Result<Value, OperationError> + Send + Sync;

/// Plugin operation backed by a closure
pub struct FnFilter {
    name: String,
    op: Box<OperationFn>,
}

impl FnFilter {
    pub fn new(
        name: &str,
        op: impl Fn(&ParamMap, &FilterInputs) -> Result<Value, OperationError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            op: Box::new(op),
        }
    }
}

impl FilterOperation for FnFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, params: &ParamMap, inputs: &FilterInputs) -> Result<Value, OperationError> {
        (self.op)(params, inputs)
    }
}

/// Plugin type with one required port per entry of `ports`
pub fn plugin_type(
    tag: &str,
    ports: &[&str],
    op: impl Fn(&ParamMap, &FilterInputs) -> Result<Value, OperationError> + Send + Sync + 'static,
) -> FilterType {
    ports.iter().fold(
        FilterType::plugin(tag, Arc::new(FnFilter::new(tag, op))),
        |ty, port| ty.with_port(PortDescriptor::owned(*port)),
    )
}

/// Built-ins plus a small file-processing set: `database` (source),
/// `fetch`/`thumb`/`meta` (one input) and `fileout` (sink without output).
pub fn file_pipeline_registry() -> Arc<FilterRegistry> {
    let mut registry = FilterRegistry::with_builtins();
    registry
        .register(plugin_type("database", &[], |_, _| Ok(Value::Float(1.0))))
        .unwrap();
    for tag in ["fetch", "thumb", "meta"] {
        registry
            .register(plugin_type(tag, &["in"], |_, inputs| {
                inputs.require(0, "in").cloned()
            }))
            .unwrap();
    }
    registry
        .register(
            plugin_type("fileout", &["in"], |_, inputs| {
                inputs.require(0, "in")?;
                Ok(Value::Null)
            })
            .without_output(),
        )
        .unwrap();
    Arc::new(registry)
}

/// Builder for creating test graphs
pub struct GraphBuilder {
    graph: FilterGraph,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::with_registry(Arc::new(FilterRegistry::with_builtins()))
    }

    pub fn with_registry(registry: Arc<FilterRegistry>) -> Self {
        Self {
            graph: FilterGraph::new(registry),
        }
    }

    pub fn node(mut self, tag: &str, name: &str) -> Self {
        self.graph.add_node(tag, name).unwrap();
        self
    }

    pub fn constant(mut self, name: &str, value: f64) -> Self {
        self.graph.add_node("const", name).unwrap();
        self.graph.set_param(name, "value", value).unwrap();
        self
    }

    pub fn edge(mut self, from: &str, to_port_spec: &str) -> Self {
        self.graph.connect(from, to_port_spec).unwrap();
        self
    }

    pub fn terminal(mut self, name: &str) -> Self {
        self.graph.mark_terminal(name).unwrap();
        self
    }

    pub fn build(self) -> FilterGraph {
        self.graph
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The file-processing scenario:
/// `database -> a0 -> {b0, c0}`, `b0 -> d0:in_a`, `c0 -> d0:in_b`, `d0 -> fileout`
pub fn file_pipeline() -> FilterGraph {
    GraphBuilder::with_registry(file_pipeline_registry())
        .node("database", "database")
        .node("fetch", "a0")
        .node("thumb", "b0")
        .node("meta", "c0")
        .node("add", "d0")
        .node("fileout", "fileout")
        .edge("database", "a0:in")
        .edge("a0", "b0:in")
        .edge("a0", "c0:in")
        .edge("b0", "d0:in_a")
        .edge("c0", "d0:in_b")
        .edge("d0", "fileout:in")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_builder() {
        let graph = GraphBuilder::new()
            .constant("k", 2.0)
            .node("neg", "n")
            .edge("k", "n:in")
            .terminal("n")
            .build();

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.edges().len(), 1);
        assert_eq!(graph.declared_terminals().len(), 1);
    }
}
