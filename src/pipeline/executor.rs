//! Eager traversal executor.
//!
//! Runs one traversal in plan order:
//! 1. Gather each input from an upstream result or the root registry.
//! 2. Invoke the node's operation with its parameters.
//! 3. Store the result with its consumer count.
//! 4. Hand the result to each reader; the last reader takes it by move.
//!
//! A failing node aborts the traversal and every stored result is dropped
//! with the executor's scratch state.

use crate::pipeline::compiled_plan::Traversal;
use crate::pipeline::error::{GraphError, GraphResult};
use crate::pipeline::graph::{FilterGraph, PortSource};
use crate::pipeline::id::NodeId;
use crate::pipeline::node::FilterInputs;
use crate::types::Value;
use crate::workspace::roots::RootRegistry;
use std::time::Instant;

/// A node result waiting for its remaining readers.
#[derive(Debug)]
struct StoredResult {
    value: Value,
    remaining: usize,
}

/// Counters from one eager run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    pub nodes_executed: usize,
    /// Largest number of results held at once
    pub peak_retained: usize,
    pub elapsed_us: u64,
}

/// Executes traversals by invoking each node's operation directly.
#[derive(Debug, Clone)]
pub struct EagerExecutor {
    release_intermediates: bool,
}

impl Default for EagerExecutor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl EagerExecutor {
    /// `release_intermediates = false` keeps every result until the run
    /// ends (useful when debugging a graph).
    pub fn new(release_intermediates: bool) -> Self {
        Self {
            release_intermediates,
        }
    }

    /// Run `traversal` and return the terminal's value.
    pub fn run(&self, graph: &FilterGraph, traversal: &Traversal, roots: &RootRegistry) -> GraphResult<Value> {
        self.run_with_stats(graph, traversal, roots).map(|(value, _)| value)
    }

    pub fn run_with_stats(
        &self,
        graph: &FilterGraph,
        traversal: &Traversal,
        roots: &RootRegistry,
    ) -> GraphResult<(Value, ExecutionStats)> {
        let start = Instant::now();
        let mut results: Vec<Option<StoredResult>> = Vec::new();
        results.resize_with(graph.capacity(), || None);
        let mut stats = ExecutionStats::default();
        let mut retained = 0usize;

        tracing::debug!(
            "Executing traversal to '{}' ({} nodes)",
            traversal.terminal_name(),
            traversal.len()
        );

        for entry in &traversal.entries {
            let slot = graph.node(entry.node);
            let ty = graph.filter_type(entry.node);

            let mut values = Vec::with_capacity(ty.ports().len());
            for (port, source) in ty.ports().iter().zip(&slot.inputs) {
                let value = match source {
                    None if port.is_required() => {
                        return Err(GraphError::UnboundPort {
                            node: slot.name.clone(),
                            port: port.name.to_string(),
                        });
                    }
                    None => None,
                    Some(PortSource::Root(name)) => Some(
                        roots
                            .get(name)
                            .cloned()
                            .ok_or_else(|| GraphError::UnboundRoot(name.clone()))?,
                    ),
                    Some(PortSource::Node(producer)) => {
                        let value = self.take_input(&mut results, *producer).ok_or_else(|| {
                            GraphError::UnboundPort {
                                node: slot.name.clone(),
                                port: port.name.to_string(),
                            }
                        })?;
                        if results[producer.index()].is_none() {
                            retained -= 1;
                        }
                        Some(value)
                    }
                };
                values.push(value);
            }

            let output = ty
                .filter()
                .execute(&slot.params, &FilterInputs::new(values))
                .map_err(|source| {
                    tracing::debug!("Node '{}' failed: {}", slot.name, source);
                    GraphError::OperationFailed {
                        node: slot.name.clone(),
                        source,
                    }
                })?;
            stats.nodes_executed += 1;
            tracing::trace!("Node '{}' -> {}", slot.name, output.kind_name());

            if entry.consumer_count > 0 {
                results[entry.node.index()] = Some(StoredResult {
                    value: output,
                    remaining: entry.consumer_count,
                });
                retained += 1;
                stats.peak_retained = stats.peak_retained.max(retained);
            }
        }

        // The terminal's own +1 is the final read.
        let value = self
            .take_input(&mut results, traversal.terminal)
            .unwrap_or_default();
        stats.elapsed_us = start.elapsed().as_micros() as u64;
        tracing::debug!(
            "Traversal to '{}' finished: {} nodes in {}us",
            traversal.terminal_name(),
            stats.nodes_executed,
            stats.elapsed_us
        );
        Ok((value, stats))
    }

    /// Read a stored result, releasing it on its last read.
    fn take_input(&self, results: &mut [Option<StoredResult>], producer: NodeId) -> Option<Value> {
        let slot = &mut results[producer.index()];
        let stored = slot.as_mut()?;
        if stored.remaining <= 1 && self.release_intermediates {
            return slot.take().map(|s| s.value);
        }
        stored.remaining = stored.remaining.saturating_sub(1);
        Some(stored.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::compiled_plan::ExecutionPlan;
    use crate::pipeline::registry::FilterRegistry;
    use std::sync::Arc;

    fn graph() -> FilterGraph {
        FilterGraph::new(Arc::new(FilterRegistry::with_builtins()))
    }

    fn roots(pairs: &[(&str, f64)]) -> RootRegistry {
        let mut roots = RootRegistry::default();
        for (name, v) in pairs {
            roots.insert(name, Value::Float(*v)).unwrap();
        }
        roots
    }

    #[test]
    fn test_fan_out_releases_after_last_reader() {
        // :x → sq → {a, b} → sum
        let mut g = graph();
        g.add_node("sqrt", "sq").unwrap();
        g.add_node("abs", "a").unwrap();
        g.add_node("neg", "b").unwrap();
        g.add_node("add", "sum").unwrap();
        g.connect(":x", "sq:in").unwrap();
        g.connect("sq", "a:in").unwrap();
        g.connect("sq", "b:in").unwrap();
        g.connect("a", "sum:in_a").unwrap();
        g.connect("b", "sum:in_b").unwrap();

        let plan = ExecutionPlan::build(&g).unwrap();
        let (value, stats) = EagerExecutor::default()
            .run_with_stats(&g, &plan.traversals[0], &roots(&[(":x", 16.0)]))
            .unwrap();
        assert_eq!(value, Value::Float(0.0));
        assert_eq!(stats.nodes_executed, 4);
        // sq is released before sum runs; at most {a, b} or {sq, a} live.
        assert_eq!(stats.peak_retained, 2);
    }

    #[test]
    fn test_keep_intermediates() {
        let mut g = graph();
        g.add_node("sqrt", "sq").unwrap();
        g.add_node("abs", "a").unwrap();
        g.connect(":x", "sq:in").unwrap();
        g.connect("sq", "a:in").unwrap();

        let plan = ExecutionPlan::build(&g).unwrap();
        let (value, stats) = EagerExecutor::new(false)
            .run_with_stats(&g, &plan.traversals[0], &roots(&[(":x", 9.0)]))
            .unwrap();
        assert_eq!(value, Value::Float(3.0));
        assert_eq!(stats.peak_retained, 2);
    }

    #[test]
    fn test_unbound_port_and_root() {
        let mut g = graph();
        g.add_node("add", "sum").unwrap();
        g.connect(":a", "sum:in_a").unwrap();
        let plan = ExecutionPlan::build(&g).unwrap();
        let err = EagerExecutor::default()
            .run(&g, &plan.traversals[0], &roots(&[(":a", 1.0)]))
            .unwrap_err();
        assert!(matches!(err, GraphError::UnboundPort { port, .. } if port == "in_b"));

        g.connect(":b", "sum:in_b").unwrap();
        let plan = ExecutionPlan::build(&g).unwrap();
        let err = EagerExecutor::default()
            .run(&g, &plan.traversals[0], &roots(&[(":a", 1.0)]))
            .unwrap_err();
        assert!(matches!(err, GraphError::UnboundRoot(name) if name == ":b"));
    }

    #[test]
    fn test_operation_failure_names_node() {
        let mut g = graph();
        g.add_node("decompose", "pick").unwrap();
        g.set_param("pick", "index", 5_i64).unwrap();
        g.connect(":v", "pick:in").unwrap();
        let plan = ExecutionPlan::build(&g).unwrap();

        let mut r = RootRegistry::default();
        r.insert(":v", Value::Array(vec![1.0, 2.0])).unwrap();
        let err = EagerExecutor::default()
            .run(&g, &plan.traversals[0], &r)
            .unwrap_err();
        assert!(matches!(err, GraphError::OperationFailed { node, .. } if node == "pick"));
    }
}
