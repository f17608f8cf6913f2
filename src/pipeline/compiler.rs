use super::compiled_plan::{ExecutionPlan, PlanStats, Traversal, TraversalEntry};
use super::error::{GraphError, GraphResult};
use super::graph::{FilterGraph, PortSource};
use super::id::NodeId;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Compiles a filter graph into an execution plan
pub struct PlanCompiler;

impl PlanCompiler {
    /// Compile a filter graph into one traversal per terminal.
    ///
    /// The whole graph is checked for cycles first, so a graph loaded in
    /// bulk (bypassing the per-connect check) can never be planned while
    /// cyclic. Each traversal then covers exactly the ancestors of its
    /// terminal, in topological order with ties broken by registration
    /// order.
    ///
    /// # Errors
    /// `CyclicGraph` with the names of every node left unsorted.
    pub fn compile(graph: &FilterGraph) -> GraphResult<ExecutionPlan> {
        let start_time = std::time::Instant::now();
        let n = graph.capacity();

        let live: Vec<bool> = (0..n)
            .map(|i| !graph.node(NodeId(i as u32)).deleted)
            .collect();

        // Global Kahn pass over every live node
        let sorted = Self::topological_sort(graph, &live);
        let live_count = live.iter().filter(|&&l| l).count();
        if sorted.len() != live_count {
            let mut placed = vec![false; n];
            for id in &sorted {
                placed[id.index()] = true;
            }
            let cyclic: Vec<String> = graph
                .live_nodes()
                .filter(|(id, _)| !placed[id.index()])
                .map(|(_, slot)| slot.name.clone())
                .collect();
            tracing::error!("Cannot plan graph, cycle through {:?}", cyclic);
            return Err(GraphError::CyclicGraph(cyclic));
        }

        let terminals = graph.terminals();
        let mut planned = vec![false; n];
        let mut traversals = Vec::with_capacity(terminals.len());

        for &terminal in &terminals {
            let ancestors = Self::ancestors(graph, terminal);
            let order = Self::topological_sort(graph, &ancestors);
            let entries = Self::count_consumers(graph, &order, &ancestors, terminal);
            for entry in &entries {
                planned[entry.node.index()] = true;
            }
            traversals.push(Traversal { terminal, entries });
        }

        let unreachable: Vec<String> = graph
            .live_nodes()
            .filter(|(id, _)| !planned[id.index()])
            .map(|(_, slot)| slot.name.clone())
            .collect();
        if !unreachable.is_empty() {
            tracing::warn!(
                "{} node(s) feed no terminal and will not run: {:?}",
                unreachable.len(),
                unreachable
            );
        }

        let source_nodes = graph
            .live_nodes()
            .filter(|(_, slot)| {
                !slot
                    .inputs
                    .iter()
                    .flatten()
                    .any(|s| matches!(s, PortSource::Node(_)))
            })
            .count();
        let planned_nodes = planned.iter().filter(|&&p| p).count();

        let stats = PlanStats {
            total_nodes: live_count,
            planned_nodes,
            unreachable_nodes: unreachable.len(),
            source_nodes,
            terminals: traversals.len(),
            build_time_us: start_time.elapsed().as_micros() as u64,
        };
        tracing::debug!(
            "Built plan: {} traversal(s), {}/{} nodes planned in {}us",
            stats.terminals,
            stats.planned_nodes,
            stats.total_nodes,
            stats.build_time_us
        );

        Ok(ExecutionPlan {
            traversals,
            unreachable,
            generation: graph.generation(),
            stats,
        })
    }

    /// Kahn's algorithm over the nodes in `include`.
    ///
    /// The ready set is a min-heap on node id, so whenever several nodes
    /// are ready the earliest registered one goes first.
    fn topological_sort(graph: &FilterGraph, include: &[bool]) -> Vec<NodeId> {
        let n = include.len();
        let mut in_degree = vec![0usize; n];

        for i in 0..n {
            if !include[i] {
                continue;
            }
            for &(consumer, _) in &graph.node(NodeId(i as u32)).consumers {
                if include[consumer.index()] {
                    in_degree[consumer.index()] += 1;
                }
            }
        }

        let mut ready: BinaryHeap<Reverse<NodeId>> = (0..n)
            .filter(|&i| include[i] && in_degree[i] == 0)
            .map(|i| Reverse(NodeId(i as u32)))
            .collect();
        let mut result = Vec::new();

        while let Some(Reverse(node)) = ready.pop() {
            result.push(node);

            for &(consumer, _) in &graph.node(node).consumers {
                let c = consumer.index();
                if !include[c] {
                    continue;
                }
                in_degree[c] -= 1;
                if in_degree[c] == 0 {
                    ready.push(Reverse(consumer));
                }
            }
        }

        result
    }

    /// The terminal and every node it transitively reads from.
    fn ancestors(graph: &FilterGraph, terminal: NodeId) -> Vec<bool> {
        let mut reachable = vec![false; graph.capacity()];
        let mut stack = vec![terminal];
        reachable[terminal.index()] = true;

        while let Some(node) = stack.pop() {
            for source in graph.node(node).inputs.iter().flatten() {
                if let PortSource::Node(producer) = source {
                    if !reachable[producer.index()] {
                        reachable[producer.index()] = true;
                        stack.push(*producer);
                    }
                }
            }
        }

        reachable
    }

    /// Annotate an ordered traversal with consumer counts.
    fn count_consumers(
        graph: &FilterGraph,
        order: &[NodeId],
        include: &[bool],
        terminal: NodeId,
    ) -> Vec<TraversalEntry> {
        order
            .iter()
            .map(|&node| {
                let slot = graph.node(node);
                let readers = slot
                    .consumers
                    .iter()
                    .filter(|(consumer, _)| include[consumer.index()])
                    .count();
                TraversalEntry {
                    node,
                    name: slot.name.clone(),
                    consumer_count: readers + usize::from(node == terminal),
                }
            })
            .collect()
    }
}

impl ExecutionPlan {
    /// Build the plan for `graph`. See [`PlanCompiler::compile`].
    pub fn build(graph: &FilterGraph) -> GraphResult<Self> {
        PlanCompiler::compile(graph)
    }
}
