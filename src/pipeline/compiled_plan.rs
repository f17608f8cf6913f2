use crate::pipeline::id::NodeId;

/// One step of a traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalEntry {
    pub node: NodeId,
    pub name: String,
    /// Readers of this node's result within the traversal (+1 for the terminal)
    pub consumer_count: usize,
}

/// Topologically ordered execution of every ancestor of one terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Traversal {
    pub terminal: NodeId,
    pub entries: Vec<TraversalEntry>,
}

impl Traversal {
    /// Name of the terminal node (always the last entry).
    pub fn terminal_name(&self) -> &str {
        self.entries.last().map(|e| e.name.as_str()).unwrap_or_default()
    }

    /// `(node_name, consumer_count)` pairs in execution order.
    pub fn pairs(&self) -> Vec<(&str, usize)> {
        self.entries
            .iter()
            .map(|e| (e.name.as_str(), e.consumer_count))
            .collect()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Execution plan for a filter graph: one traversal per terminal.
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    /// Traversals in terminal order
    pub traversals: Vec<Traversal>,

    /// Live nodes that feed no terminal, in registration order
    pub unreachable: Vec<String>,

    /// Graph generation the plan was built from
    pub generation: u64,

    /// Build statistics
    pub stats: PlanStats,
}

/// Statistics about the built plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanStats {
    /// Live nodes in the graph
    pub total_nodes: usize,

    /// Nodes appearing in at least one traversal
    pub planned_nodes: usize,

    /// Nodes in no traversal
    pub unreachable_nodes: usize,

    /// Nodes without node-fed inputs
    pub source_nodes: usize,

    /// Number of traversals
    pub terminals: usize,

    /// Build time in microseconds
    pub build_time_us: u64,
}

impl ExecutionPlan {
    /// Check if the plan has any traversals
    pub fn is_empty(&self) -> bool {
        self.traversals.is_empty()
    }

    /// Traversal ending at the terminal called `name`.
    pub fn traversal(&self, name: &str) -> Option<&Traversal> {
        self.traversals.iter().find(|t| t.terminal_name() == name)
    }

    /// Names of the terminals, in traversal order.
    pub fn terminal_names(&self) -> Vec<&str> {
        self.traversals.iter().map(Traversal::terminal_name).collect()
    }
}
