//! Filter graph: nodes, port bindings and structural invariants.
//!
//! Nodes live in an arena (`Vec<NodeSlot>`) addressed by [`NodeId`]; a
//! name→id map resolves the string names callers use. Removing a node
//! leaves a tombstone so ids, and therefore registration order, stay stable.
//! Tombstones are only reclaimed by [`FilterGraph::compact`] or by reloading
//! the graph from its dict.
//!
//! Each input port holds at most one [`PortSource`]: either another node's
//! output or a root binding (a prefixed name such as `:a` whose value lives
//! in the owning context's registry). Every producer keeps the reverse list
//! of its consumers so cycle checks and removal never scan the whole graph.
//!
//! ```text
//! [:a] ──► add_0:in_a ─┐
//! [:b] ──► add_0:in_b  ├─► pow_0:in_a ──► res
//! [const_0] ───────────┘   pow_0:in_b
//! ```

use crate::pipeline::error::{GraphError, GraphResult};
use crate::pipeline::filter_type::FilterType;
use crate::pipeline::id::{FilterTypeId, NodeId};
use crate::pipeline::port::split_port_spec;
use crate::pipeline::registry::FilterRegistry;
use crate::types::{ParamMap, ParamValue};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

/// Default prefix distinguishing root names from node names.
pub const DEFAULT_ROOT_PREFIX: char = ':';

/// Where an input port reads its value from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PortSource {
    /// Output of another node.
    Node(NodeId),
    /// Externally supplied value, by its prefixed root name.
    Root(String),
}

/// An edge from a producer to one input port of a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: PortSource,
    pub to_node: NodeId,
    pub to_port: usize,
}

/// A node and its bindings.
#[derive(Debug, Clone)]
pub struct NodeSlot {
    pub name: String,
    pub type_id: FilterTypeId,
    pub params: ParamMap,
    /// One optional source per declared input port.
    pub inputs: Vec<Option<PortSource>>,
    /// `(consumer, port index)` pairs reading this node's output.
    pub consumers: Vec<(NodeId, usize)>,
    /// Whether this node has been removed (slot is empty).
    pub deleted: bool,
}

/// A directed acyclic graph of filter instances.
#[derive(Debug, Clone)]
pub struct FilterGraph {
    registry: Arc<FilterRegistry>,
    nodes: Vec<NodeSlot>,
    name_to_id: HashMap<String, NodeId>,
    /// Declared terminals, in the order they were marked.
    terminals: Vec<NodeId>,
    root_prefix: char,
    /// Bumped on every structural change; lets callers cache plans.
    generation: u64,
}

impl FilterGraph {
    pub fn new(registry: Arc<FilterRegistry>) -> Self {
        Self::with_root_prefix(registry, DEFAULT_ROOT_PREFIX)
    }

    pub fn with_root_prefix(registry: Arc<FilterRegistry>, root_prefix: char) -> Self {
        Self {
            registry,
            nodes: Vec::new(),
            name_to_id: HashMap::new(),
            terminals: Vec::new(),
            root_prefix,
            generation: 0,
        }
    }

    pub fn registry(&self) -> &Arc<FilterRegistry> {
        &self.registry
    }

    pub fn root_prefix(&self) -> char {
        self.root_prefix
    }

    pub fn is_root_name(&self, name: &str) -> bool {
        name.starts_with(self.root_prefix)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ── Nodes ──

    /// Instantiate filter type `tag` as a node called `name`.
    pub fn add_node(&mut self, tag: &str, name: &str) -> GraphResult<NodeId> {
        let type_id = self.registry.id_of(tag)?;
        self.validate_node_name(name)?;
        if self.name_to_id.contains_key(name) {
            return Err(GraphError::DuplicateNode(name.to_string()));
        }

        let ty = self.registry.get(type_id);
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeSlot {
            name: name.to_string(),
            type_id,
            params: ty.defaults().clone(),
            inputs: vec![None; ty.ports().len()],
            consumers: Vec::new(),
            deleted: false,
        });
        self.name_to_id.insert(name.to_string(), id);
        self.generation += 1;
        tracing::trace!("Added node '{}' ({}) as {}", name, tag, id);
        Ok(id)
    }

    fn validate_node_name(&self, name: &str) -> GraphResult<()> {
        let reason = if name.is_empty() {
            Some("node names cannot be empty".to_string())
        } else if self.is_root_name(name) {
            Some(format!("'{}' is reserved for root names", self.root_prefix))
        } else if name.contains(':') || name.chars().any(char::is_whitespace) {
            Some("node names cannot contain ':' or whitespace".to_string())
        } else {
            None
        };
        match reason {
            Some(reason) => Err(GraphError::InvalidName {
                name: name.to_string(),
                reason,
            }),
            None => Ok(()),
        }
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.name_to_id.contains_key(name)
    }

    /// Resolve a live node's id.
    pub fn node_id(&self, name: &str) -> GraphResult<NodeId> {
        self.name_to_id
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::UnknownNode(name.to_string()))
    }

    /// Get a node slot by id. Ids only come from this graph.
    pub fn node(&self, id: NodeId) -> &NodeSlot {
        &self.nodes[id.index()]
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.index()].name
    }

    pub fn filter_type(&self, id: NodeId) -> &FilterType {
        self.registry.get(self.nodes[id.index()].type_id)
    }

    /// Total number of slots, including removed ones.
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.name_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name_to_id.is_empty()
    }

    /// Live nodes in registration order.
    pub fn live_nodes(&self) -> impl Iterator<Item = (NodeId, &NodeSlot)> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.deleted)
            .map(|(i, slot)| (NodeId(i as u32), slot))
    }

    /// Remove a node and every edge touching it.
    pub fn remove_node(&mut self, name: &str) -> GraphResult<()> {
        let id = self.node_id(name)?;

        let inputs = std::mem::take(&mut self.nodes[id.index()].inputs);
        for source in inputs.into_iter().flatten() {
            if let PortSource::Node(producer) = source {
                self.nodes[producer.index()]
                    .consumers
                    .retain(|&(consumer, _)| consumer != id);
            }
        }

        let consumers = std::mem::take(&mut self.nodes[id.index()].consumers);
        for (consumer, port) in consumers {
            self.nodes[consumer.index()].inputs[port] = None;
        }

        let slot = &mut self.nodes[id.index()];
        slot.deleted = true;
        slot.params.clear();
        self.name_to_id.remove(name);
        self.terminals.retain(|&t| t != id);
        self.generation += 1;
        tracing::trace!("Removed node '{}' ({})", name, id);
        Ok(())
    }

    /// Drop the tombstones left by removed nodes.
    ///
    /// Live nodes are renumbered in registration order, so the planner's
    /// tie-breaks are unchanged, but `NodeId`s handed out earlier no longer
    /// apply.
    pub fn compact(&mut self) {
        let removed = self.nodes.len() - self.name_to_id.len();
        if removed == 0 {
            return;
        }

        let mut remap = vec![NodeId::default(); self.nodes.len()];
        for (new, (old, _)) in self.live_nodes().enumerate() {
            remap[old.index()] = NodeId(new as u32);
        }

        let slots = std::mem::take(&mut self.nodes);
        self.nodes = slots
            .into_iter()
            .filter(|slot| !slot.deleted)
            .map(|mut slot| {
                for source in slot.inputs.iter_mut().flatten() {
                    if let PortSource::Node(producer) = source {
                        *producer = remap[producer.index()];
                    }
                }
                for (consumer, _) in &mut slot.consumers {
                    *consumer = remap[consumer.index()];
                }
                slot
            })
            .collect();
        for id in self.name_to_id.values_mut() {
            *id = remap[id.index()];
        }
        for id in &mut self.terminals {
            *id = remap[id.index()];
        }
        self.generation += 1;
        tracing::debug!("Compacted graph, reclaimed {} removed slot(s)", removed);
    }

    // ── Edges ──

    /// Connect `from` (a node name or a root name) to the `node:port` spec.
    ///
    /// The port must be free, and the edge must not close a cycle. On any
    /// error the graph is left unchanged.
    pub fn connect(&mut self, from: &str, to_port_spec: &str) -> GraphResult<()> {
        self.connect_inner(from, to_port_spec, true)
    }

    /// Connect without the per-edge cycle check. Used by bulk loads; the
    /// planner still rejects cyclic graphs.
    pub(crate) fn connect_unchecked(&mut self, from: &str, to_port_spec: &str) -> GraphResult<()> {
        self.connect_inner(from, to_port_spec, false)
    }

    fn connect_inner(&mut self, from: &str, to_port_spec: &str, check_cycles: bool) -> GraphResult<()> {
        let (to_name, port_name) = self.resolve_port_spec(to_port_spec)?;
        let to = self.node_id(to_name)?;
        let port = self.filter_type(to).port_index(port_name).ok_or_else(|| {
            GraphError::UnknownPort {
                node: to_name.to_string(),
                port: port_name.to_string(),
            }
        })?;

        let source = if self.is_root_name(from) {
            PortSource::Root(from.to_string())
        } else {
            let producer = self.node_id(from)?;
            if !self.filter_type(producer).produces_output() {
                return Err(GraphError::NoOutput(from.to_string()));
            }
            PortSource::Node(producer)
        };

        if let Some(existing) = &self.nodes[to.index()].inputs[port] {
            return Err(GraphError::PortOccupied {
                node: to_name.to_string(),
                port: port_name.to_string(),
                source_name: self.source_name(existing).to_string(),
            });
        }

        if let PortSource::Node(producer) = source {
            if check_cycles && (producer == to || self.reaches(to, producer)) {
                return Err(GraphError::WouldCreateCycle {
                    from: from.to_string(),
                    node: to_name.to_string(),
                    port: port_name.to_string(),
                });
            }
            self.nodes[producer.index()].consumers.push((to, port));
        }

        self.nodes[to.index()].inputs[port] = Some(source);
        self.generation += 1;
        tracing::trace!("Connected '{}' -> '{}'", from, to_port_spec);
        Ok(())
    }

    /// Unbind a port, returning what it was bound to.
    pub fn disconnect(&mut self, to_port_spec: &str) -> GraphResult<Option<PortSource>> {
        let (to_name, port_name) = self.resolve_port_spec(to_port_spec)?;
        let to = self.node_id(to_name)?;
        let port = self.filter_type(to).port_index(port_name).ok_or_else(|| {
            GraphError::UnknownPort {
                node: to_name.to_string(),
                port: port_name.to_string(),
            }
        })?;

        let previous = self.nodes[to.index()].inputs[port].take();
        if let Some(PortSource::Node(producer)) = &previous {
            self.nodes[producer.index()]
                .consumers
                .retain(|&(consumer, p)| !(consumer == to && p == port));
        }
        if previous.is_some() {
            self.generation += 1;
        }
        Ok(previous)
    }

    fn resolve_port_spec<'s>(&self, spec: &'s str) -> GraphResult<(&'s str, &'s str)> {
        split_port_spec(spec).ok_or_else(|| GraphError::InvalidName {
            name: spec.to_string(),
            reason: "expected a 'node:port' spec".to_string(),
        })
    }

    /// Whether `to` is reachable from `from` following outgoing edges.
    pub fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![from];
        visited[from.index()] = true;

        while let Some(node) = stack.pop() {
            if node == to {
                return true;
            }
            for &(consumer, _) in &self.nodes[node.index()].consumers {
                if !visited[consumer.index()] {
                    visited[consumer.index()] = true;
                    stack.push(consumer);
                }
            }
        }
        false
    }

    /// Display name of a port source (node name or prefixed root name).
    pub fn source_name<'a>(&'a self, source: &'a PortSource) -> &'a str {
        match source {
            PortSource::Node(id) => self.name(*id),
            PortSource::Root(name) => name,
        }
    }

    /// Every edge, ordered by consumer registration and port.
    pub fn edges(&self) -> Vec<Edge> {
        self.live_nodes()
            .flat_map(|(id, slot)| {
                slot.inputs
                    .iter()
                    .enumerate()
                    .filter_map(move |(port, source)| {
                        source.as_ref().map(|from| Edge {
                            from: from.clone(),
                            to_node: id,
                            to_port: port,
                        })
                    })
            })
            .collect()
    }

    /// Root names referenced by any port.
    pub fn root_names(&self) -> BTreeSet<String> {
        self.live_nodes()
            .flat_map(|(_, slot)| slot.inputs.iter().flatten())
            .filter_map(|source| match source {
                PortSource::Root(name) => Some(name.clone()),
                PortSource::Node(_) => None,
            })
            .collect()
    }

    // ── Parameters ──

    /// Set a declared parameter. The value must match the default's type
    /// (integers widen to floats).
    pub fn set_param(&mut self, node: &str, param: &str, value: impl Into<ParamValue>) -> GraphResult<()> {
        let id = self.node_id(node)?;
        let value = value.into();
        let declared = self
            .filter_type(id)
            .defaults()
            .get(param)
            .ok_or_else(|| GraphError::UnknownParameter {
                node: node.to_string(),
                param: param.to_string(),
            })?;
        let coerced = value.coerce_to(declared).ok_or_else(|| GraphError::ParameterType {
            node: node.to_string(),
            param: param.to_string(),
            expected: declared.type_name(),
            got: value.type_name(),
        })?;
        self.nodes[id.index()].params.insert(param.to_string(), coerced);
        Ok(())
    }

    pub fn param(&self, node: &str, param: &str) -> GraphResult<&ParamValue> {
        let id = self.node_id(node)?;
        self.nodes[id.index()]
            .params
            .get(param)
            .ok_or_else(|| GraphError::UnknownParameter {
                node: node.to_string(),
                param: param.to_string(),
            })
    }

    pub fn params(&self, node: &str) -> GraphResult<&ParamMap> {
        self.node_id(node).map(|id| &self.nodes[id.index()].params)
    }

    /// Parameters that differ from the type's defaults.
    pub fn param_overrides(&self, id: NodeId) -> ParamMap {
        let defaults = self.filter_type(id).defaults();
        self.nodes[id.index()]
            .params
            .iter()
            .filter(|(k, v)| defaults.get(*k) != Some(*v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    // ── Terminals ──

    /// Declare `name` as a terminal. Once any terminal is declared, only
    /// declared terminals produce traversals.
    pub fn mark_terminal(&mut self, name: &str) -> GraphResult<()> {
        let id = self.node_id(name)?;
        if !self.terminals.contains(&id) {
            self.terminals.push(id);
            self.generation += 1;
        }
        Ok(())
    }

    pub fn unmark_terminal(&mut self, name: &str) -> GraphResult<()> {
        let id = self.node_id(name)?;
        let before = self.terminals.len();
        self.terminals.retain(|&t| t != id);
        if self.terminals.len() != before {
            self.generation += 1;
        }
        Ok(())
    }

    pub fn declared_terminals(&self) -> &[NodeId] {
        &self.terminals
    }

    /// Terminals used for planning: declared ones, or every sink when none
    /// are declared (in registration order).
    pub fn terminals(&self) -> Vec<NodeId> {
        if !self.terminals.is_empty() {
            return self.terminals.clone();
        }
        self.live_nodes()
            .filter(|(_, slot)| slot.consumers.is_empty())
            .map(|(id, _)| id)
            .collect()
    }

    /// Pretty-print the graph for debugging.
    pub fn dump(&self) -> String {
        let mut out = format!("=== FilterGraph ({} nodes) ===\n", self.len());
        for (id, slot) in self.live_nodes() {
            let ty = self.filter_type(id);
            let inputs: Vec<String> = ty
                .ports()
                .iter()
                .zip(&slot.inputs)
                .map(|(port, source)| match source {
                    Some(s) => format!("{}={}", port.name, self.source_name(s)),
                    None => format!("{}=?", port.name),
                })
                .collect();
            out.push_str(&format!(
                "  {} [{}]: {} <- [{}]\n",
                id,
                slot.name,
                ty.tag(),
                inputs.join(", ")
            ));
        }
        let terminals: Vec<&str> = self.terminals().into_iter().map(|t| self.name(t)).collect();
        out.push_str(&format!("  terminals: {:?}\n", terminals));
        out
    }
}

impl fmt::Display for FilterGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dump())
    }
}
