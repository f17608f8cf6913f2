//! Serialized graph form.
//!
//! `GraphDict` is the interchange structure for a graph: node names with
//! their type tag and parameter overrides, the connection list and the
//! declared terminals. Connections are sorted so that two graphs with the
//! same structure serialize identically whatever order they were built in.
//!
//! `order` records node registration order, which the planner uses to break
//! ties. Loading replays it, so a reloaded graph plans exactly like the
//! original. Nodes missing from `order` (hand-written dicts) are added
//! after the listed ones, by name.

use crate::pipeline::error::{GraphError, GraphResult};
use crate::pipeline::graph::FilterGraph;
use crate::pipeline::registry::FilterRegistry;
use crate::types::ParamMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// A node entry: its type and the parameters that differ from the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default, skip_serializing_if = "ParamMap::is_empty")]
    pub params: ParamMap,
}

/// An edge from a node or root to `to:port`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionSpec {
    pub from: String,
    pub to: String,
    pub port: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDict {
    pub nodes: BTreeMap<String, NodeSpec>,
    /// Node names in registration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<String>,
    #[serde(default)]
    pub connections: Vec<ConnectionSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub terminals: Vec<String>,
}

impl GraphDict {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl FilterGraph {
    /// Snapshot the graph's structure.
    pub fn to_dict(&self) -> GraphDict {
        let order = self.live_nodes().map(|(_, slot)| slot.name.clone()).collect();
        let nodes = self
            .live_nodes()
            .map(|(id, slot)| {
                let spec = NodeSpec {
                    type_tag: self.filter_type(id).tag().to_string(),
                    params: self.param_overrides(id),
                };
                (slot.name.clone(), spec)
            })
            .collect();

        let mut connections: Vec<ConnectionSpec> = self
            .edges()
            .into_iter()
            .map(|edge| ConnectionSpec {
                from: self.source_name(&edge.from).to_string(),
                to: self.name(edge.to_node).to_string(),
                port: self.filter_type(edge.to_node).ports()[edge.to_port]
                    .name
                    .to_string(),
            })
            .collect();
        connections.sort_by(|a, b| (&a.to, &a.port, &a.from).cmp(&(&b.to, &b.port, &b.from)));

        let terminals = self
            .declared_terminals()
            .iter()
            .map(|&t| self.name(t).to_string())
            .collect();

        GraphDict {
            nodes,
            order,
            connections,
            terminals,
        }
    }

    /// Rebuild a graph from its serialized form.
    ///
    /// Connections are inserted without the per-edge cycle check; a cyclic
    /// dict loads but fails to plan with `CyclicGraph`.
    pub fn from_dict(registry: Arc<FilterRegistry>, root_prefix: char, dict: &GraphDict) -> GraphResult<Self> {
        let mut graph = FilterGraph::with_root_prefix(registry, root_prefix);

        let listed: HashSet<&str> = dict.order.iter().map(String::as_str).collect();
        let unlisted = dict.nodes.keys().filter(|name| !listed.contains(name.as_str()));
        for name in dict.order.iter().chain(unlisted) {
            let spec = dict
                .nodes
                .get(name)
                .ok_or_else(|| GraphError::UnknownNode(name.clone()))?;
            graph.add_node(&spec.type_tag, name)?;
            for (param, value) in &spec.params {
                graph.set_param(name, param, value.clone())?;
            }
        }
        for conn in &dict.connections {
            graph.connect_unchecked(&conn.from, &format!("{}:{}", conn.to, conn.port))?;
        }
        for terminal in &dict.terminals {
            graph.mark_terminal(terminal)?;
        }

        tracing::debug!(
            "Loaded graph with {} nodes and {} connections",
            dict.nodes.len(),
            dict.connections.len()
        );
        Ok(graph)
    }
}
