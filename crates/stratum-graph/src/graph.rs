//! Directed dependency graph over artifact names.
//!
//! Edge `(a, b)` means "b depends on a": a must build before b, and a change
//! to a marks b affected. The wrapper keeps a deterministic name-to-index
//! map so traversals and derived plans are reproducible for a given input.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default)]
pub struct DepGraph {
    graph: DiGraph<String, ()>,
    index: BTreeMap<String, NodeIndex>,
}

impl DepGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from edges plus isolated nodes.
    pub fn from_parts<'a>(
        edges: impl IntoIterator<Item = (&'a str, &'a str)>,
        nodes: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut graph = Self::new();
        for (from, to) in edges {
            graph.add_edge(from, to);
        }
        for node in nodes {
            graph.add_node(node);
        }
        graph
    }

    /// Add a node if not present. Idempotent.
    pub fn add_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.index.insert(name.to_string(), idx);
        idx
    }

    /// Add an edge `from -> to`, creating endpoints as needed. Idempotent.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        let from_idx = self.add_node(from);
        let to_idx = self.add_node(to);
        if self.graph.find_edge(from_idx, to_idx).is_none() {
            self.graph.add_edge(from_idx, to_idx, ());
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        match (self.index.get(from), self.index.get(to)) {
            (Some(&f), Some(&t)) => self.graph.find_edge(f, t).is_some(),
            _ => false,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Node names in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.graph.node_indices().map(move |i| self.graph[i].as_str())
    }

    /// All edges as `(from, to)` name pairs, sorted.
    pub fn edges(&self) -> BTreeSet<(String, String)> {
        self.graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .map(|(f, t)| (self.graph[f].clone(), self.graph[t].clone()))
            .collect()
    }

    pub fn index_of(&self, name: &str) -> Option<NodeIndex> {
        self.index.get(name).copied()
    }

    pub fn name_of(&self, idx: NodeIndex) -> &str {
        self.graph[idx].as_str()
    }

    /// Direct predecessors (dependencies that must build first).
    pub fn predecessors(&self, name: &str) -> BTreeSet<String> {
        match self.index.get(name) {
            Some(&idx) => self
                .graph
                .neighbors_directed(idx, Direction::Incoming)
                .map(|i| self.graph[i].clone())
                .collect(),
            None => BTreeSet::new(),
        }
    }

    /// An independent copy with the given nodes (and their edges) removed.
    ///
    /// The original is left untouched; planners operate on pruned copies so
    /// the full graph stays available for rendering and reporting.
    pub fn without_nodes(&self, remove: &BTreeSet<String>) -> DepGraph {
        let mut pruned = DepGraph::new();
        for name in self.nodes() {
            if !remove.contains(name) {
                pruned.add_node(name);
            }
        }
        for (from, to) in self.edges() {
            if !remove.contains(&from) && !remove.contains(&to) {
                pruned.add_edge(&from, &to);
            }
        }
        pruned
    }

    pub(crate) fn inner(&self) -> &DiGraph<String, ()> {
        &self.graph
    }
}
