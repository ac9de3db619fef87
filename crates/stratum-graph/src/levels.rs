//! Build-level planning.
//!
//! Splits the dependency graph into weakly-connected components and orders
//! each component into levels: batches of artifacts with no dependency edges
//! among them, safe to build concurrently, each level strictly above every
//! level containing one of its dependencies.

use crate::graph::DepGraph;
use petgraph::algo::toposort;
use petgraph::graph::NodeIndex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::collections::HashSet;
use tracing::{error, info};
use stratum_domain::{CiError, Result};

/// Compute build levels per component.
///
/// Returns one entry per weakly-connected component (in node discovery
/// order), each an ordered list of levels. A cycle is a hard failure:
/// retrying cannot fix a manifest configuration error.
pub fn levels(graph: &DepGraph) -> Result<Vec<Vec<Vec<String>>>> {
    if toposort(graph.inner(), None).is_err() {
        error!("a cycle has been detected in the dependency graph");
        return Err(CiError::Cycle);
    }

    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "generating dependency levels"
    );
    let planned = components(graph)
        .iter()
        .map(|component| component_levels(graph, component))
        .collect();
    Ok(planned)
}

/// Weakly-connected components, each a sorted set of member indices,
/// discovered in node insertion order.
fn components(graph: &DepGraph) -> Vec<BTreeSet<NodeIndex>> {
    let inner = graph.inner();
    let mut seen: HashSet<NodeIndex> = HashSet::new();
    let mut result = Vec::new();

    for start in inner.node_indices() {
        if seen.contains(&start) {
            continue;
        }
        let mut member = BTreeSet::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            if !seen.insert(node) {
                continue;
            }
            member.insert(node);
            stack.extend(inner.neighbors_undirected(node));
        }
        result.push(member);
    }
    result
}

/// Level assignment within one component.
///
/// Nodes are taken in topological order and pushed down as far as possible:
/// the candidate level starts at the node's topological position and drops
/// until a level holding one of the node's predecessors is found; the node
/// lands one level above it (level 0 when no predecessor is placed). Every
/// within-component edge therefore points from a strictly lower level to a
/// strictly higher one.
fn component_levels(graph: &DepGraph, member: &BTreeSet<NodeIndex>) -> Vec<Vec<String>> {
    let mut sub = DepGraph::new();
    for name in graph.nodes() {
        if member.contains(&graph.index_of(name).expect("known node")) {
            sub.add_node(name);
        }
    }
    for (from, to) in graph.edges() {
        let from_idx = graph.index_of(&from).expect("known node");
        let to_idx = graph.index_of(&to).expect("known node");
        if member.contains(&from_idx) && member.contains(&to_idx) {
            sub.add_edge(&from, &to);
        }
    }

    // The component is a subgraph of a DAG, so this cannot fail.
    let order = toposort(sub.inner(), None).expect("component of an acyclic graph");

    let mut slots: Vec<Vec<NodeIndex>> = vec![Vec::new(); order.len()];
    for (position, &node) in order.iter().enumerate() {
        let mut candidate = position as isize;
        while candidate >= 0
            && slots[candidate as usize]
                .iter()
                .all(|&placed| sub.inner().find_edge(placed, node).is_none())
        {
            candidate -= 1;
        }
        slots[(candidate + 1) as usize].push(node);
    }

    slots
        .into_iter()
        .filter(|slot| !slot.is_empty())
        .map(|slot| {
            slot.into_iter()
                .map(|idx| sub.name_of(idx).to_string())
                .collect()
        })
        .collect()
}

/// A planned set of build levels with a stable fingerprint.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LevelPlan {
    /// Components in discovery order, each an ordered list of levels.
    pub components: Vec<Vec<Vec<String>>>,
}

impl LevelPlan {
    pub fn compute(graph: &DepGraph) -> Result<Self> {
        Ok(Self {
            components: levels(graph)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.components.iter().all(|c| c.is_empty())
    }

    /// Total number of artifacts across all components.
    pub fn artifact_count(&self) -> usize {
        self.components
            .iter()
            .flat_map(|component| component.iter())
            .map(|level| level.len())
            .sum()
    }

    /// Deterministic digest of the level layout.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for component in &self.components {
            for level in component {
                for artifact in level {
                    hasher.update(artifact.as_bytes());
                    hasher.update(b"\0");
                }
                hasher.update(b"|");
            }
            hasher.update(b";");
        }
        hex::encode(hasher.finalize())
    }

    /// Human-readable level listing, posted back on the change request.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (component_no, component) in self.components.iter().enumerate() {
            out.push_str(&format!("component {}:\n", component_no + 1));
            for (level_no, level) in component.iter().enumerate() {
                out.push_str(&format!("  level {}: {}\n", level_no + 1, level.join(", ")));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flatten_with_levels(component: &[Vec<String>]) -> Vec<(String, usize)> {
        component
            .iter()
            .enumerate()
            .flat_map(|(lvl, names)| names.iter().map(move |n| (n.clone(), lvl)))
            .collect()
    }

    #[test]
    fn test_levels_sample_graph() {
        // A -> B -> C, A -> C, A -> E, plus isolated D.
        let graph = DepGraph::from_parts(
            [("A", "B"), ("B", "C"), ("A", "C"), ("A", "E")],
            ["A", "B", "D"],
        );
        let planned = levels(&graph).expect("levels failed");

        assert_eq!(planned.len(), 2);
        let first = &planned[0];
        assert_eq!(first.len(), 3);
        assert_eq!(first[0], vec!["A".to_string()]);
        assert_eq!(
            first[1].iter().cloned().collect::<BTreeSet<_>>(),
            ["B".to_string(), "E".to_string()].into()
        );
        assert_eq!(first[2], vec!["C".to_string()]);
        assert_eq!(planned[1], vec![vec!["D".to_string()]]);
    }

    #[test]
    fn test_levels_rejects_cycle() {
        let graph = DepGraph::from_parts(
            [("A", "B"), ("B", "C"), ("C", "A")],
            std::iter::empty(),
        );
        assert!(matches!(levels(&graph), Err(CiError::Cycle)));
    }

    #[test]
    fn test_levels_all_isolated() {
        let graph = DepGraph::from_parts(std::iter::empty(), ["x", "y", "z"]);
        let planned = levels(&graph).expect("levels failed");

        assert_eq!(planned.len(), 3);
        for component in &planned {
            assert_eq!(component.len(), 1);
            assert_eq!(component[0].len(), 1);
        }
    }

    #[test]
    fn test_levels_empty_graph() {
        let planned = levels(&DepGraph::new()).expect("levels failed");
        assert!(planned.is_empty());
    }

    #[test]
    fn test_every_edge_points_to_a_higher_level() {
        let graph = DepGraph::from_parts(
            [
                ("a", "b"),
                ("a", "c"),
                ("b", "d"),
                ("c", "d"),
                ("d", "e"),
                ("a", "e"),
                ("x", "y"),
            ],
            ["lonely"],
        );
        let planned = levels(&graph).expect("levels failed");

        for component in &planned {
            let placed = flatten_with_levels(component);
            for (from, from_level) in &placed {
                for (to, to_level) in &placed {
                    if graph.has_edge(from, to) {
                        assert!(
                            from_level < to_level,
                            "edge {} -> {} must cross levels upward",
                            from,
                            to
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_plan_digest_deterministic() {
        let graph = DepGraph::from_parts([("a", "b")], ["c"]);
        let plan1 = LevelPlan::compute(&graph).expect("plan failed");
        let plan2 = LevelPlan::compute(&graph).expect("plan failed");
        assert_eq!(plan1.digest(), plan2.digest());
    }

    #[test]
    fn test_plan_digest_layout_sensitive() {
        let chain = LevelPlan::compute(&DepGraph::from_parts([("a", "b")], std::iter::empty()))
            .expect("plan failed");
        let split = LevelPlan::compute(&DepGraph::from_parts(std::iter::empty(), ["a", "b"]))
            .expect("plan failed");
        assert_ne!(chain.digest(), split.digest());
    }

    #[test]
    fn test_plan_render_lists_levels() {
        let plan = LevelPlan::compute(&DepGraph::from_parts([("a", "b")], std::iter::empty()))
            .expect("plan failed");
        let rendered = plan.render();
        assert!(rendered.contains("component 1:"));
        assert!(rendered.contains("level 1: a"));
        assert!(rendered.contains("level 2: b"));
    }

    #[test]
    fn test_plan_artifact_count() {
        let graph = DepGraph::from_parts([("a", "b")], ["c"]);
        let plan = LevelPlan::compute(&graph).expect("plan failed");
        assert_eq!(plan.artifact_count(), 3);
        assert!(!plan.is_empty());
        assert!(LevelPlan::compute(&DepGraph::new())
            .expect("plan failed")
            .is_empty());
    }
}
