//! Do-not-touch resolution: artifacts safe to omit from the current build.
//!
//! An artifact is skippable when its last builds were all green, the newest
//! commits did not touch it, and every dependency path reaching it from
//! another skippable artifact passes exclusively through skippable
//! artifacts. An intermediate rebuild would otherwise change its effective
//! inputs without the skip set accounting for it.

use crate::graph::DepGraph;
use crate::paths::artifact_from_path;
use petgraph::algo::all_simple_paths;
use petgraph::graph::NodeIndex;
use std::collections::BTreeSet;
use std::collections::HashSet;
use stratum_domain::{classify_statuses, CommitStatus, Manifest};
use tracing::info;

/// Synthetic node pointing at every real node. Guarantees each artifact is
/// reachable from a skippable source, removing the graph-root special case.
const ROOT: &str = "__root__";

/// Compute the set of artifacts that the current build may skip.
///
/// `statuses` is the status history of the last commit that has any;
/// `touched_files` lists files changed by commits newer than that one.
///
/// The path-completeness check enumerates all simple paths between candidate
/// pairs, which is exponential in the worst case. Artifact counts and
/// fan-out are small in this domain (tens of nodes); a reachability-based
/// reformulation over a pruned DFS would be equivalent if that ever stops
/// holding.
pub fn do_not_touch(
    manifest: &Manifest,
    statuses: &[CommitStatus],
    touched_files: &[String],
    graph: &DepGraph,
) -> BTreeSet<String> {
    let summary = classify_statuses(statuses);
    let modified: BTreeSet<String> = touched_files
        .iter()
        .filter_map(|path| artifact_from_path(path, manifest))
        .collect();

    info!(green = ?summary.green, red = ?summary.red, modified = ?modified, "skip-set inputs");

    let names = manifest.names();
    let mut candidates: BTreeSet<String> = summary
        .green
        .difference(&summary.red)
        .cloned()
        .collect::<BTreeSet<_>>()
        .difference(&modified)
        .cloned()
        .filter(|name| names.contains(name))
        .collect();

    if candidates.is_empty() {
        info!("no skippable artifacts");
        return candidates;
    }

    let mut augmented = graph.clone();
    let real_nodes: Vec<String> = augmented.nodes().map(String::from).collect();
    for node in &real_nodes {
        augmented.add_edge(ROOT, node);
    }
    candidates.insert(ROOT.to_string());

    let candidate_indices: HashSet<NodeIndex> = candidates
        .iter()
        .filter_map(|name| augmented.index_of(name))
        .collect();
    let root_idx = augmented.index_of(ROOT);

    let mut incomplete: BTreeSet<String> = BTreeSet::new();
    for from in &candidates {
        for to in &candidates {
            if from == to {
                continue;
            }
            let (Some(from_idx), Some(to_idx)) =
                (augmented.index_of(from), augmented.index_of(to))
            else {
                continue;
            };
            for path in
                all_simple_paths::<Vec<NodeIndex>, _>(augmented.inner(), from_idx, to_idx, 0, None)
            {
                // Length-2 paths through the synthetic root only exist
                // because of the augmentation; they are not dependency chains.
                if path.len() == 2 && root_idx.is_some_and(|r| path.contains(&r)) {
                    continue;
                }
                if path.iter().any(|idx| !candidate_indices.contains(idx)) {
                    incomplete.insert(to.clone());
                }
            }
        }
    }

    info!(flagged = ?incomplete, "artifacts with an incomplete path directed to them");

    candidates.remove(ROOT);
    let skippable: BTreeSet<String> = candidates.difference(&incomplete).cloned().collect();
    info!(skippable = ?skippable, "artifacts that should not be touched");
    skippable
}
