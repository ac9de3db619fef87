//! Dependency graph construction from a modified-artifact set.
//!
//! The builder walks declared requirements outward from the artifacts a
//! change actually touched, so the resulting graph covers exactly the
//! artifacts affected by the change. Commit-message keywords can suppress
//! the dependency fan-out of an artifact whose only changes were tagged
//! harmless.

use crate::graph::DepGraph;
use crate::paths::artifact_from_path;
use std::collections::{BTreeMap, BTreeSet};
use stratum_domain::{Artifact, CiError, CommitMessageFileMap, Manifest, Result};
use tracing::debug;

/// Dependency discovery boundary.
///
/// The real implementation shells out to per-artifact-type strategy plugins;
/// the core only consumes the raw declared-dependency name set.
pub trait DependencyResolver {
    fn requirements(&self, artifact: &Artifact) -> anyhow::Result<BTreeSet<String>>;
}

/// Resolver reading the dependency names declared in the manifest.
#[derive(Debug, Default)]
pub struct DeclaredResolver;

impl DependencyResolver for DeclaredResolver {
    fn requirements(&self, artifact: &Artifact) -> anyhow::Result<BTreeSet<String>> {
        Ok(artifact.dependencies.clone())
    }
}

/// Compute the artifacts whose dependencies should be ignored, based on the
/// commit messages of the change.
///
/// Starts from the full modified set and strikes out every artifact touched
/// by a commit carrying a tag outside its allow-list (or touched at all, for
/// artifacts that declare no allow-list). An empty message map yields an
/// empty exclusion set: without commit messages nothing justifies skipping
/// dependents.
pub fn excluded_deps(
    manifest: &Manifest,
    message_files: &CommitMessageFileMap,
    modified: &BTreeSet<String>,
) -> BTreeSet<String> {
    if message_files.is_empty() {
        return BTreeSet::new();
    }

    let mut exclude = modified.clone();
    for (message, files) in message_files {
        // Leading "TAG1/TAG2: ..." convention.
        let keywords: BTreeSet<&str> = message
            .split(':')
            .next()
            .unwrap_or("")
            .split('/')
            .map(str::trim)
            .collect();

        for path in files {
            let Some(name) = artifact_from_path(path, manifest) else {
                continue;
            };
            let Some(artifact) = manifest.get(&name) else {
                continue;
            };
            match &artifact.exclude_dependencies_only_on_keywords {
                Some(allowed) => {
                    let allowed: BTreeSet<&str> = allowed.iter().map(String::as_str).collect();
                    if keywords.iter().any(|k| !allowed.contains(k)) {
                        // A non-allow-listed tag means a real change happened.
                        exclude.remove(&name);
                    }
                }
                None => {
                    exclude.remove(&name);
                }
            }
        }
    }
    exclude
}

/// Build the dependency graph reachable from the modified artifacts.
///
/// Work-list relaxation: each round draws one edge per (modified
/// requirement, dependent) pair, then the dependents join the modified set
/// for the next round. Dependencies of artifacts in `excluded` propagate
/// only from already-modified nodes, never transitively. Artifacts in the
/// original modified set appear in the graph even when no edge reaches them.
pub fn build_graph(
    manifest: &Manifest,
    resolver: &dyn DependencyResolver,
    modified: &BTreeSet<String>,
    excluded: &BTreeSet<String>,
) -> Result<DepGraph> {
    let names = manifest.names();
    let mut requirements: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (name, artifact) in manifest.iter() {
        let declared = resolver
            .requirements(artifact)
            .map_err(|e| CiError::Resolution {
                artifact: name.clone(),
                reason: e.to_string(),
            })?;
        let internal: BTreeSet<String> = declared.intersection(&names).cloned().collect();
        if internal.is_empty() {
            debug!(artifact = %name, "no internal requirements");
        } else {
            requirements.insert(name.clone(), internal);
        }
    }

    let mut graph = DepGraph::new();
    for name in modified {
        graph.add_node(name);
    }

    let mut frontier = modified.clone();
    while !frontier.is_empty() {
        let mut next = BTreeSet::new();
        let mut consumed_sources = BTreeSet::new();

        for (name, declared) in &requirements {
            let mut relevant: BTreeSet<String> =
                declared.intersection(&frontier).cloned().collect();
            if !frontier.contains(name) {
                relevant = relevant.difference(excluded).cloned().collect();
            }
            if relevant.is_empty() {
                continue;
            }
            for dep in &relevant {
                graph.add_edge(dep, name);
            }
            consumed_sources.extend(relevant);
            next.insert(name.clone());
        }

        for source in &consumed_sources {
            requirements.remove(source);
        }
        frontier = next;
    }

    Ok(graph)
}
