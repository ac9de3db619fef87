//! Build planning: from a change set to prunable, leveled work.
//!
//! Pure glue over the graph engine: derive the modified artifacts from the
//! change's diff, apply commit-message exclusions, build the graph, resolve
//! the skip set, and re-plan levels on the pruned graph. The full-graph
//! plan is kept alongside for rendering back on the change request.

use crate::scm::ScmProvider;
use std::collections::BTreeSet;
use stratum_domain::{CommitMessageFileMap, CommitStatus, Manifest, Result};
use stratum_graph::{
    artifact_from_path, build_graph, do_not_touch, excluded_deps, DepGraph, DependencyResolver,
    LevelPlan,
};
use tracing::info;

/// Everything the planner needs to know about a change.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    /// Files changed by the whole change (branch diff against trunk).
    pub diff_files: Vec<String>,

    /// Commit messages of the change mapped to the files they touched.
    pub message_files: CommitMessageFileMap,

    /// Build statuses of the last status-bearing commit.
    pub statuses: Vec<CommitStatus>,

    /// Files touched by commits newer than that status-bearing commit.
    pub files_since_last_status: Vec<String>,
}

impl ChangeSet {
    /// Gather the SCM-derived parts of a change set from the provider.
    pub async fn from_scm(
        scm: &dyn ScmProvider,
        change_id: u64,
        diff_files: Vec<String>,
        message_files: CommitMessageFileMap,
    ) -> anyhow::Result<Self> {
        let (status_commit, statuses) = scm.build_statuses(change_id).await?;
        let files_since_last_status = scm.files_touched_since_last_status(change_id).await?;
        info!(
            change_id,
            status_commit = %status_commit,
            statuses = statuses.len(),
            "gathered change set"
        );
        Ok(Self {
            diff_files,
            message_files,
            statuses,
            files_since_last_status,
        })
    }
}

/// A resolved plan for one build attempt.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    /// Full dependency graph of the change.
    pub graph: DepGraph,
    pub modified: BTreeSet<String>,
    /// Artifacts whose dependency fan-out was suppressed by commit keywords.
    pub excluded: BTreeSet<String>,
    /// Artifacts proven safe to omit from this build.
    pub skipped: BTreeSet<String>,
    /// Levels actually driven (skip set pruned out).
    pub plan: LevelPlan,
    /// Levels of the full graph, for rendering and traceability.
    pub full_plan: LevelPlan,
}

impl BuildPlan {
    pub fn resolve(
        manifest: &Manifest,
        resolver: &dyn DependencyResolver,
        change: &ChangeSet,
    ) -> Result<Self> {
        let modified: BTreeSet<String> = change
            .diff_files
            .iter()
            .filter_map(|path| artifact_from_path(path, manifest))
            .collect();
        let excluded = excluded_deps(manifest, &change.message_files, &modified);
        info!(
            modified = ?modified,
            excluded = ?excluded,
            "dependencies of unmodified excluded artifacts will be ignored"
        );

        let graph = build_graph(manifest, resolver, &modified, &excluded)?;
        // Cycle detection happens here, before anything is launched.
        let full_plan = LevelPlan::compute(&graph)?;

        let skipped = do_not_touch(manifest, &change.statuses, &change.files_since_last_status, &graph);
        let pruned = graph.without_nodes(&skipped);
        let plan = LevelPlan::compute(&pruned)?;

        Ok(Self {
            graph,
            modified,
            excluded,
            skipped,
            plan,
            full_plan,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_domain::{status_context, Artifact, StatusState};
    use stratum_graph::DeclaredResolver;

    fn artifact(name: &str, deps: &[&str]) -> Artifact {
        Artifact {
            name: name.to_string(),
            artifact_dir: None,
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            exclude_dependencies_only_on_keywords: None,
            kind: None,
        }
    }

    fn green(name: &str) -> CommitStatus {
        CommitStatus::new(status_context(name, "test"), StatusState::Success)
    }

    #[test]
    fn test_resolve_prunes_skippable_chain() {
        // lib -> svc -> app; the diff touches app only, and lib/svc are
        // green and untouched since: only app must build.
        let manifest = Manifest::new(vec![
            artifact("lib", &[]),
            artifact("svc", &["lib"]),
            artifact("app", &["svc"]),
        ])
        .expect("manifest failed");

        let change = ChangeSet {
            diff_files: vec![
                "lib/a.rs".to_string(),
                "svc/b.rs".to_string(),
                "app/c.rs".to_string(),
            ],
            message_files: CommitMessageFileMap::new(),
            statuses: vec![green("lib"), green("svc")],
            files_since_last_status: vec!["app/c.rs".to_string()],
        };

        let plan = BuildPlan::resolve(&manifest, &DeclaredResolver, &change)
            .expect("resolve failed");

        assert_eq!(plan.modified, ["app", "lib", "svc"].map(String::from).into());
        assert_eq!(plan.skipped, ["lib", "svc"].map(String::from).into());
        assert_eq!(plan.plan.components, vec![vec![vec!["app".to_string()]]]);
        // The full plan keeps the whole chain.
        assert_eq!(plan.full_plan.artifact_count(), 3);
    }

    #[test]
    fn test_resolve_surfaces_cycle() {
        let manifest = Manifest::new(vec![
            artifact("a", &["b"]),
            artifact("b", &["a"]),
        ])
        .expect("manifest failed");

        let change = ChangeSet {
            diff_files: vec!["a/x.rs".to_string(), "b/y.rs".to_string()],
            ..ChangeSet::default()
        };

        let result = BuildPlan::resolve(&manifest, &DeclaredResolver, &change);
        assert!(matches!(result, Err(stratum_domain::CiError::Cycle)));
    }

    #[test]
    fn test_resolve_untouched_manifest_is_empty_plan() {
        let manifest = Manifest::new(vec![artifact("lib", &[])]).expect("manifest failed");
        let change = ChangeSet {
            diff_files: vec!["docs/readme.md".to_string()],
            ..ChangeSet::default()
        };

        let plan = BuildPlan::resolve(&manifest, &DeclaredResolver, &change)
            .expect("resolve failed");
        assert!(plan.modified.is_empty());
        assert!(plan.plan.is_empty());
    }
}
