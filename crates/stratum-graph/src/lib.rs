//! Stratum graph engine.
//!
//! Turns declared inter-artifact requirements into a directed dependency
//! graph scoped to a change, plans topologically ordered build levels per
//! weakly-connected component, and resolves the set of artifacts that can
//! safely be skipped for the current build.

pub mod builder;
pub mod graph;
pub mod levels;
pub mod paths;
pub mod skip;

// Re-export key types
pub use builder::{build_graph, excluded_deps, DeclaredResolver, DependencyResolver};
pub use graph::DepGraph;
pub use levels::{levels, LevelPlan};
pub use paths::artifact_from_path;
pub use skip::do_not_touch;
