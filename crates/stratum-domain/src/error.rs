//! Error taxonomy for the CI core.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CiError {
    /// The dependency graph contains a cycle. Fatal for the build attempt:
    /// leveling refuses to run and no automatic cycle-breaking is attempted.
    #[error("cycle detected in the dependency graph")]
    Cycle,

    /// A newer commit arrived while the build was running. The run is
    /// cancelled and the caller restarts the pipeline on the new commit.
    #[error("build superseded by new commit {commit}")]
    Superseded { commit: String },

    /// One or more jobs failed; remaining work in the batch was cancelled.
    #[error("some builds failed: {artifacts:?}")]
    BuildFailure { artifacts: Vec<String> },

    /// An artifact requested a build kind the dispatcher cannot resolve.
    #[error("unknown build kind: {0}")]
    UnknownBuildKind(String),

    /// Dependency discovery failed for an artifact.
    #[error("dependency resolution failed for {artifact}: {reason}")]
    Resolution { artifact: String, reason: String },

    /// The external job runner reported an error the core cannot recover from.
    #[error("job runner error: {0}")]
    JobRunner(String),

    /// The source-control provider reported an error.
    #[error("scm error: {0}")]
    Scm(String),

    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for CI core operations
pub type Result<T> = std::result::Result<T, CiError>;
