//! Stratum domain model - shared types for the CI core.
//!
//! Provides the manifest/artifact model, build kinds with their
//! status-context wire format, commit-status classification, and the
//! error taxonomy used across the workspace.

pub mod artifact;
pub mod build;
pub mod error;
pub mod status;

// Re-export key types
pub use artifact::{Artifact, Manifest};
pub use build::{parse_context, status_context, BuildKind};
pub use error::{CiError, Result};
pub use status::{
    classify_statuses, CommitMessageFileMap, CommitStatus, StatusState, StatusSummary,
};
