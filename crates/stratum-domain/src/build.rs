//! Build kinds and the status-context wire format.
//!
//! Every launched job is an (artifact, build kind) pair. The pair is also
//! encoded into the commit-status context string reported upstream, and
//! parsed back when classifying past statuses.

use crate::error::{CiError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Kinds of build work dispatched to the job runner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuildKind {
    /// Run the artifact's test suite.
    Test,

    /// Build and publish the artifact from a feature branch.
    Artifact,

    /// Build and publish the artifact from the trunk branch.
    ArtifactMaster,
}

impl BuildKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildKind::Test => "test",
            BuildKind::Artifact => "artifact",
            BuildKind::ArtifactMaster => "artifactmaster",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "test" => Ok(BuildKind::Test),
            "artifact" => Ok(BuildKind::Artifact),
            "artifactmaster" => Ok(BuildKind::ArtifactMaster),
            other => Err(CiError::UnknownBuildKind(other.to_string())),
        }
    }

    /// Build kinds applicable to a branch: test + artifact off trunk,
    /// a single trunk-publish kind on trunk.
    pub fn for_branch(branch: &str, trunk: &str) -> Vec<BuildKind> {
        if branch == trunk {
            vec![BuildKind::ArtifactMaster]
        } else {
            vec![BuildKind::Test, BuildKind::Artifact]
        }
    }

    /// Name of the runner job for an artifact. Trunk publishes reuse the
    /// regular artifact job.
    pub fn job_name(&self, artifact: &str) -> String {
        let kind = match self {
            BuildKind::ArtifactMaster => "artifact",
            other => other.as_str(),
        };
        format!("{} - {}", artifact, kind)
    }
}

impl fmt::Display for BuildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Commit-status context for an (artifact, kind) pair.
///
/// The kind is a free string here: besides the [`BuildKind`] names, the
/// scheduler also reports synthetic contexts such as `"pkg (Not rebuilt)"`
/// for skipped artifacts.
pub fn status_context(artifact: &str, kind: &str) -> String {
    format!("{} ({})", artifact, kind)
}

fn context_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([\w\s-]+) \(([\w\s-]+)\)$").expect("static regex"))
}

/// Parse a commit-status context back into its (artifact, kind) pair.
pub fn parse_context(context: &str) -> Result<(String, String)> {
    let captures = context_regex()
        .captures(context)
        .ok_or_else(|| CiError::Manifest(format!("could not decode context: {:?}", context)))?;
    Ok((captures[1].to_string(), captures[2].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_branch_feature() {
        let kinds = BuildKind::for_branch("feature/x", "master");
        assert_eq!(kinds, vec![BuildKind::Test, BuildKind::Artifact]);
    }

    #[test]
    fn test_for_branch_trunk() {
        let kinds = BuildKind::for_branch("master", "master");
        assert_eq!(kinds, vec![BuildKind::ArtifactMaster]);
    }

    #[test]
    fn test_job_name_master_reuses_artifact_job() {
        assert_eq!(BuildKind::Test.job_name("api"), "api - test");
        assert_eq!(BuildKind::Artifact.job_name("api"), "api - artifact");
        assert_eq!(BuildKind::ArtifactMaster.job_name("api"), "api - artifact");
    }

    #[test]
    fn test_parse_unknown_kind() {
        let err = BuildKind::parse("superman").unwrap_err();
        assert!(matches!(err, CiError::UnknownBuildKind(k) if k == "superman"));
    }

    #[test]
    fn test_context_round_trip() {
        let context = status_context("my-artifact", BuildKind::Test.as_str());
        assert_eq!(context, "my-artifact (test)");
        let (artifact, kind) = parse_context(&context).expect("parse failed");
        assert_eq!(artifact, "my-artifact");
        assert_eq!(kind, "test");
    }

    #[test]
    fn test_context_with_free_kind() {
        let (artifact, kind) = parse_context("pkg (Not rebuilt)").expect("parse failed");
        assert_eq!(artifact, "pkg");
        assert_eq!(kind, "Not rebuilt");
    }

    #[test]
    fn test_parse_context_rejects_garbage() {
        assert!(parse_context("no parens here").is_err());
        assert!(parse_context("").is_err());
    }
}
