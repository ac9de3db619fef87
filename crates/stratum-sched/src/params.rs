//! Job parameter composition.
//!
//! Runner jobs receive their artifact, branch, and workspace information
//! packed into a small parameter map using an `:@:` separator the build
//! scripts unpack on the other side.

use crate::coordinator::BuildContext;
use serde_json::{json, Value};
use stratum_domain::{status_context, CiError, Result};

/// Build the parameter map for one (artifact, kind) job launch.
///
/// Rejects build kinds the dispatcher does not know; the coordinator treats
/// that as fatal for the launch, the same as a build failure.
pub fn job_params(ctx: &BuildContext, artifact: &str, kind: &str) -> Result<Value> {
    let composed = format!("{}:@:{}", artifact, status_context(artifact, kind));
    match kind {
        "test" | "artifact" => Ok(json!({
            "artifact_name": composed,
            "branch": format!("{}:@:{}:@:{}", ctx.branch, ctx.workspace, ctx.commit),
            "committer": ctx.committer,
        })),
        "artifactmaster" => Ok(json!({
            "artifact_name": artifact,
            "branch": ctx.branch,
            "committer": ctx.committer,
        })),
        other => Err(CiError::UnknownBuildKind(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> BuildContext {
        BuildContext {
            change_id: Some(42),
            commit: "abc123".to_string(),
            committer: "dev".to_string(),
            branch: "feature/x".to_string(),
            workspace: "/mnt/ci/ws".to_string(),
        }
    }

    #[test]
    fn test_test_params_shape() {
        let params = job_params(&ctx(), "api", "test").expect("params failed");
        assert_eq!(params["artifact_name"], "api:@:api (test)");
        assert_eq!(params["branch"], "feature/x:@:/mnt/ci/ws:@:abc123");
        assert_eq!(params["committer"], "dev");
    }

    #[test]
    fn test_master_params_are_plain() {
        let params = job_params(&ctx(), "api", "artifactmaster").expect("params failed");
        assert_eq!(params["artifact_name"], "api");
        assert_eq!(params["branch"], "feature/x");
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = job_params(&ctx(), "api", "superman").unwrap_err();
        assert!(matches!(err, CiError::UnknownBuildKind(k) if k == "superman"));
    }
}
