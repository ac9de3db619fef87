//! Source-control provider and status-reporting boundaries.

use async_trait::async_trait;
use stratum_domain::{CommitStatus, StatusState};

/// Read-side SCM access the coordinator and planner need.
#[async_trait]
pub trait ScmProvider: Send + Sync {
    /// Current head commit of a change request.
    async fn head_commit(&self, change_id: u64) -> anyhow::Result<String>;

    /// Build statuses of the last commit of the change request that has
    /// any, together with that commit's id.
    async fn build_statuses(&self, change_id: u64) -> anyhow::Result<(String, Vec<CommitStatus>)>;

    /// Files touched by commits newer than the last status-bearing commit.
    async fn files_touched_since_last_status(&self, change_id: u64)
        -> anyhow::Result<Vec<String>>;
}

/// Write-side commit-status reporting (the pending/success/error badges on
/// the change request). Delivery backends live outside the core.
#[async_trait]
pub trait StatusReporter: Send + Sync {
    async fn report(
        &self,
        commit: &str,
        state: StatusState,
        context: &str,
        description: &str,
        target_url: &str,
    ) -> anyhow::Result<()>;
}
