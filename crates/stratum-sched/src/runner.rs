//! Job runner boundary.
//!
//! The runner is an external queue+build backend: jobs are submitted by
//! name, sit in a queue, get scheduled, and eventually finish with a
//! verdict. The coordinator only ever sees this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stratum_domain::BuildKind;

/// One unit of work to submit: a runner job plus its parameters.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct JobRequest {
    /// Runner-side job name, `"{artifact} - {kind}"`.
    pub job_name: String,
    pub artifact: String,
    pub kind: BuildKind,
    pub params: serde_json::Value,
}

/// Correlation between one launched job and the runner's identifiers.
///
/// Owned exclusively by the coordinator for the lifetime of one build run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct JobHandle {
    /// Runner-assigned queue/build identifier.
    pub id: String,
    pub artifact: String,
    pub kind: BuildKind,
}

/// Terminal verdict of a finished job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobVerdict {
    Success,
    Failure,
}

/// Observed state of a submitted job.
///
/// `Finished(None)` means the backend reports the job over but has not
/// published a verdict yet; the coordinator re-polls a bounded number of
/// times before treating it as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Running,
    Finished(Option<JobVerdict>),
}

/// External job runner. Submission and polling are blocking RPCs with
/// backend-owned timeouts; cancellation is cooperative and best-effort.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn submit(&self, request: &JobRequest) -> anyhow::Result<JobHandle>;

    async fn poll(&self, handle: &JobHandle) -> anyhow::Result<JobState>;

    /// Ask the backend to dequeue or stop the job. The coordinator does not
    /// re-poll for confirmation afterwards.
    async fn cancel(&self, handle: &JobHandle) -> anyhow::Result<()>;
}
