//! In-memory fakes for the collaborator traits (testing only).
//!
//! Provides `MemoryJobRunner`, `MemoryScm`, and `MemoryReporter` that
//! satisfy the trait contracts without any external backend. Jobs can be
//! scripted to linger in the queue, run for a number of polls, and finish
//! with a chosen verdict.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::runner::{JobHandle, JobRequest, JobRunner, JobState, JobVerdict};
use crate::scm::{ScmProvider, StatusReporter};
use stratum_domain::{CommitStatus, StatusState};

// ---------------------------------------------------------------------------
// MemoryJobRunner
// ---------------------------------------------------------------------------

/// Scripted behavior for one artifact's jobs.
#[derive(Debug, Clone)]
pub struct JobScript {
    /// Polls the job reports `Queued` before getting scheduled.
    pub queued_polls: u32,
    /// Polls the job reports `Running` before finishing.
    pub running_polls: u32,
    /// Terminal verdict; `None` means the backend never publishes one.
    pub verdict: Option<JobVerdict>,
}

impl Default for JobScript {
    fn default() -> Self {
        Self {
            queued_polls: 0,
            running_polls: 0,
            verdict: Some(JobVerdict::Success),
        }
    }
}

impl JobScript {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            verdict: Some(JobVerdict::Failure),
            ..Self::default()
        }
    }

    /// Report `Running` for the given number of polls first.
    pub fn running_for(mut self, polls: u32) -> Self {
        self.running_polls = polls;
        self
    }

    /// Report `Queued` for the given number of polls first.
    pub fn queued_for(mut self, polls: u32) -> Self {
        self.queued_polls = polls;
        self
    }
}

#[derive(Debug)]
struct JobRecord {
    script: JobScript,
    polls: u32,
    cancelled: bool,
}

#[derive(Debug, Default)]
struct RunnerState {
    scripts: HashMap<String, JobScript>,
    jobs: HashMap<String, JobRecord>,
    submitted: Vec<JobRequest>,
    cancelled: Vec<JobHandle>,
}

/// In-memory job runner with per-artifact scripted outcomes.
#[derive(Debug, Default)]
pub struct MemoryJobRunner {
    state: Mutex<RunnerState>,
}

impl MemoryJobRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the jobs of one artifact. Unscripted artifacts succeed
    /// immediately.
    pub fn script(&self, artifact: &str, script: JobScript) {
        let mut state = self.state.lock().unwrap();
        state.scripts.insert(artifact.to_string(), script);
    }

    /// Requests submitted so far, in launch order.
    pub fn submitted(&self) -> Vec<JobRequest> {
        self.state.lock().unwrap().submitted.clone()
    }

    /// Handles cancelled so far.
    pub fn cancelled(&self) -> Vec<JobHandle> {
        self.state.lock().unwrap().cancelled.clone()
    }

    /// How many times the given artifact's jobs were cancelled.
    pub fn cancel_count(&self, artifact: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .cancelled
            .iter()
            .filter(|h| h.artifact == artifact)
            .count()
    }
}

#[async_trait]
impl JobRunner for MemoryJobRunner {
    async fn submit(&self, request: &JobRequest) -> anyhow::Result<JobHandle> {
        let mut state = self.state.lock().unwrap();
        let script = state
            .scripts
            .get(&request.artifact)
            .cloned()
            .unwrap_or_default();
        let handle = JobHandle {
            id: Uuid::new_v4().to_string(),
            artifact: request.artifact.clone(),
            kind: request.kind,
        };
        state.jobs.insert(
            handle.id.clone(),
            JobRecord {
                script,
                polls: 0,
                cancelled: false,
            },
        );
        state.submitted.push(request.clone());
        Ok(handle)
    }

    async fn poll(&self, handle: &JobHandle) -> anyhow::Result<JobState> {
        let mut state = self.state.lock().unwrap();
        let record = state
            .jobs
            .get_mut(&handle.id)
            .ok_or_else(|| anyhow::anyhow!("unknown job {}", handle.id))?;
        if record.cancelled {
            return Ok(JobState::Finished(Some(JobVerdict::Failure)));
        }
        let poll_no = record.polls;
        record.polls += 1;
        if poll_no < record.script.queued_polls {
            Ok(JobState::Queued)
        } else if poll_no < record.script.queued_polls + record.script.running_polls {
            Ok(JobState::Running)
        } else {
            Ok(JobState::Finished(record.script.verdict))
        }
    }

    async fn cancel(&self, handle: &JobHandle) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(record) = state.jobs.get_mut(&handle.id) {
            record.cancelled = true;
        }
        state.cancelled.push(handle.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryScm
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct ScmState {
    heads: Vec<String>,
    head_calls: usize,
    statuses: (String, Vec<CommitStatus>),
    touched: Vec<String>,
}

/// In-memory SCM provider with a scripted head-commit sequence.
#[derive(Debug, Default)]
pub struct MemoryScm {
    state: Mutex<ScmState>,
}

impl MemoryScm {
    /// Provider whose head commit never changes.
    pub fn new(head: &str) -> Self {
        Self::with_heads(vec![head.to_string()])
    }

    /// Provider returning the given head commits call by call; the last one
    /// repeats once the script runs out.
    pub fn with_heads(heads: Vec<String>) -> Self {
        Self {
            state: Mutex::new(ScmState {
                heads,
                ..ScmState::default()
            }),
        }
    }

    pub fn set_statuses(&self, commit: &str, statuses: Vec<CommitStatus>) {
        let mut state = self.state.lock().unwrap();
        state.statuses = (commit.to_string(), statuses);
    }

    pub fn set_touched(&self, touched: Vec<String>) {
        self.state.lock().unwrap().touched = touched;
    }
}

#[async_trait]
impl ScmProvider for MemoryScm {
    async fn head_commit(&self, _change_id: u64) -> anyhow::Result<String> {
        let mut state = self.state.lock().unwrap();
        let idx = state.head_calls.min(state.heads.len().saturating_sub(1));
        state.head_calls += 1;
        state
            .heads
            .get(idx)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no head commit scripted"))
    }

    async fn build_statuses(
        &self,
        _change_id: u64,
    ) -> anyhow::Result<(String, Vec<CommitStatus>)> {
        Ok(self.state.lock().unwrap().statuses.clone())
    }

    async fn files_touched_since_last_status(
        &self,
        _change_id: u64,
    ) -> anyhow::Result<Vec<String>> {
        Ok(self.state.lock().unwrap().touched.clone())
    }
}

// ---------------------------------------------------------------------------
// MemoryReporter
// ---------------------------------------------------------------------------

/// One recorded status report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedStatus {
    pub commit: String,
    pub state: StatusState,
    pub context: String,
    pub description: String,
}

/// Status reporter recording every call.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    reports: Mutex<Vec<ReportedStatus>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<ReportedStatus> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatusReporter for MemoryReporter {
    async fn report(
        &self,
        commit: &str,
        state: StatusState,
        context: &str,
        description: &str,
        _target_url: &str,
    ) -> anyhow::Result<()> {
        self.reports.lock().unwrap().push(ReportedStatus {
            commit: commit.to_string(),
            state,
            context: context.to_string(),
            description: description.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_domain::BuildKind;

    fn request(artifact: &str) -> JobRequest {
        JobRequest {
            job_name: BuildKind::Test.job_name(artifact),
            artifact: artifact.to_string(),
            kind: BuildKind::Test,
            params: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn test_scripted_job_lifecycle() {
        let runner = MemoryJobRunner::new();
        runner.script("api", JobScript::succeeding().queued_for(1).running_for(1));

        let handle = runner.submit(&request("api")).await.expect("submit failed");
        assert_eq!(runner.poll(&handle).await.unwrap(), JobState::Queued);
        assert_eq!(runner.poll(&handle).await.unwrap(), JobState::Running);
        assert_eq!(
            runner.poll(&handle).await.unwrap(),
            JobState::Finished(Some(JobVerdict::Success))
        );
    }

    #[tokio::test]
    async fn test_cancel_recorded() {
        let runner = MemoryJobRunner::new();
        let handle = runner.submit(&request("api")).await.expect("submit failed");
        runner.cancel(&handle).await.expect("cancel failed");
        assert_eq!(runner.cancel_count("api"), 1);
    }

    #[tokio::test]
    async fn test_scm_head_script_repeats_last() {
        let scm = MemoryScm::with_heads(vec!["c1".to_string(), "c2".to_string()]);
        assert_eq!(scm.head_commit(1).await.unwrap(), "c1");
        assert_eq!(scm.head_commit(1).await.unwrap(), "c2");
        assert_eq!(scm.head_commit(1).await.unwrap(), "c2");
    }
}
