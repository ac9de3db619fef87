//! Build coordinator: the launch/poll/cancel state machine.
//!
//! Walks the planned levels of each component in order, launches one job
//! per artifact per level, and polls until the batch resolves. Two stop
//! conditions abort the whole run: a newer head commit on the change
//! request (supersession) and any job failure. Aborting cancels every
//! outstanding queued and running job, best-effort, before the error
//! propagates.

use crate::params::job_params;
use crate::plan::BuildPlan;
use crate::runner::{JobHandle, JobRequest, JobRunner, JobState, JobVerdict};
use crate::scm::{ScmProvider, StatusReporter};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use stratum_domain::{status_context, BuildKind, CiError, Result, StatusState};
use tracing::{info, warn};

/// Identity of the change a run builds.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Change-request id, when building a change request. Trunk builds have
    /// none and are never superseded.
    pub change_id: Option<u64>,
    /// Commit the run was started for.
    pub commit: String,
    pub committer: String,
    pub branch: String,
    /// Checked-out workspace path handed to the jobs.
    pub workspace: String,
}

/// Coordinator tuning knobs.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Base sleep between poll iterations.
    pub poll_interval: Duration,
    /// Upper bound of the random jitter added to each sleep.
    pub max_jitter: Duration,
    /// How many times a missing verdict is re-polled before the job counts
    /// as failed.
    pub verdict_retries: u32,
    /// Sleep between verdict re-polls.
    pub verdict_backoff: Duration,
    /// Name of the trunk branch.
    pub trunk_branch: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            max_jitter: Duration::from_millis(500),
            verdict_retries: 12,
            verdict_backoff: Duration::from_millis(500),
            trunk_branch: "master".to_string(),
        }
    }
}

/// Outcome of a completed (non-aborted) run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Jobs launched across all components, levels, and build kinds.
    pub launched: usize,
    /// Artifacts skipped as do-not-touch.
    pub skipped: usize,
}

pub struct BuildCoordinator {
    runner: Arc<dyn JobRunner>,
    scm: Arc<dyn ScmProvider>,
    reporter: Arc<dyn StatusReporter>,
    config: CoordinatorConfig,
}

impl BuildCoordinator {
    pub fn new(
        runner: Arc<dyn JobRunner>,
        scm: Arc<dyn ScmProvider>,
        reporter: Arc<dyn StatusReporter>,
    ) -> Self {
        Self::with_config(runner, scm, reporter, CoordinatorConfig::default())
    }

    pub fn with_config(
        runner: Arc<dyn JobRunner>,
        scm: Arc<dyn ScmProvider>,
        reporter: Arc<dyn StatusReporter>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            runner,
            scm,
            reporter,
            config,
        }
    }

    /// Drive a resolved build plan to one terminal outcome.
    ///
    /// Skipped artifacts get an immediate green status for traceability,
    /// then every component is built strictly level by level.
    pub async fn run(&self, plan: &BuildPlan, ctx: &BuildContext) -> Result<RunReport> {
        let started = Instant::now();
        let started_at = Utc::now();

        self.report_skipped(plan, ctx).await?;

        let mut launched = 0;
        for (component_no, component) in plan.plan.components.iter().enumerate() {
            launched += self
                .run_component(component, &format!("{}", component_no + 1), ctx)
                .await?;
        }

        info!(
            launched,
            skipped = plan.skipped.len(),
            "build run completed"
        );
        Ok(RunReport {
            started_at,
            duration_ms: started.elapsed().as_millis() as u64,
            launched,
            skipped: plan.skipped.len(),
        })
    }

    /// Report a green "Not rebuilt" status for every skipped artifact, so
    /// the change request still shows full per-artifact coverage.
    async fn report_skipped(&self, plan: &BuildPlan, ctx: &BuildContext) -> Result<()> {
        for artifact in &plan.skipped {
            let context = status_context(artifact, "Not rebuilt");
            self.reporter
                .report(
                    &ctx.commit,
                    StatusState::Success,
                    &context,
                    "Unchanged since its last green build; not rebuilt.",
                    "",
                )
                .await
                .map_err(|e| CiError::Scm(e.to_string()))?;
        }
        Ok(())
    }

    /// Build all levels of one component. Returns the number of jobs
    /// launched.
    pub async fn run_component(
        &self,
        component: &[Vec<String>],
        component_id: &str,
        ctx: &BuildContext,
    ) -> Result<usize> {
        let kinds = BuildKind::for_branch(&ctx.branch, &self.config.trunk_branch);

        // Pre-mark every upcoming job pending so reviewers see the full
        // build surface before the first launch. Trunk publishes reuse the
        // artifact context and are not pre-marked.
        for level in component {
            for kind in kinds.iter().filter(|k| **k != BuildKind::ArtifactMaster) {
                for artifact in level {
                    let context = status_context(artifact, kind.as_str());
                    self.reporter
                        .report(
                            &ctx.commit,
                            StatusState::Pending,
                            &context,
                            "Build awaiting launch",
                            "",
                        )
                        .await
                        .map_err(|e| CiError::Scm(e.to_string()))?;
                }
            }
        }

        let mut launched = 0;
        for (level_no, level) in component.iter().enumerate() {
            for kind in &kinds {
                info!(
                    kind = %kind,
                    component_id,
                    level = level_no + 1,
                    levels = component.len(),
                    "building level"
                );
                launched += self.run_level(level, *kind, ctx).await?;
            }
        }
        Ok(launched)
    }

    /// Launch one job per artifact of a level and poll the batch to full
    /// resolution. Returns the number of jobs launched.
    async fn run_level(&self, level: &[String], kind: BuildKind, ctx: &BuildContext) -> Result<usize> {
        let mut queued: Vec<JobHandle> = Vec::with_capacity(level.len());
        for artifact in level {
            let request = JobRequest {
                job_name: kind.job_name(artifact),
                artifact: artifact.clone(),
                kind,
                params: job_params(ctx, artifact, kind.as_str())?,
            };
            let handle = self
                .runner
                .submit(&request)
                .await
                .map_err(|e| CiError::JobRunner(e.to_string()))?;
            queued.push(handle);
        }
        let launched = queued.len();

        let mut running: Vec<JobHandle> = Vec::new();
        let mut iteration = 0u64;

        while !queued.is_empty() || !running.is_empty() {
            // First stop condition: the change request moved on.
            if let Some(change_id) = ctx.change_id {
                let head = self
                    .scm
                    .head_commit(change_id)
                    .await
                    .map_err(|e| CiError::Scm(e.to_string()))?;
                if head != ctx.commit {
                    info!(change_id, new_commit = %head, "change received a new commit, stopping this build");
                    self.cancel_all(&queued, &running).await;
                    return Err(CiError::Superseded { commit: head });
                }
            }

            // Promote scheduled jobs out of the queue.
            let mut still_queued = Vec::new();
            for handle in queued.drain(..) {
                match self.runner.poll(&handle).await {
                    Ok(JobState::Queued) => still_queued.push(handle),
                    Ok(_) => running.push(handle),
                    Err(e) => {
                        info!(job = %handle.id, error = %e, "queue poll failed, will retry");
                        still_queued.push(handle);
                    }
                }
            }
            queued = still_queued;

            // Partition running jobs into still-running and finished.
            let mut active = Vec::new();
            let mut finished = Vec::new();
            for handle in running.drain(..) {
                match self.runner.poll(&handle).await {
                    Ok(JobState::Finished(_)) => finished.push(handle),
                    Ok(_) => active.push(handle),
                    Err(e) => {
                        warn!(job = %handle.id, error = %e, "status poll failed, will retry");
                        active.push(handle);
                    }
                }
            }
            running = active;

            if iteration % 20 == 0 {
                info!(
                    queued = queued.len(),
                    running = running.len(),
                    finished = finished.len(),
                    "poll progress"
                );
            }
            iteration += 1;

            // Second stop condition: a job in the batch failed.
            let mut failed: Vec<String> = Vec::new();
            for handle in &finished {
                if !self.is_good(handle).await {
                    failed.push(handle.artifact.clone());
                }
            }
            if !failed.is_empty() {
                self.cancel_all(&queued, &running).await;
                failed.sort();
                failed.dedup();
                return Err(CiError::BuildFailure { artifacts: failed });
            }

            if queued.is_empty() && running.is_empty() {
                break;
            }

            self.jittered_sleep().await;
        }

        Ok(launched)
    }

    /// Whether a finished job's verdict is success. A missing verdict is
    /// re-polled a bounded number of times and then counts as failed.
    async fn is_good(&self, handle: &JobHandle) -> bool {
        let mut tries = self.config.verdict_retries;
        loop {
            match self.runner.poll(handle).await {
                Ok(JobState::Finished(Some(verdict))) => {
                    return verdict == JobVerdict::Success;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(job = %handle.id, error = %e, "verdict poll failed");
                }
            }
            if tries == 0 {
                warn!(job = %handle.id, "no verdict after bounded polling, treating as failed");
                return false;
            }
            tries -= 1;
            tokio::time::sleep(self.config.verdict_backoff).await;
        }
    }

    /// Cancel every outstanding handle, best-effort but exhaustive: each
    /// queued item is dequeued and each running build is stopped before the
    /// abort error propagates. Cancel failures are logged, not propagated,
    /// and the jobs are no longer tracked afterwards.
    async fn cancel_all(&self, queued: &[JobHandle], running: &[JobHandle]) {
        let cancels = queued.iter().chain(running.iter()).map(|handle| {
            let runner = Arc::clone(&self.runner);
            async move {
                if let Err(e) = runner.cancel(handle).await {
                    warn!(job = %handle.id, error = %e, "cancel failed");
                }
            }
        });
        futures::future::join_all(cancels).await;
    }

    async fn jittered_sleep(&self) {
        let jitter_ms = if self.config.max_jitter.is_zero() {
            0
        } else {
            rand::rng().random_range(0..=self.config.max_jitter.as_millis() as u64)
        };
        tokio::time::sleep(self.config.poll_interval + Duration::from_millis(jitter_ms)).await;
    }
}
