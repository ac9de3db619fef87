//! Stratum scheduler - drives planned build levels against an external
//! job runner.
//!
//! Provides:
//! - Collaborator traits for the job runner, the SCM provider, and the
//!   commit-status reporter
//! - Build planning glue from a change set to prunable levels
//! - The level-ordered launch/poll/cancel coordinator state machine
//! - In-memory fakes for consumers and tests

pub mod coordinator;
pub mod fakes;
pub mod params;
pub mod plan;
pub mod runner;
pub mod scm;
pub mod telemetry;

// Re-export key types
pub use coordinator::{BuildContext, BuildCoordinator, CoordinatorConfig, RunReport};
pub use params::job_params;
pub use plan::{BuildPlan, ChangeSet};
pub use runner::{JobHandle, JobRequest, JobRunner, JobState, JobVerdict};
pub use scm::{ScmProvider, StatusReporter};
