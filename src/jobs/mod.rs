//! Report jobs: screening pipeline, retry/escalation runner and notifications

pub mod context;
pub mod handlers;
pub mod report;
pub mod runner;
pub mod types;
pub mod workflow;

pub use context::JobContext;
pub use runner::JobRunner;
pub use types::{
    JobOutcome, NotificationKind, OutcomeSummary, RetryPolicy, RunnerState, ScreeningReport,
    TriggerOutcome,
};
pub use workflow::{FactorPreset, ScreeningPipeline, ScreeningWorkflow};
