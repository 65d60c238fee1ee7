//! Retry/escalation runner for report jobs
//!
//! Each invocation walks `Running(1) → … → SucceededDone | GaveUpDone`. A failed attempt
//! is logged, then the runner cools down and re-enters. The last allowed failure sends
//! the escalation notification instead; a success sends the primary notification.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

use crate::jobs::context::JobContext;
use crate::jobs::types::{
    JobOutcome, NotificationKind, OutcomeSummary, RetryPolicy, RunnerState, ScreeningReport,
    TriggerOutcome,
};
use crate::jobs::workflow::ScreeningPipeline;

pub struct JobRunner {
    pipeline: Arc<dyn ScreeningPipeline>,
    ctx: Arc<JobContext>,
    policy: RetryPolicy,
    guard: Mutex<()>,
    last_outcome: RwLock<Option<OutcomeSummary>>,
}

impl JobRunner {
    pub fn new(
        pipeline: Arc<dyn ScreeningPipeline>,
        ctx: Arc<JobContext>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            pipeline,
            ctx,
            policy,
            guard: Mutex::new(()),
            last_outcome: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &str {
        self.pipeline.name()
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Whether an invocation is in flight
    pub fn is_running(&self) -> bool {
        self.guard.try_lock().is_err()
    }

    pub async fn last_outcome(&self) -> Option<OutcomeSummary> {
        self.last_outcome.read().await.clone()
    }

    /// Run one invocation unless the previous one is still running, in which case the
    /// trigger is dropped.
    pub async fn trigger(&self) -> TriggerOutcome {
        let _running = match self.guard.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!(
                    job = %self.name(),
                    "JobRunner: {} is still running, skipping trigger",
                    self.name()
                );
                if let Some(ref metrics) = self.ctx.metrics {
                    metrics
                        .skipped_triggers_total
                        .with_label_values(&[self.name()])
                        .inc();
                }
                return TriggerOutcome::Skipped;
            }
        };

        TriggerOutcome::Completed(self.run().await)
    }

    /// Drive the state machine to a terminal state.
    async fn run(&self) -> RunnerState {
        let started = Instant::now();
        if let Some(ref metrics) = self.ctx.metrics {
            metrics.job_runs_total.with_label_values(&[self.name()]).inc();
        }
        info!(job = %self.name(), "JobRunner: starting {}", self.name());

        let mut state = RunnerState::Running(1);
        while let RunnerState::Running(attempt) = state {
            state = self.step(attempt).await;
        }

        if let Some(ref metrics) = self.ctx.metrics {
            metrics
                .job_duration_seconds
                .with_label_values(&[self.name()])
                .observe(started.elapsed().as_secs_f64());
        }
        state
    }

    /// Execute attempt number `attempt` and classify the result.
    pub async fn attempt(&self, attempt: u32) -> JobOutcome {
        if let Some(ref metrics) = self.ctx.metrics {
            metrics
                .job_attempts_total
                .with_label_values(&[self.name()])
                .inc();
        }

        match self.pipeline.execute(&self.ctx).await {
            Ok(report) => JobOutcome::Success(report),
            Err(error) if attempt >= self.policy.max_attempts() => JobOutcome::Exhausted {
                error,
                attempts: attempt,
            },
            Err(error) => JobOutcome::TransientFailure { error, attempt },
        }
    }

    async fn step(&self, attempt: u32) -> RunnerState {
        match self.attempt(attempt).await {
            JobOutcome::Success(report) => {
                self.on_success(&report, attempt).await;
                RunnerState::SucceededDone
            }
            JobOutcome::TransientFailure { error, attempt } => {
                self.count_failure();
                warn!(
                    job = %self.name(),
                    attempt,
                    max_attempts = self.policy.max_attempts(),
                    error = %error,
                    "JobRunner: {} attempt {}/{} failed, retrying in {:?}",
                    self.name(),
                    attempt,
                    self.policy.max_attempts(),
                    self.policy.cooldown()
                );
                tokio::time::sleep(self.policy.cooldown()).await;
                RunnerState::Running(attempt + 1)
            }
            JobOutcome::Exhausted { error, attempts } => {
                self.count_failure();
                error!(
                    job = %self.name(),
                    attempts,
                    error = %error,
                    "JobRunner: {} failed after {} attempts, giving up",
                    self.name(),
                    attempts
                );
                let subject = format!("{} failed after {} attempts", self.name(), attempts);
                let body = format!("{} error: {}", self.name(), error);
                self.ctx
                    .notify(NotificationKind::Escalation, &subject, &body)
                    .await;

                self.record(OutcomeSummary {
                    finished_at: Utc::now(),
                    succeeded: false,
                    attempts,
                    target_date: None,
                    candidates: None,
                    error: Some(error.to_string()),
                })
                .await;
                RunnerState::GaveUpDone
            }
        }
    }

    async fn on_success(&self, report: &ScreeningReport, attempts: u32) {
        info!(
            job = %self.name(),
            attempts,
            target_date = %report.target_date,
            candidates = report.candidates.len(),
            "JobRunner: {} succeeded on attempt {}",
            self.name(),
            attempts
        );
        if let Some(ref metrics) = self.ctx.metrics {
            metrics
                .last_candidate_count
                .with_label_values(&[self.name()])
                .set(report.candidates.len() as i64);
        }

        let subject = format!("{} {} result", report.target_date, self.pipeline.title());
        self.ctx
            .notify(NotificationKind::Primary, &subject, &report.body)
            .await;

        self.record(OutcomeSummary {
            finished_at: Utc::now(),
            succeeded: true,
            attempts,
            target_date: Some(report.target_date),
            candidates: Some(report.candidates.len()),
            error: None,
        })
        .await;
    }

    fn count_failure(&self) {
        if let Some(ref metrics) = self.ctx.metrics {
            metrics
                .job_attempt_failures_total
                .with_label_values(&[self.name()])
                .inc();
        }
    }

    async fn record(&self, summary: OutcomeSummary) {
        *self.last_outcome.write().await = Some(summary);
    }
}

#[async_trait]
impl crate::core::scheduler::ScheduledJob for JobRunner {
    fn name(&self) -> &str {
        self.pipeline.name()
    }

    async fn run_scheduled(&self) {
        self.trigger().await;
    }
}
