//! Screener runtime: one runner and one scheduler per enabled job

use chrono::{DateTime, Local};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::config::ScreenerConfig;
use crate::core::scheduler::{JobScheduler, ScheduledJob};
use crate::error::{Result, ScreenerError};
use crate::jobs::{JobContext, JobRunner, OutcomeSummary, ScreeningWorkflow, TriggerOutcome};

struct JobEntry {
    runner: Arc<JobRunner>,
    scheduler: JobScheduler,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub name: String,
    pub schedule: String,
    pub scheduled: bool,
    pub running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_fire_time: Option<DateTime<Local>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_outcome: Option<OutcomeSummary>,
}

#[derive(Default)]
pub struct ScreenerRuntime {
    jobs: Vec<JobEntry>,
}

impl ScreenerRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner and scheduler for every job listed in `config`, sharing `ctx`.
    pub fn from_config(config: &ScreenerConfig, ctx: Arc<JobContext>) -> Result<Self> {
        let mut runtime = Self::new();
        for name in &config.jobs {
            let workflow = ScreeningWorkflow::preset(name)
                .ok_or_else(|| ScreenerError::Config(format!("unknown job '{}'", name)))?;
            let expression = config
                .schedule_for(name)
                .unwrap_or(workflow.default_schedule)
                .to_string();
            let runner = JobRunner::new(Arc::new(workflow), ctx.clone(), config.retry);
            runtime.register(Arc::new(runner), &expression)?;
        }
        Ok(runtime)
    }

    /// Bind `runner` to a cron expression. Job names must be unique.
    pub fn register(&mut self, runner: Arc<JobRunner>, expression: &str) -> Result<()> {
        if self.runner(runner.name()).is_some() {
            return Err(ScreenerError::Config(format!(
                "job '{}' registered twice",
                runner.name()
            )));
        }
        let scheduler = JobScheduler::new(runner.clone() as Arc<dyn ScheduledJob>, expression)?;
        self.jobs.push(JobEntry { runner, scheduler });
        Ok(())
    }

    pub fn job_names(&self) -> Vec<&str> {
        self.jobs.iter().map(|entry| entry.runner.name()).collect()
    }

    pub fn runner(&self, name: &str) -> Option<Arc<JobRunner>> {
        self.jobs
            .iter()
            .find(|entry| entry.runner.name() == name)
            .map(|entry| entry.runner.clone())
    }

    /// Run every job once, in registration order, before scheduling starts.
    pub async fn run_startup(&self) -> Vec<(String, TriggerOutcome)> {
        let mut outcomes = Vec::with_capacity(self.jobs.len());
        for entry in &self.jobs {
            info!(job = %entry.runner.name(), "ScreenerRuntime: startup run of {}", entry.runner.name());
            let outcome = entry.runner.trigger().await;
            outcomes.push((entry.runner.name().to_string(), outcome));
        }
        outcomes
    }

    pub async fn start(&self) {
        for entry in &self.jobs {
            entry.scheduler.start().await;
        }
        info!(jobs = self.jobs.len(), "ScreenerRuntime: {} schedulers started", self.jobs.len());
    }

    pub async fn stop(&self) {
        for entry in &self.jobs {
            entry.scheduler.stop().await;
        }
        info!("ScreenerRuntime: schedulers stopped");
    }

    pub async fn statuses(&self) -> Vec<JobStatus> {
        let mut statuses = Vec::with_capacity(self.jobs.len());
        for entry in &self.jobs {
            statuses.push(JobStatus {
                name: entry.runner.name().to_string(),
                schedule: entry.scheduler.expression().to_string(),
                scheduled: entry.scheduler.is_running(),
                running: entry.runner.is_running(),
                next_fire_time: entry.scheduler.next_fire_time(),
                last_outcome: entry.runner.last_outcome().await,
            });
        }
        statuses
    }
}
