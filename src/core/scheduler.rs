//! Cron-based scheduler binding report jobs to wall-clock triggers

use async_trait::async_trait;
use chrono::{DateTime, Local};
use cron::Schedule;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info};

use crate::error::{Result, ScreenerError};

/// Something a scheduler can fire.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    fn name(&self) -> &str;

    /// Run one invocation. Implementations apply their own re-entrancy policy.
    async fn run_scheduled(&self);
}

/// Clears the liveness flag when the loop task ends, however it ends.
struct LoopAlive(Arc<watch::Sender<bool>>);

impl Drop for LoopAlive {
    fn drop(&mut self) {
        self.0.send_replace(false);
    }
}

/// Fires an injected job on a 6-field cron expression
/// (`sec min hour day-of-month month day-of-week`), evaluated in local time.
///
/// `stop` signals the loop and waits for it to exit; `join` only waits. Both may be
/// called from different tasks at the same time.
pub struct JobScheduler {
    job: Arc<dyn ScheduledJob>,
    expression: String,
    schedule: Schedule,
    shutdown: watch::Sender<bool>,
    alive: Arc<watch::Sender<bool>>,
    /// Serializes start and stop
    lifecycle: Mutex<()>,
}

impl JobScheduler {
    pub fn new(job: Arc<dyn ScheduledJob>, expression: &str) -> Result<Self> {
        let schedule = Schedule::from_str(expression).map_err(|e| {
            ScreenerError::Config(format!(
                "invalid cron expression '{}' for {}: {}",
                expression,
                job.name(),
                e
            ))
        })?;

        info!(
            job = %job.name(),
            cron = %expression,
            "JobScheduler: created for {} (cron: {})",
            job.name(),
            expression
        );

        let (shutdown, _) = watch::channel(false);
        let (alive, _) = watch::channel(false);
        Ok(Self {
            job,
            expression: expression.to_string(),
            schedule,
            shutdown,
            alive: Arc::new(alive),
            lifecycle: Mutex::new(()),
        })
    }

    pub fn name(&self) -> &str {
        self.job.name()
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn next_fire_time(&self) -> Option<DateTime<Local>> {
        self.schedule.upcoming(Local).next()
    }

    /// Start the scheduler loop. Starting a running scheduler is a no-op.
    pub async fn start(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        if self.is_running() {
            debug!(job = %self.name(), "JobScheduler: already started");
            return;
        }

        self.shutdown.send_replace(false);
        self.alive.send_replace(true);
        let alive = LoopAlive(self.alive.clone());
        let mut shutdown = self.shutdown.subscribe();
        let job = self.job.clone();
        let schedule = self.schedule.clone();

        tokio::spawn(async move {
            let _alive = alive;
            info!(job = %job.name(), "JobScheduler: started, waiting for cron schedule...");

            loop {
                let Some(next_tick) = schedule.upcoming(Local).next() else {
                    info!(job = %job.name(), "JobScheduler: schedule has no upcoming times");
                    break;
                };
                let wait = (next_tick - Local::now()).to_std().unwrap_or_default();

                tokio::select! {
                    biased;
                    // also fires when the scheduler itself is dropped
                    _ = async {
                        let _ = shutdown.wait_for(|stop| *stop).await;
                    } => break,
                    _ = tokio::time::sleep(wait) => {}
                }

                debug!(
                    job = %job.name(),
                    tick = %next_tick,
                    "JobScheduler: cron tick for {}",
                    job.name()
                );

                // A run with cool-downs can outlast the next tick
                let job = job.clone();
                tokio::spawn(async move {
                    job.run_scheduled().await;
                });
            }
        });

        info!(job = %self.name(), "JobScheduler: started successfully");
    }

    /// Stop firing new triggers and wait for the loop to exit. Invocations already in
    /// flight keep running.
    pub async fn stop(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        if !self.is_running() {
            return;
        }
        self.shutdown.send_replace(true);
        self.join().await;
        info!(job = %self.name(), "JobScheduler: stopped");
    }

    /// Wait for the scheduler loop to end, either because it was stopped elsewhere or
    /// because the schedule ran out of upcoming times. Returns at once if not started.
    pub async fn join(&self) {
        let mut alive = self.alive.subscribe();
        let _ = alive.wait_for(|running| !*running).await;
    }

    pub fn is_running(&self) -> bool {
        *self.alive.borrow()
    }
}
