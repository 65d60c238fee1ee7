//! Job types for the screening workflow

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Duration;

use crate::error::{Result, ScreenerError};
use crate::models::{Entity, EntityId};

/// Fixed finite retry: up to `max_attempts` attempts with a constant cool-down between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    cooldown: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
    pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(180);

    pub fn new(max_attempts: u32, cooldown: Duration) -> Result<Self> {
        if max_attempts == 0 {
            return Err(ScreenerError::Config(
                "retry max attempts must be at least 1".to_string(),
            ));
        }
        if cooldown.is_zero() {
            return Err(ScreenerError::Config(
                "retry cool-down must be strictly positive".to_string(),
            ));
        }
        Ok(Self {
            max_attempts,
            cooldown,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            cooldown: Self::DEFAULT_COOLDOWN,
        }
    }
}

/// Output of one successful pipeline execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreeningReport {
    pub workflow: String,
    pub target_date: NaiveDate,
    /// Entities with an open long signal at `target_date`
    pub candidates: BTreeSet<EntityId>,
    /// Reference records found for the candidates
    pub entities: Vec<Entity>,
    /// Primary notification body
    pub body: String,
    /// `None` when there was nothing to register
    pub watchlist_registered: Option<bool>,
}

/// Result of a single attempt.
#[derive(Debug)]
pub enum JobOutcome {
    Success(ScreeningReport),
    /// Failed with attempts left; the runner cools down and retries.
    TransientFailure { error: ScreenerError, attempt: u32 },
    /// Failed on the last allowed attempt.
    Exhausted { error: ScreenerError, attempts: u32 },
}

/// Retry/escalation state machine. Starts at `Running(1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Running(u32),
    SucceededDone,
    GaveUpDone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Run outcome with the candidate list
    Primary,
    /// Repeated failure, the runner gave up
    Escalation,
    /// Watchlist registration failed
    SideEffect,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Primary => "primary",
            NotificationKind::Escalation => "escalation",
            NotificationKind::SideEffect => "side_effect",
        }
    }
}

/// What a trigger did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Completed(RunnerState),
    /// A previous invocation of the same job was still running.
    Skipped,
}

/// Summary of the last finished invocation, exposed on the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeSummary {
    pub finished_at: DateTime<Utc>,
    pub succeeded: bool,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
