//! Environment-driven configuration
//!
//! Values come from process environment variables, optionally seeded from a `.env` file by
//! the binary. `ScreenerConfig::from_lookup` takes any key lookup so tests never touch the
//! real environment.

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, ScreenerError};
use crate::jobs::types::RetryPolicy;
use crate::jobs::workflow::ScreeningWorkflow;

pub const DEFAULT_JOBS: &str = "bull,vol_up";
pub const DEFAULT_REFERENCE_PROVIDER: &str = "joinquant";
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Deployment environment name (`ENVIRONMENT`, default `sandbox`)
pub fn get_environment() -> String {
    env::var("ENVIRONMENT").unwrap_or_else(|_| "sandbox".to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierKind {
    Log,
    Email,
    Webhook,
}

impl FromStr for NotifierKind {
    type Err = ScreenerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" => Ok(NotifierKind::Log),
            "email" | "smtp" => Ok(NotifierKind::Email),
            "webhook" => Ok(NotifierKind::Webhook),
            other => Err(ScreenerError::Config(format!("unknown NOTIFIER '{}'", other))),
        }
    }
}

#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub tls: bool,
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("from", &self.from)
            .field("tls", &self.tls)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ScreenerConfig {
    pub environment: String,
    /// Fixed recipient of every notification
    pub operator_email: String,
    pub market_data_url: String,
    pub reference_data_provider: String,
    pub watchlist_url: Option<String>,
    pub notifier: NotifierKind,
    pub smtp: Option<SmtpConfig>,
    pub webhook_url: Option<String>,
    pub retry: RetryPolicy,
    /// Enabled workflow names, in configuration order
    pub jobs: Vec<String>,
    /// Cron expression per enabled workflow
    pub schedules: BTreeMap<String, String>,
    pub run_on_startup: bool,
    pub http_port: u16,
}

impl ScreenerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| ScreenerError::Config(format!("{} must be set", key)))
        };

        let notifier = match get("NOTIFIER") {
            Some(kind) => kind.parse()?,
            None => NotifierKind::Log,
        };

        let smtp = match notifier {
            NotifierKind::Email => Some(SmtpConfig {
                host: required("SMTP_HOST")?,
                port: parse_or(get("SMTP_PORT"), "SMTP_PORT", 465)?,
                username: required("SMTP_USERNAME")?,
                password: required("SMTP_PASSWORD")?,
                from: get("SMTP_FROM")
                    .or_else(|| get("SMTP_USERNAME"))
                    .unwrap_or_default(),
                tls: parse_or(get("SMTP_TLS"), "SMTP_TLS", true)?,
            }),
            _ => None,
        };

        let webhook_url = get("NOTIFIER_WEBHOOK_URL");
        if notifier == NotifierKind::Webhook && webhook_url.is_none() {
            return Err(ScreenerError::Config(
                "NOTIFIER_WEBHOOK_URL must be set for the webhook notifier".to_string(),
            ));
        }

        let max_attempts = parse_or(get("RETRY_MAX_ATTEMPTS"), "RETRY_MAX_ATTEMPTS", 10u32)?;
        let cooldown_secs = parse_or(get("RETRY_COOLDOWN_SECONDS"), "RETRY_COOLDOWN_SECONDS", 180u64)?;
        let retry = RetryPolicy::new(max_attempts, Duration::from_secs(cooldown_secs))?;

        let jobs: Vec<String> = get("SCREEN_JOBS")
            .unwrap_or_else(|| DEFAULT_JOBS.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if jobs.is_empty() {
            return Err(ScreenerError::Config("SCREEN_JOBS lists no jobs".to_string()));
        }

        let mut schedules = BTreeMap::new();
        for job in &jobs {
            let workflow = ScreeningWorkflow::preset(job)
                .ok_or_else(|| ScreenerError::Config(format!("unknown job '{}'", job)))?;
            let key = format!("{}_SCHEDULE", job.to_ascii_uppercase());
            let schedule = get(&key).unwrap_or_else(|| workflow.default_schedule.to_string());
            schedules.insert(job.clone(), schedule);
        }

        Ok(Self {
            environment: get("ENVIRONMENT").unwrap_or_else(|| "sandbox".to_string()),
            operator_email: required("OPERATOR_EMAIL")?,
            market_data_url: required("MARKET_DATA_URL")?,
            reference_data_provider: get("REFERENCE_DATA_PROVIDER")
                .unwrap_or_else(|| DEFAULT_REFERENCE_PROVIDER.to_string()),
            watchlist_url: get("WATCHLIST_URL"),
            notifier,
            smtp,
            webhook_url,
            retry,
            jobs,
            schedules,
            run_on_startup: parse_or(get("RUN_ON_STARTUP"), "RUN_ON_STARTUP", true)?,
            http_port: parse_or(get("HTTP_PORT"), "HTTP_PORT", DEFAULT_HTTP_PORT)?,
        })
    }

    pub fn schedule_for(&self, job: &str) -> Option<&str> {
        self.schedules.get(job).map(String::as_str)
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|_| ScreenerError::Config(format!("invalid value '{}' for {}", raw, key))),
        None => Ok(default),
    }
}
