//! Logging initialization with environment-based formatters
//!
//! Production deployments emit one JSON object per line for log aggregation; every other
//! environment gets colored human-readable output. `LOG_FORMAT` (`json` | `pretty`)
//! overrides the environment default.

use std::env;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::get_environment;

/// Used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,bullscan=debug";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// Explicit override first, then the deployment environment.
    pub fn resolve(environment: &str, requested: Option<&str>) -> Self {
        match requested.map(|s| s.trim().to_ascii_lowercase()) {
            Some(f) if f == "json" => LogFormat::Json,
            Some(f) if f == "pretty" || f == "text" => LogFormat::Pretty,
            _ if is_production(environment) => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

pub fn is_production(environment: &str) -> bool {
    matches!(environment, "production" | "prod")
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init_logging() {
    let format = LogFormat::resolve(&get_environment(), env::var("LOG_FORMAT").ok().as_deref());
    if let Err(e) = try_init(format) {
        eprintln!("logging already initialized: {}", e);
    }
}

/// Like [`init_logging`] with an explicit format; fails if a global subscriber is set.
pub fn try_init(format: LogFormat) -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stdout),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_ansi(true)
                    .with_writer(std::io::stdout),
            )
            .try_init(),
    }
}
