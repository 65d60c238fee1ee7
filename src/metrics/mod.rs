//! Prometheus metrics for the screener process

use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge,
    IntGaugeVec, Opts, Registry, TextEncoder,
};

pub struct Metrics {
    registry: Registry,

    pub http_requests_total: IntCounter,
    pub http_requests_in_flight: IntGauge,
    pub http_request_duration_seconds: Histogram,

    /// Invocations started, by job
    pub job_runs_total: IntCounterVec,
    pub job_attempts_total: IntCounterVec,
    pub job_attempt_failures_total: IntCounterVec,
    pub job_duration_seconds: HistogramVec,
    pub last_candidate_count: IntGaugeVec,
    /// Triggers dropped because the job was still running
    pub skipped_triggers_total: IntCounterVec,
    pub side_effect_failures_total: IntCounterVec,

    /// Delivered notifications, by kind
    pub notifications_total: IntCounterVec,
    pub notification_failures_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("bullscan".to_string()), None)?;

        let http_requests_total =
            IntCounter::with_opts(Opts::new("http_requests_total", "HTTP requests served"))?;
        let http_requests_in_flight = IntGauge::with_opts(Opts::new(
            "http_requests_in_flight",
            "HTTP requests currently being served",
        ))?;
        let http_request_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency",
        ))?;

        let job_runs_total = IntCounterVec::new(
            Opts::new("job_runs_total", "Report job invocations started"),
            &["job"],
        )?;
        let job_attempts_total = IntCounterVec::new(
            Opts::new("job_attempts_total", "Pipeline attempts executed"),
            &["job"],
        )?;
        let job_attempt_failures_total = IntCounterVec::new(
            Opts::new("job_attempt_failures_total", "Pipeline attempts that failed"),
            &["job"],
        )?;
        // Runs may include up to nine cool-downs of several minutes
        let job_duration_seconds = HistogramVec::new(
            HistogramOpts::new("job_duration_seconds", "Wall time of a report job invocation")
                .buckets(vec![1.0, 5.0, 15.0, 60.0, 300.0, 900.0, 1800.0, 3600.0]),
            &["job"],
        )?;
        let last_candidate_count = IntGaugeVec::new(
            Opts::new("last_candidate_count", "Candidates in the last successful run"),
            &["job"],
        )?;
        let skipped_triggers_total = IntCounterVec::new(
            Opts::new(
                "skipped_triggers_total",
                "Triggers dropped while the job was still running",
            ),
            &["job"],
        )?;
        let side_effect_failures_total = IntCounterVec::new(
            Opts::new(
                "side_effect_failures_total",
                "Watchlist registrations that failed",
            ),
            &["job"],
        )?;
        let notifications_total = IntCounterVec::new(
            Opts::new("notifications_total", "Notifications delivered"),
            &["kind"],
        )?;
        let notification_failures_total = IntCounterVec::new(
            Opts::new("notification_failures_total", "Notifications that failed to deliver"),
            &["kind"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_requests_in_flight.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(job_runs_total.clone()))?;
        registry.register(Box::new(job_attempts_total.clone()))?;
        registry.register(Box::new(job_attempt_failures_total.clone()))?;
        registry.register(Box::new(job_duration_seconds.clone()))?;
        registry.register(Box::new(last_candidate_count.clone()))?;
        registry.register(Box::new(skipped_triggers_total.clone()))?;
        registry.register(Box::new(side_effect_failures_total.clone()))?;
        registry.register(Box::new(notifications_total.clone()))?;
        registry.register(Box::new(notification_failures_total.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_requests_in_flight,
            http_request_duration_seconds,
            job_runs_total,
            job_attempts_total,
            job_attempt_failures_total,
            job_duration_seconds,
            last_candidate_count,
            skipped_triggers_total,
            side_effect_failures_total,
            notifications_total,
            notification_failures_total,
        })
    }

    /// Text exposition format
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
