//! Status server: health, Prometheus metrics, job status and manual triggers

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

use crate::core::runtime::{JobStatus, ScreenerRuntime};
use crate::jobs::TriggerOutcome;
use crate::metrics::Metrics;

pub const SERVICE_NAME: &str = "bullscan-worker";

#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<Metrics>,
    pub runtime: Arc<ScreenerRuntime>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(metrics: Arc<Metrics>, runtime: Arc<ScreenerRuntime>) -> Self {
        Self {
            metrics,
            runtime,
            start_time: Instant::now(),
        }
    }
}

/// `degraded` once any job's latest run gave up; the process itself still answers.
fn overall_status(jobs: &[JobStatus]) -> &'static str {
    let gave_up = jobs
        .iter()
        .filter_map(|job| job.last_outcome.as_ref())
        .any(|outcome| !outcome.succeeded);
    if gave_up {
        "degraded"
    } else {
        "healthy"
    }
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let jobs = state.runtime.statuses().await;
    Json(json!({
        "status": overall_status(&jobs),
        "uptime_seconds": state.start_time.elapsed().as_secs(),
        "service": SERVICE_NAME,
        "jobs": state.runtime.job_names(),
    }))
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics.export() {
        Ok(body) => body.into_response(),
        Err(e) => {
            warn!(error = %e, "HTTP: metrics export failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn list_jobs(State(state): State<AppState>) -> Json<Vec<JobStatus>> {
    Json(state.runtime.statuses().await)
}

/// Start a run in the background. 409 when the job is already running.
async fn trigger_job(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let runner = state.runtime.runner(&name).ok_or(StatusCode::NOT_FOUND)?;

    if runner.is_running() {
        return Ok((
            StatusCode::CONFLICT,
            Json(json!({ "job": name, "status": "already_running" })),
        ));
    }

    info!(job = %name, "HTTP: manual trigger of {}", name);
    tokio::spawn(async move {
        // lost the race against a scheduled tick
        if runner.trigger().await == TriggerOutcome::Skipped {
            info!(job = %runner.name(), "HTTP: manual trigger of {} was skipped", runner.name());
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "job": name, "status": "started" })),
    ))
}

async fn track_requests(State(metrics): State<Arc<Metrics>>, request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    metrics.http_requests_in_flight.inc();
    let response = next.run(request).await;
    metrics.http_requests_in_flight.dec();

    let elapsed = started.elapsed();
    metrics.http_requests_total.inc();
    metrics
        .http_request_duration_seconds
        .observe(elapsed.as_secs_f64());

    if response.status().is_server_error() {
        tracing::error!(
            method = %method,
            path = %path,
            status = %response.status(),
            duration_ms = elapsed.as_millis(),
            "HTTP request error"
        );
    }
    response
}

pub fn create_router(state: AppState) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::DEBUG));

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/jobs", get(list_jobs))
        .route("/jobs/{name}/trigger", post(trigger_job))
        .layer(
            ServiceBuilder::new()
                .layer(tracing_layer)
                .layer(middleware::from_fn_with_state(
                    state.metrics.clone(),
                    track_requests,
                ))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

pub async fn start_server(state: AppState, port: u16) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "HTTP: status server listening on port {}", port);
    axum::serve(listener, create_router(state)).await
}
