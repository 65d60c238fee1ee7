//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use bullscan::core::http::{create_router, AppState};
use bullscan::core::runtime::ScreenerRuntime;
use bullscan::error::{Result, ScreenerError};
use bullscan::jobs::{
    JobContext, JobRunner, RetryPolicy, ScreeningPipeline, ScreeningReport, ScreeningWorkflow,
};
use bullscan::metrics::Metrics;
use bullscan::models::{AdjustType, Entity, EntityId, EntityType, Kbar, LiquidityRecord};
use bullscan::services::{InMemoryMarketData, MarketDataProvider, Notifier, WatchlistRegistrar};
use chrono::{Duration as ChronoDuration, NaiveDate};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const OPERATOR: &str = "operator@example.com";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// First bar date of every fixture series.
pub fn first_day() -> NaiveDate {
    date(2023, 1, 1)
}

/// Last bar date of a 300-day fixture series.
pub fn last_day() -> NaiveDate {
    date(2023, 10, 27)
}

pub fn series(entity_id: &str, closes: &[f64], volumes: &[f64]) -> Vec<Kbar> {
    closes
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (close, volume))| {
            Kbar::new(
                entity_id,
                first_day() + ChronoDuration::days(i as i64),
                *close,
                close * 1.01,
                close * 0.99,
                *close,
                *volume,
            )
        })
        .collect()
}

pub fn linear(days: usize, base: f64, step: f64) -> Vec<f64> {
    (0..days).map(|i| base + step * i as f64).collect()
}

/// Five stocks over 300 days:
/// - 000002 falls and is the most liquid
/// - 000001 rises and is second most liquid
/// - 000003..000005 rise but are too illiquid to enter a 40% universe
pub fn bull_market() -> InMemoryMarketData {
    let days = 300;
    let mut market = InMemoryMarketData::new();
    let fixtures = [
        ("000001", "Rising One", Some("machinery"), 1.0, 3e7),
        ("000002", "Falling Two", None, -0.1, 2e8),
        ("000003", "Rising Three", None, 1.0, 1e6),
        ("000004", "Rising Four", None, 1.0, 1e6),
        ("000005", "Rising Five", None, 1.0, 1e6),
    ];
    for (code, name, industries, step, volume) in fixtures {
        let mut entity = Entity::new(EntityType::Stock, "sz", code, name);
        if let Some(industries) = industries {
            entity = entity.with_industries(industries);
        }
        let id = entity.id.clone();
        market = market
            .with_entity(entity)
            .with_bars(series(&id, &linear(days, 100.0, step), &vec![volume; days]));
    }
    market
}

/// Three stocks over 300 days; 000010 drifts down, then closes far above its long
/// averages on the last day with five times its usual volume.
pub fn breakout_market() -> InMemoryMarketData {
    let days = 300;
    let mut closes = linear(days - 1, 200.0, -0.3);
    closes.push(250.0);
    let mut volumes = vec![1e7; days - 1];
    volumes.push(5e7);

    let breakout = Entity::new(EntityType::Stock, "sh", "000010", "Breakout");
    let breakout_id = breakout.id.clone();
    let mut market = InMemoryMarketData::new()
        .with_entity(breakout)
        .with_bars(series(&breakout_id, &closes, &volumes));

    for code in ["000011", "000012"] {
        let entity = Entity::new(EntityType::Stock, "sh", code, code);
        let id = entity.id.clone();
        market = market
            .with_entity(entity)
            .with_bars(series(&id, &vec![10.0; days], &vec![1e5; days]));
    }
    market
}

/// Market data whose reference-data lookup knows no entities.
pub struct WithoutReferenceData(pub InMemoryMarketData);

#[async_trait]
impl MarketDataProvider for WithoutReferenceData {
    async fn latest_available_date(
        &self,
        entity_type: EntityType,
        adjust: AdjustType,
    ) -> Result<NaiveDate> {
        self.0.latest_available_date(entity_type, adjust).await
    }

    async fn liquidity(
        &self,
        entity_type: EntityType,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LiquidityRecord>> {
        self.0.liquidity(entity_type, start, end).await
    }

    async fn entities_by_id(
        &self,
        _provider: &str,
        _entity_type: EntityType,
        _ids: &[EntityId],
    ) -> Result<Vec<Entity>> {
        Ok(Vec::new())
    }

    async fn kdata(
        &self,
        entity_ids: &[EntityId],
        start: NaiveDate,
        end: NaiveDate,
        adjust: AdjustType,
    ) -> Result<Vec<Kbar>> {
        self.0.kdata(entity_ids, start, end, adjust).await
    }
}

/// Two liquid, rising stocks: too few for a 40% universe to keep either.
pub fn tiny_market() -> InMemoryMarketData {
    let days = 300;
    let mut market = InMemoryMarketData::new();
    for code in ["000021", "000022"] {
        let entity = Entity::new(EntityType::Stock, "sz", code, code);
        let id = entity.id.clone();
        market = market
            .with_entity(entity)
            .with_bars(series(&id, &linear(days, 100.0, 1.0), &vec![3e7; days]));
    }
    market
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentMessage>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        self.sent.lock().unwrap().push(SentMessage {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingWatchlist {
    calls: Mutex<Vec<(Vec<String>, String)>>,
    fail: bool,
}

impl RecordingWatchlist {
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn calls(&self) -> Vec<(Vec<String>, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl WatchlistRegistrar for RecordingWatchlist {
    async fn register(&self, codes: &[String], _entity_type: EntityType, group: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((codes.to_vec(), group.to_string()));
        if self.fail {
            return Err(ScreenerError::SideEffectFailure {
                group: group.to_string(),
                reason: "watchlist offline".to_string(),
            });
        }
        Ok(())
    }
}

/// Runner for `workflow` over `market`, with recording side effects.
pub struct Harness {
    pub runner: Arc<JobRunner>,
    pub notifier: Arc<RecordingNotifier>,
    pub watchlist: Arc<RecordingWatchlist>,
    pub metrics: Arc<Metrics>,
}

impl Harness {
    pub fn new(
        workflow: ScreeningWorkflow,
        market: InMemoryMarketData,
        watchlist: RecordingWatchlist,
        max_attempts: u32,
    ) -> Self {
        Self::with_provider(workflow, Arc::new(market), watchlist, max_attempts)
    }

    pub fn with_provider(
        workflow: ScreeningWorkflow,
        provider: Arc<dyn MarketDataProvider>,
        watchlist: RecordingWatchlist,
        max_attempts: u32,
    ) -> Self {
        let notifier = Arc::new(RecordingNotifier::default());
        let watchlist = Arc::new(watchlist);
        let metrics = Arc::new(Metrics::new().expect("metrics initialization"));
        let ctx = JobContext::new(
            provider,
            watchlist.clone(),
            notifier.clone(),
            OPERATOR,
        )
        .with_metrics(metrics.clone());
        let policy = RetryPolicy::new(max_attempts, Duration::from_millis(5)).unwrap();

        Self {
            runner: Arc::new(JobRunner::new(Arc::new(workflow), Arc::new(ctx), policy)),
            notifier,
            watchlist,
            metrics,
        }
    }
}

/// Pipeline that sleeps, then reports no targets or fails.
pub struct SleepyPipeline {
    pub delay: Duration,
    pub fail: bool,
}

#[async_trait]
impl ScreeningPipeline for SleepyPipeline {
    fn name(&self) -> &str {
        "sleepy"
    }

    fn title(&self) -> &str {
        "sleepy screen"
    }

    async fn execute(&self, _ctx: &JobContext) -> Result<ScreeningReport> {
        tokio::time::sleep(self.delay).await;
        if self.fail {
            return Err(ScreenerError::data_unavailable(
                "kdata",
                date(2024, 2, 1),
                date(2024, 3, 1),
            ));
        }
        Ok(ScreeningReport {
            workflow: "sleepy".to_string(),
            target_date: date(2024, 3, 1),
            candidates: Default::default(),
            entities: Vec::new(),
            body: "no targets".to_string(),
            watchlist_registered: None,
        })
    }
}

/// Status server over a runtime with a single `sleepy` job.
pub struct TestApp {
    pub server: TestServer,
    pub notifier: Arc<RecordingNotifier>,
    pub runtime: Arc<ScreenerRuntime>,
}

impl TestApp {
    pub fn new(delay: Duration) -> Self {
        Self::with_pipeline(SleepyPipeline { delay, fail: false })
    }

    pub fn failing() -> Self {
        Self::with_pipeline(SleepyPipeline {
            delay: Duration::from_millis(1),
            fail: true,
        })
    }

    fn with_pipeline(pipeline: SleepyPipeline) -> Self {
        let notifier = Arc::new(RecordingNotifier::default());
        let metrics = Arc::new(Metrics::new().expect("metrics initialization"));
        let ctx = JobContext::new(
            Arc::new(InMemoryMarketData::new()),
            Arc::new(RecordingWatchlist::default()),
            notifier.clone(),
            OPERATOR,
        )
        .with_metrics(metrics.clone());
        let runner = JobRunner::new(
            Arc::new(pipeline),
            Arc::new(ctx),
            RetryPolicy::new(1, Duration::from_millis(1)).unwrap(),
        );

        let mut runtime = ScreenerRuntime::new();
        runtime
            .register(Arc::new(runner), "0 30 18 * * Mon-Fri")
            .expect("register job");
        let runtime = Arc::new(runtime);

        let router = create_router(AppState::new(metrics, runtime.clone()));
        let server = TestServer::new(router).expect("start test server");

        Self {
            server,
            notifier,
            runtime,
        }
    }
}
