//! Market data provider backed by a JSON REST service
//!
//! Endpoints (relative to the base url):
//! - `GET latest_date?entity_type=&adjust=` -> `{"date": "YYYY-MM-DD"}`
//! - `GET liquidity?entity_type=&start=&end=` -> `[LiquidityRecord]`
//! - `GET entities?provider=&entity_type=&ids=a,b` -> `[Entity]`
//! - `GET kdata?entity_ids=a,b&start=&end=&adjust=` -> `[Kbar]`

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Result, ScreenerError};
use crate::models::{AdjustType, Entity, EntityId, EntityType, Kbar, LiquidityRecord};
use crate::services::market_data::MarketDataProvider;

#[derive(Debug, Deserialize)]
struct LatestDate {
    date: NaiveDate,
}

#[derive(Debug)]
struct RequestError {
    retryable: bool,
    message: String,
}

pub struct RestMarketDataProvider {
    base_url: Url,
    client: reqwest::Client,
    backoff: ExponentialBuilder,
}

impl RestMarketDataProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Self::with_client(base_url, client)
    }

    pub fn with_client(base_url: &str, client: reqwest::Client) -> Result<Self> {
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Ok(Self {
            base_url: Url::parse(&base)?,
            client,
            backoff: ExponentialBuilder::default()
                .with_min_delay(Duration::from_millis(500))
                .with_max_times(3),
        })
    }

    /// Override the per-request retry policy (transport errors and 5xx only).
    pub fn with_backoff(mut self, backoff: ExponentialBuilder) -> Self {
        self.backoff = backoff;
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.base_url.join(path)?;
        let (client, url) = (&self.client, &url);
        let fetch = move || async move {
            let response = client
                .get(url.clone())
                .query(query)
                .send()
                .await
                .map_err(|e| RequestError {
                    retryable: true,
                    message: e.to_string(),
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(RequestError {
                    retryable: status.is_server_error(),
                    message: format!("{} returned {}", path, status),
                });
            }
            response.json::<T>().await.map_err(|e| RequestError {
                retryable: false,
                message: format!("{}: invalid body: {}", path, e),
            })
        };

        let value = fetch
            .retry(self.backoff.clone())
            .when(|e: &RequestError| e.retryable)
            .notify(|e: &RequestError, after: Duration| {
                warn!(
                    path = %path,
                    error = %e.message,
                    retry_in_ms = after.as_millis() as u64,
                    "RestMarketDataProvider: request failed, retrying"
                );
            })
            .await
            .map_err(|e| ScreenerError::Provider(e.message))?;

        debug!(path = %path, "RestMarketDataProvider: fetched {}", path);
        Ok(value)
    }
}

fn join_ids(ids: &[EntityId]) -> String {
    ids.join(",")
}

#[async_trait]
impl MarketDataProvider for RestMarketDataProvider {
    async fn latest_available_date(
        &self,
        entity_type: EntityType,
        adjust: AdjustType,
    ) -> Result<NaiveDate> {
        let latest: LatestDate = self
            .get_json(
                "latest_date",
                &[
                    ("entity_type", entity_type.to_string()),
                    ("adjust", adjust.as_str().to_string()),
                ],
            )
            .await?;
        Ok(latest.date)
    }

    async fn liquidity(
        &self,
        entity_type: EntityType,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LiquidityRecord>> {
        self.get_json(
            "liquidity",
            &[
                ("entity_type", entity_type.to_string()),
                ("start", start.to_string()),
                ("end", end.to_string()),
            ],
        )
        .await
    }

    async fn entities_by_id(
        &self,
        provider: &str,
        entity_type: EntityType,
        ids: &[EntityId],
    ) -> Result<Vec<Entity>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.get_json(
            "entities",
            &[
                ("provider", provider.to_string()),
                ("entity_type", entity_type.to_string()),
                ("ids", join_ids(ids)),
            ],
        )
        .await
    }

    async fn kdata(
        &self,
        entity_ids: &[EntityId],
        start: NaiveDate,
        end: NaiveDate,
        adjust: AdjustType,
    ) -> Result<Vec<Kbar>> {
        self.get_json(
            "kdata",
            &[
                ("entity_ids", join_ids(entity_ids)),
                ("start", start.to_string()),
                ("end", end.to_string()),
                ("adjust", adjust.as_str().to_string()),
            ],
        )
        .await
    }
}
