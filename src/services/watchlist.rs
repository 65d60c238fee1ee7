//! External watchlist registration (side-effecting, non-transactional)

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::error::{Result, ScreenerError};
use crate::models::EntityType;

#[async_trait]
pub trait WatchlistRegistrar: Send + Sync {
    /// Add `codes` to the watchlist group `group`.
    async fn register(&self, codes: &[String], entity_type: EntityType, group: &str) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    codes: &'a [String],
    entity_type: EntityType,
    group: &'a str,
}

/// Posts `{codes, entity_type, group}` as JSON to a watchlist endpoint.
pub struct RestWatchlistRegistrar {
    endpoint: Url,
    client: reqwest::Client,
}

impl RestWatchlistRegistrar {
    pub fn new(endpoint: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            endpoint: Url::parse(endpoint)?,
            client,
        })
    }
}

#[async_trait]
impl WatchlistRegistrar for RestWatchlistRegistrar {
    async fn register(&self, codes: &[String], entity_type: EntityType, group: &str) -> Result<()> {
        let failure = |reason: String| ScreenerError::SideEffectFailure {
            group: group.to_string(),
            reason,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&RegisterRequest {
                codes,
                entity_type,
                group,
            })
            .send()
            .await
            .map_err(|e| failure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(failure(format!("watchlist returned {}: {}", status, body)));
        }

        info!(
            group = %group,
            count = codes.len(),
            "Watchlist: registered {} codes in group '{}'",
            codes.len(),
            group
        );
        Ok(())
    }
}

/// Registrar used when no watchlist endpoint is configured.
pub struct DisabledWatchlist;

#[async_trait]
impl WatchlistRegistrar for DisabledWatchlist {
    async fn register(&self, codes: &[String], _entity_type: EntityType, group: &str) -> Result<()> {
        debug!(
            group = %group,
            count = codes.len(),
            "Watchlist: disabled, skipping registration"
        );
        Ok(())
    }
}
