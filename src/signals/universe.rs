//! Universe builder: bounds selector cost by keeping the most liquid entities.

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{Result, ScreenerError};
use crate::models::{EntityId, EntityType};
use crate::services::market_data::MarketDataProvider;

pub struct UniverseBuilder {
    provider: Arc<dyn MarketDataProvider>,
}

impl UniverseBuilder {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { provider }
    }

    /// Top `top_fraction` of `entity_type` by liquidity over `[start, end]`, most liquid
    /// first.
    ///
    /// No liquidity rows at all is `DataUnavailable`. A universe too small for the fraction
    /// to keep anyone yields an empty pool.
    pub async fn build(
        &self,
        entity_type: EntityType,
        start: NaiveDate,
        end: NaiveDate,
        top_fraction: f64,
    ) -> Result<Vec<EntityId>> {
        if !(top_fraction > 0.0 && top_fraction <= 1.0) {
            return Err(ScreenerError::InvalidFraction(top_fraction));
        }
        if end < start {
            return Err(ScreenerError::InvalidRange { start, end });
        }

        let pool = self
            .provider
            .top_liquidity_entities(entity_type, start, end, top_fraction)
            .await?;
        if pool.is_empty() {
            let universe = self.provider.liquidity(entity_type, start, end).await?.len();
            if universe == 0 {
                return Err(ScreenerError::data_unavailable(
                    format!("{} liquidity", entity_type),
                    start,
                    end,
                ));
            }
            warn!(
                entity_type = %entity_type,
                universe,
                top_fraction,
                "UniverseBuilder: top {} of {} {} entities keeps none",
                top_fraction,
                universe,
                entity_type
            );
            return Ok(pool);
        }

        info!(
            entity_type = %entity_type,
            pool = pool.len(),
            top_fraction,
            "UniverseBuilder: kept {} {} entities",
            pool.len(),
            entity_type
        );
        Ok(pool)
    }
}
