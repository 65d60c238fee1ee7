//! Market-data and reference-data provider interface.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::error::{Result, ScreenerError};
use crate::models::{AdjustType, Entity, EntityId, EntityType, Kbar, LiquidityRecord};

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Most recent trading day with bars for `entity_type`
    async fn latest_available_date(
        &self,
        entity_type: EntityType,
        adjust: AdjustType,
    ) -> Result<NaiveDate>;

    /// Liquidity metric (turnover) of every entity of `entity_type` over `[start, end]`
    async fn liquidity(
        &self,
        entity_type: EntityType,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LiquidityRecord>>;

    /// Entity ids ranked by liquidity descending, truncated to the top `fraction`
    async fn top_liquidity_entities(
        &self,
        entity_type: EntityType,
        start: NaiveDate,
        end: NaiveDate,
        fraction: f64,
    ) -> Result<Vec<EntityId>> {
        let records = self.liquidity(entity_type, start, end).await?;
        select_top_liquidity(records, fraction)
    }

    /// Reference records for `ids` from the named reference-data `provider`
    async fn entities_by_id(
        &self,
        provider: &str,
        entity_type: EntityType,
        ids: &[EntityId],
    ) -> Result<Vec<Entity>>;

    /// Daily bars of `entity_ids` within `[start, end]`
    async fn kdata(
        &self,
        entity_ids: &[EntityId],
        start: NaiveDate,
        end: NaiveDate,
        adjust: AdjustType,
    ) -> Result<Vec<Kbar>>;
}

/// Sort by turnover descending (ties by id) and keep the first `floor(n * fraction)` ids.
pub fn select_top_liquidity(
    mut records: Vec<LiquidityRecord>,
    fraction: f64,
) -> Result<Vec<EntityId>> {
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(ScreenerError::InvalidFraction(fraction));
    }

    records.sort_by(|a, b| match b.turnover.total_cmp(&a.turnover) {
        Ordering::Equal => a.entity_id.cmp(&b.entity_id),
        other => other,
    });

    // epsilon absorbs float noise such as 0.29 * 100 = 28.999999999999996
    let keep = ((records.len() as f64) * fraction + 1e-9).floor() as usize;
    Ok(records
        .into_iter()
        .take(keep)
        .map(|r| r.entity_id)
        .collect())
}

/// Provider backed by fixed in-process data. Used for fixtures and dry runs.
#[derive(Debug, Default, Clone)]
pub struct InMemoryMarketData {
    entities: HashMap<EntityId, Entity>,
    bars: Vec<Kbar>,
}

impl InMemoryMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entities.insert(entity.id.clone(), entity);
        self
    }

    pub fn with_bars(mut self, bars: impl IntoIterator<Item = Kbar>) -> Self {
        self.bars.extend(bars);
        self
    }

    fn is_type(&self, entity_id: &str, entity_type: EntityType) -> bool {
        self.entities
            .get(entity_id)
            .is_some_and(|e| e.entity_type == entity_type)
    }
}

#[async_trait]
impl MarketDataProvider for InMemoryMarketData {
    async fn latest_available_date(
        &self,
        entity_type: EntityType,
        _adjust: AdjustType,
    ) -> Result<NaiveDate> {
        self.bars
            .iter()
            .filter(|b| self.is_type(&b.entity_id, entity_type))
            .map(|b| b.timestamp)
            .max()
            .ok_or_else(|| {
                ScreenerError::data_unavailable(
                    format!("{} bars", entity_type),
                    NaiveDate::MIN,
                    NaiveDate::MAX,
                )
            })
    }

    async fn liquidity(
        &self,
        entity_type: EntityType,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LiquidityRecord>> {
        let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
        for bar in &self.bars {
            if bar.timestamp >= start
                && bar.timestamp <= end
                && self.is_type(&bar.entity_id, entity_type)
            {
                *totals.entry(bar.entity_id.as_str()).or_insert(0.0) += bar.turnover;
            }
        }
        Ok(totals
            .into_iter()
            .map(|(id, turnover)| LiquidityRecord::new(id, turnover))
            .collect())
    }

    async fn entities_by_id(
        &self,
        _provider: &str,
        entity_type: EntityType,
        ids: &[EntityId],
    ) -> Result<Vec<Entity>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.entities.get(id))
            .filter(|e| e.entity_type == entity_type)
            .cloned()
            .collect())
    }

    async fn kdata(
        &self,
        entity_ids: &[EntityId],
        start: NaiveDate,
        end: NaiveDate,
        _adjust: AdjustType,
    ) -> Result<Vec<Kbar>> {
        Ok(self
            .bars
            .iter()
            .filter(|b| b.timestamp >= start && b.timestamp <= end)
            .filter(|b| entity_ids.contains(&b.entity_id))
            .cloned()
            .collect())
    }
}
