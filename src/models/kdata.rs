use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::entity::EntityId;

/// One daily bar for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kbar {
    pub entity_id: EntityId,
    pub timestamp: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Traded value. Defaults to `close * volume` when the source omits it.
    pub turnover: f64,
}

impl Kbar {
    pub fn new(
        entity_id: impl Into<EntityId>,
        timestamp: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            turnover: close * volume,
        }
    }

    pub fn with_turnover(mut self, turnover: f64) -> Self {
        self.turnover = turnover;
        self
    }
}

/// Liquidity metric of one entity over a window, used to rank the universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityRecord {
    pub entity_id: EntityId,
    pub turnover: f64,
}

impl LiquidityRecord {
    pub fn new(entity_id: impl Into<EntityId>, turnover: f64) -> Self {
        Self {
            entity_id: entity_id.into(),
            turnover,
        }
    }
}
