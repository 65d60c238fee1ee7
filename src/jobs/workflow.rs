//! Screening workflow definitions
//!
//! A workflow is the fixed description of one report job. Each attempt runs:
//! latest available date → liquidity universe → selector → open-long targets →
//! entity lookup → watchlist registration (isolated) → report.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

use crate::error::Result;
use crate::factors::presets::{
    bull_and_up_factor, volume_up_ma_factor, VolumeUpMaParams, DEFAULT_TURNOVER_THRESHOLD,
};
use crate::factors::TechnicalFactor;
use crate::jobs::context::JobContext;
use crate::jobs::handlers;
use crate::jobs::types::ScreeningReport;
use crate::models::{AdjustType, CombinationMode, EntityId, EntityType};
use crate::services::market_data::MarketDataProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorPreset {
    BullAndUp,
    VolumeUpMa,
}

impl FactorPreset {
    pub fn build(
        &self,
        provider: Arc<dyn MarketDataProvider>,
        entity_ids: Vec<EntityId>,
        adjust: AdjustType,
    ) -> Result<TechnicalFactor> {
        let builder = match self {
            FactorPreset::BullAndUp => {
                bull_and_up_factor(provider, entity_ids, DEFAULT_TURNOVER_THRESHOLD)
            }
            FactorPreset::VolumeUpMa => {
                volume_up_ma_factor(provider, entity_ids, &VolumeUpMaParams::default())
            }
        };
        builder.adjust(adjust).build()
    }
}

#[derive(Debug, Clone)]
pub struct ScreeningWorkflow {
    pub name: String,
    /// Human label used in the primary notification subject
    pub title: String,
    /// Watchlist group the candidates are registered under
    pub group: String,
    pub mode: CombinationMode,
    pub factors: Vec<FactorPreset>,
    pub entity_type: EntityType,
    pub adjust: AdjustType,
    /// Days before the target date used to rank liquidity
    pub universe_lookback_days: i64,
    pub top_fraction: f64,
    /// First date of bar history loaded for the factors
    pub history_start: NaiveDate,
    pub default_schedule: &'static str,
}

impl ScreeningWorkflow {
    pub const BULL: &'static str = "bull";
    pub const VOL_UP: &'static str = "vol_up";

    fn base(name: &str, title: &str, group: &str) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            group: group.to_string(),
            mode: CombinationMode::And,
            factors: Vec::new(),
            entity_type: EntityType::Stock,
            adjust: AdjustType::Hfq,
            universe_lookback_days: 30,
            top_fraction: 0.4,
            history_start: NaiveDate::from_ymd_opt(2019, 1, 1).unwrap_or(NaiveDate::MIN),
            default_schedule: "0 30 18 * * Mon-Fri",
        }
    }

    /// MACD above zero with bullishly stacked averages.
    pub fn bull() -> Self {
        Self {
            factors: vec![FactorPreset::BullAndUp],
            ..Self::base(Self::BULL, "bull and up", "bull")
        }
    }

    /// Long-average breakout on expanding volume.
    pub fn vol_up() -> Self {
        Self {
            mode: CombinationMode::Or,
            factors: vec![FactorPreset::VolumeUpMa],
            default_schedule: "0 0 19 * * Mon-Fri",
            ..Self::base(Self::VOL_UP, "volume breakout", "tech")
        }
    }

    pub fn preset(name: &str) -> Option<Self> {
        match name {
            Self::BULL => Some(Self::bull()),
            Self::VOL_UP => Some(Self::vol_up()),
            _ => None,
        }
    }

    /// One factor per preset, each scoped to `pool`.
    pub fn build_factors(
        &self,
        provider: Arc<dyn MarketDataProvider>,
        pool: &[EntityId],
    ) -> Result<Vec<TechnicalFactor>> {
        self.factors
            .iter()
            .map(|preset| preset.build(provider.clone(), pool.to_vec(), self.adjust))
            .collect()
    }
}

/// One attempt of a report job. The runner only sees this seam.
#[async_trait]
pub trait ScreeningPipeline: Send + Sync {
    fn name(&self) -> &str;
    fn title(&self) -> &str;
    async fn execute(&self, ctx: &JobContext) -> Result<ScreeningReport>;
}

#[async_trait]
impl ScreeningPipeline for ScreeningWorkflow {
    fn name(&self) -> &str {
        &self.name
    }

    fn title(&self) -> &str {
        &self.title
    }

    async fn execute(&self, ctx: &JobContext) -> Result<ScreeningReport> {
        handlers::handle_screening(self, ctx).await
    }
}
