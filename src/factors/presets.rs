//! Ready-made factors used by the screening workflows

use std::sync::Arc;

use super::expr::{col, gt};
use super::technical::FactorBuilder;
use super::transformers::{
    CrossMaTransformer, ExprTransformer, MaBreakoutTransformer, MacdTransformer,
    VolumeUpTransformer,
};
use super::FILTER_RESULT;
use crate::models::{CombinationMode, EntityId};
use crate::services::market_data::MarketDataProvider;

/// Turnover floor shared by the report factors (400 million).
pub const DEFAULT_TURNOVER_THRESHOLD: f64 = 400_000_000.0;

/// MACD lines with `filter_result = diff > 0 AND dea > 0`. Returned as a builder so
/// callers can keep composing on top of it.
pub fn macd_factor(
    provider: Arc<dyn MarketDataProvider>,
    entity_ids: Vec<EntityId>,
) -> FactorBuilder {
    FactorBuilder::new("macd", provider)
        .entity_ids(entity_ids)
        .transform(MacdTransformer::default())
        .transform(ExprTransformer::new(
            FILTER_RESULT,
            gt("diff", 0.0) & gt("dea", 0.0),
        ))
        .filter(col(FILTER_RESULT))
}

/// MACD above zero, 5/120/250 averages stacked bullishly and turnover above the floor.
pub fn bull_and_up_factor(
    provider: Arc<dyn MarketDataProvider>,
    entity_ids: Vec<EntityId>,
    turnover_threshold: f64,
) -> FactorBuilder {
    macd_factor(provider, entity_ids)
        .name("bull_and_up")
        .transform(CrossMaTransformer::new(&[5, 120, 250]))
        .filter(
            col(FILTER_RESULT) & col(CrossMaTransformer::BULL) & gt("turnover", turnover_threshold),
        )
}

#[derive(Debug, Clone)]
pub struct VolumeUpMaParams {
    pub windows: Vec<usize>,
    pub over_mode: CombinationMode,
    pub up_intervals: usize,
    pub turnover_threshold: f64,
    pub volume_window: usize,
    pub volume_multiple: f64,
}

impl Default for VolumeUpMaParams {
    fn default() -> Self {
        Self {
            windows: vec![120, 250],
            over_mode: CombinationMode::Or,
            up_intervals: 50,
            turnover_threshold: DEFAULT_TURNOVER_THRESHOLD,
            volume_window: 30,
            volume_multiple: 2.0,
        }
    }
}

/// Fresh close above the long averages on expanding volume with enough turnover.
pub fn volume_up_ma_factor(
    provider: Arc<dyn MarketDataProvider>,
    entity_ids: Vec<EntityId>,
    params: &VolumeUpMaParams,
) -> FactorBuilder {
    FactorBuilder::new("volume_up_ma", provider)
        .entity_ids(entity_ids)
        .transform(MaBreakoutTransformer::new(
            &params.windows,
            params.over_mode,
            params.up_intervals,
        ))
        .transform(VolumeUpTransformer::new(
            params.volume_window,
            params.volume_multiple,
        ))
        .filter(
            col(MaBreakoutTransformer::UP)
                & col(VolumeUpTransformer::VOLUME_UP)
                & gt("turnover", params.turnover_threshold),
        )
}
