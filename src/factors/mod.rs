//! Factors: per-entity, per-timestamp boolean "passes filter" signals.

pub mod expr;
pub mod presets;
pub mod technical;
pub mod transformers;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{EntityId, Frame, ResultFrame};

pub use expr::{col, col_gt, gt, lt, FilterExpr};
pub use presets::{bull_and_up_factor, macd_factor, volume_up_ma_factor, VolumeUpMaParams};
pub use technical::{FactorBuilder, TechnicalFactor};
pub use transformers::{
    CrossMaTransformer, ExprTransformer, MaBreakoutTransformer, MacdTransformer, Transformer,
    TransformerChain, VolumeUpTransformer,
};

/// Name of the boolean column every factor's result frame carries.
pub const FILTER_RESULT: &str = "filter_result";

#[async_trait]
pub trait Factor: Send + Sync {
    fn name(&self) -> &str;

    /// Entities this factor was created for.
    fn entity_ids(&self) -> &[EntityId];

    /// Load data for `[start, end]`, derive the factor frame and return the result frame.
    ///
    /// Fails with `DataUnavailable` when the range has no rows, so "ran and found nothing"
    /// stays distinguishable from "could not run".
    async fn compute_result(&mut self, start: NaiveDate, end: NaiveDate) -> Result<ResultFrame>;

    /// Frame from the last successful `compute_result`.
    fn factor_df(&self) -> Option<&Frame>;

    /// Result frame from the last successful `compute_result`.
    fn result_df(&self) -> Option<&ResultFrame>;
}
