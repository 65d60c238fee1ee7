//! Bar-backed factor built from transformers and a final filter expression

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use super::expr::FilterExpr;
use super::transformers::{apply, Transformer, TransformerChain};
use super::{Factor, FILTER_RESULT};
use crate::error::{Result, ScreenerError};
use crate::models::{AdjustType, EntityId, Frame, ResultFrame};
use crate::services::market_data::MarketDataProvider;

/// Composes a `TechnicalFactor`, checking the column contract before anything runs.
pub struct FactorBuilder {
    name: String,
    provider: Arc<dyn MarketDataProvider>,
    entity_ids: Vec<EntityId>,
    adjust: AdjustType,
    transformers: TransformerChain,
    filter: Option<FilterExpr>,
}

impl FactorBuilder {
    pub fn new(name: impl Into<String>, provider: Arc<dyn MarketDataProvider>) -> Self {
        let name = name.into();
        Self {
            transformers: TransformerChain::new(name.clone()),
            name,
            provider,
            entity_ids: Vec::new(),
            adjust: AdjustType::Hfq,
            filter: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn entity_ids(mut self, entity_ids: Vec<EntityId>) -> Self {
        self.entity_ids = entity_ids;
        self
    }

    pub fn adjust(mut self, adjust: AdjustType) -> Self {
        self.adjust = adjust;
        self
    }

    pub fn transform(mut self, transformer: impl Transformer + 'static) -> Self {
        self.transformers.push(Box::new(transformer));
        self
    }

    /// Final `filter_result` expression. May reference the current `filter_result`
    /// column when an earlier stage produced one.
    pub fn filter(mut self, expr: FilterExpr) -> Self {
        self.filter = Some(expr);
        self
    }

    pub fn build(self) -> Result<TechnicalFactor> {
        let base: BTreeSet<String> = Frame::BAR_COLUMNS.iter().map(|c| c.to_string()).collect();
        let available = self.transformers.validate(&base)?;

        let filter = self
            .filter
            .ok_or_else(|| ScreenerError::composition(&self.name, "no filter expression"))?;
        if let Some(missing) = filter.columns().into_iter().find(|c| !available.contains(c)) {
            return Err(ScreenerError::composition(
                &self.name,
                format!("filter references column '{}' which no stage produces", missing),
            ));
        }

        Ok(TechnicalFactor {
            name: self.name,
            provider: self.provider,
            entity_ids: self.entity_ids,
            adjust: self.adjust,
            transformers: self.transformers,
            filter,
            factor_df: None,
            result_df: None,
        })
    }
}

pub struct TechnicalFactor {
    name: String,
    provider: Arc<dyn MarketDataProvider>,
    entity_ids: Vec<EntityId>,
    adjust: AdjustType,
    transformers: TransformerChain,
    filter: FilterExpr,
    factor_df: Option<Frame>,
    result_df: Option<ResultFrame>,
}

impl TechnicalFactor {
    pub fn filter(&self) -> &FilterExpr {
        &self.filter
    }
}

#[async_trait]
impl Factor for TechnicalFactor {
    fn name(&self) -> &str {
        &self.name
    }

    fn entity_ids(&self) -> &[EntityId] {
        &self.entity_ids
    }

    async fn compute_result(&mut self, start: NaiveDate, end: NaiveDate) -> Result<ResultFrame> {
        if self.entity_ids.is_empty() {
            return Err(ScreenerError::InvalidScope);
        }
        if end < start {
            return Err(ScreenerError::InvalidRange { start, end });
        }

        let bars = self
            .provider
            .kdata(&self.entity_ids, start, end, self.adjust)
            .await?;
        if bars.is_empty() {
            return Err(ScreenerError::data_unavailable(&self.name, start, end));
        }

        let raw = Frame::from_kbars(bars);
        let factor_df = apply(&self.transformers, &raw)?;
        let passed = self.filter.evaluate_all(&factor_df)?;

        let result_df: ResultFrame = factor_df
            .index()
            .iter()
            .cloned()
            .zip(passed)
            .map(|(key, value)| (key, value.unwrap_or(false)))
            .collect();

        debug!(
            factor = %self.name,
            rows = factor_df.len(),
            entities = self.entity_ids.len(),
            "{}: computed {} rows, result column {}",
            self.name,
            factor_df.len(),
            FILTER_RESULT
        );

        self.factor_df = Some(factor_df);
        self.result_df = Some(result_df.clone());
        Ok(result_df)
    }

    fn factor_df(&self) -> Option<&Frame> {
        self.factor_df.as_ref()
    }

    fn result_df(&self) -> Option<&ResultFrame> {
        self.result_df.as_ref()
    }
}
