//! Target selector: runs factors over a range and combines their results per
//! (entity, timestamp) under a combination mode.

use chrono::NaiveDate;
use futures_util::future::try_join_all;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use crate::error::{Result, ScreenerError};
use crate::factors::Factor;
use crate::models::{CombinationMode, EntityId, ResultFrame, RowKey};

pub struct TargetSelector {
    start: NaiveDate,
    end: NaiveDate,
    mode: CombinationMode,
    factors: Vec<Box<dyn Factor>>,
    open_long: Option<BTreeMap<NaiveDate, BTreeSet<EntityId>>>,
}

impl TargetSelector {
    pub fn new(start: NaiveDate, end: NaiveDate, mode: CombinationMode) -> Self {
        Self {
            start,
            end,
            mode,
            factors: Vec::new(),
            open_long: None,
        }
    }

    /// Register a factor. No de-duplication: callers own uniqueness.
    pub fn add_factor(&mut self, factor: impl Factor + 'static) {
        self.factors.push(Box::new(factor));
    }

    pub fn add_boxed_factor(&mut self, factor: Box<dyn Factor>) {
        self.factors.push(factor);
    }

    pub fn mode(&self) -> CombinationMode {
        self.mode
    }

    pub fn factor_count(&self) -> usize {
        self.factors.len()
    }

    /// Compute every factor over `[start, end]` and materialize the combined signal.
    /// Any factor error propagates and leaves the selector not ready.
    pub async fn run(&mut self) -> Result<()> {
        self.open_long = None;
        if self.end < self.start {
            return Err(ScreenerError::InvalidRange {
                start: self.start,
                end: self.end,
            });
        }

        let (start, end) = (self.start, self.end);
        let results = try_join_all(
            self.factors
                .iter_mut()
                .map(|factor| factor.compute_result(start, end)),
        )
        .await?;

        let combined = combine_results(&results, self.mode);
        info!(
            factors = results.len(),
            mode = %self.mode,
            timestamps = combined.len(),
            "TargetSelector: combined {} factors with {}",
            results.len(),
            self.mode
        );
        self.open_long = Some(combined);
        Ok(())
    }

    /// Entities with an open long signal exactly at `timestamp`; empty when none qualify.
    pub fn get_open_long_targets(&self, timestamp: NaiveDate) -> Result<BTreeSet<EntityId>> {
        let open_long = self.open_long.as_ref().ok_or(ScreenerError::NotReady)?;
        let targets = open_long.get(&timestamp).cloned().unwrap_or_default();
        debug!(
            timestamp = %timestamp,
            count = targets.len(),
            "TargetSelector: {} open long targets at {}",
            targets.len(),
            timestamp
        );
        Ok(targets)
    }
}

/// Combine result frames row-wise. A row missing from a frame counts as no signal for
/// that frame, so under AND it can never pass.
pub fn combine_results(
    results: &[ResultFrame],
    mode: CombinationMode,
) -> BTreeMap<NaiveDate, BTreeSet<EntityId>> {
    let keys: BTreeSet<&RowKey> = results.iter().flat_map(|r| r.keys()).collect();

    let mut open_long: BTreeMap<NaiveDate, BTreeSet<EntityId>> = BTreeMap::new();
    for (entity_id, timestamp) in keys {
        let signals = results
            .iter()
            .map(|r| Some(r.filter_result(entity_id, *timestamp).unwrap_or(false)));
        if mode.combine(signals) == Some(true) {
            open_long
                .entry(*timestamp)
                .or_default()
                .insert(entity_id.clone());
        }
    }
    open_long
}
