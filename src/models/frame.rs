//! Column-oriented time series frames keyed by (entity, timestamp)
//!
//! A `Frame` is immutable from the caller's point of view: deriving a column returns a new
//! frame carrying every existing column plus the new one.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use super::entity::EntityId;
use super::kdata::Kbar;
use crate::error::{Result, ScreenerError};

pub type RowKey = (EntityId, NaiveDate);

/// A named series aligned with the frame index. `None` marks a missing value.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Numeric(Vec<Option<f64>>),
    Bool(Vec<Option<bool>>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match self {
            Column::Numeric(v) => Some(v),
            Column::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<&[Option<bool>]> {
        match self {
            Column::Bool(v) => Some(v),
            Column::Numeric(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    index: Vec<RowKey>,
    columns: BTreeMap<String, Column>,
}

impl Frame {
    pub const OPEN: &'static str = "open";
    pub const HIGH: &'static str = "high";
    pub const LOW: &'static str = "low";
    pub const CLOSE: &'static str = "close";
    pub const VOLUME: &'static str = "volume";
    pub const TURNOVER: &'static str = "turnover";

    /// Columns every bar-backed frame starts with.
    pub const BAR_COLUMNS: [&'static str; 6] = [
        Self::OPEN,
        Self::HIGH,
        Self::LOW,
        Self::CLOSE,
        Self::VOLUME,
        Self::TURNOVER,
    ];

    /// Build a frame from raw bars, sorted by (entity, timestamp). A duplicate key keeps the
    /// last bar seen.
    pub fn from_kbars(bars: Vec<Kbar>) -> Self {
        let mut by_key: BTreeMap<RowKey, Kbar> = BTreeMap::new();
        for bar in bars {
            by_key.insert((bar.entity_id.clone(), bar.timestamp), bar);
        }

        let n = by_key.len();
        let mut index = Vec::with_capacity(n);
        let mut open = Vec::with_capacity(n);
        let mut high = Vec::with_capacity(n);
        let mut low = Vec::with_capacity(n);
        let mut close = Vec::with_capacity(n);
        let mut volume = Vec::with_capacity(n);
        let mut turnover = Vec::with_capacity(n);

        for (key, bar) in by_key {
            index.push(key);
            open.push(finite(bar.open));
            high.push(finite(bar.high));
            low.push(finite(bar.low));
            close.push(finite(bar.close));
            volume.push(finite(bar.volume));
            turnover.push(finite(bar.turnover));
        }

        let mut columns = BTreeMap::new();
        columns.insert(Self::OPEN.to_string(), Column::Numeric(open));
        columns.insert(Self::HIGH.to_string(), Column::Numeric(high));
        columns.insert(Self::LOW.to_string(), Column::Numeric(low));
        columns.insert(Self::CLOSE.to_string(), Column::Numeric(close));
        columns.insert(Self::VOLUME.to_string(), Column::Numeric(volume));
        columns.insert(Self::TURNOVER.to_string(), Column::Numeric(turnover));

        Self { index, columns }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[RowKey] {
        &self.index
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn numeric(&self, name: &str) -> Result<&[Option<f64>]> {
        self.column(name)
            .and_then(Column::as_numeric)
            .ok_or_else(|| ScreenerError::composition("frame", format!("no numeric column '{}'", name)))
    }

    pub fn boolean(&self, name: &str) -> Result<&[Option<bool>]> {
        self.column(name)
            .and_then(Column::as_bool)
            .ok_or_else(|| ScreenerError::composition("frame", format!("no boolean column '{}'", name)))
    }

    /// Row position of (entity, timestamp), if present.
    pub fn position(&self, entity_id: &str, timestamp: NaiveDate) -> Option<usize> {
        self.index
            .binary_search_by(|(e, t)| e.as_str().cmp(entity_id).then(t.cmp(&timestamp)))
            .ok()
    }

    /// Contiguous row ranges of each entity, in index order.
    pub fn entity_groups(&self) -> Vec<(&str, Range<usize>)> {
        let mut groups = Vec::new();
        let mut start = 0;
        for i in 1..=self.index.len() {
            if i == self.index.len() || self.index[i].0 != self.index[start].0 {
                groups.push((self.index[start].0.as_str(), start..i));
                start = i;
            }
        }
        groups
    }

    /// New frame with `name` added or replaced; all other columns are carried over.
    pub fn with_column(&self, name: impl Into<String>, column: Column) -> Result<Frame> {
        let name = name.into();
        if column.len() != self.len() {
            return Err(ScreenerError::composition(
                name,
                format!("column has {} rows, frame has {}", column.len(), self.len()),
            ));
        }
        let mut derived = self.clone();
        derived.columns.insert(name, column);
        Ok(derived)
    }

    /// Apply `f` to the numeric `source` column one entity at a time, so windows never
    /// straddle two entities.
    pub fn per_entity<F>(&self, source: &str, f: F) -> Result<Vec<Option<f64>>>
    where
        F: Fn(&[Option<f64>]) -> Vec<Option<f64>>,
    {
        let values = self.numeric(source)?;
        let mut out = Vec::with_capacity(values.len());
        for (_, range) in self.entity_groups() {
            out.extend(f(&values[range]));
        }
        Ok(out)
    }
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

/// Single boolean `filter_result` per (entity, timestamp).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultFrame {
    rows: BTreeMap<RowKey, bool>,
}

impl ResultFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity_id: impl Into<EntityId>, timestamp: NaiveDate, passed: bool) {
        self.rows.insert((entity_id.into(), timestamp), passed);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn filter_result(&self, entity_id: &str, timestamp: NaiveDate) -> Option<bool> {
        self.rows
            .get(&(entity_id.to_string(), timestamp))
            .copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RowKey, &bool)> {
        self.rows.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &RowKey> {
        self.rows.keys()
    }

    /// Entities with `filter_result = true` exactly at `timestamp`.
    pub fn passing_at(&self, timestamp: NaiveDate) -> BTreeSet<EntityId> {
        self.rows
            .iter()
            .filter(|((_, t), passed)| *t == timestamp && **passed)
            .map(|((e, _), _)| e.clone())
            .collect()
    }
}

impl FromIterator<(RowKey, bool)> for ResultFrame {
    fn from_iter<I: IntoIterator<Item = (RowKey, bool)>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}
