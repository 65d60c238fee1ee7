//! Frame transformers that derive columns for factors
//!
//! Each transformer declares the columns it needs and the columns it adds or overwrites.
//! `apply` enforces that contract at run time; `TransformerChain::validate` enforces it at
//! composition time.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::{Result, ScreenerError};
use crate::factors::expr::FilterExpr;
use crate::indicators::{calculate_ma, calculate_macd, calculate_trailing_ma, ma_column};
use crate::models::{Column, CombinationMode, Frame};

pub trait Transformer: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Columns that must exist before `transform` runs.
    fn required_columns(&self) -> BTreeSet<String>;

    /// Columns `transform` adds or overwrites. Every other column is carried over.
    fn produced_columns(&self) -> BTreeSet<String>;

    fn transform(&self, frame: &Frame) -> Result<Frame>;
}

/// Run one transformer and check it honored its column contract.
pub fn apply(transformer: &dyn Transformer, frame: &Frame) -> Result<Frame> {
    for column in transformer.required_columns() {
        if !frame.has_column(&column) {
            return Err(ScreenerError::composition(
                transformer.name(),
                format!("missing required column '{}'", column),
            ));
        }
    }

    let out = transformer.transform(frame)?;

    if out.index() != frame.index() {
        return Err(ScreenerError::composition(
            transformer.name(),
            "transformer changed the frame index",
        ));
    }
    if let Some(dropped) = frame.column_names().find(|c| !out.has_column(c)) {
        return Err(ScreenerError::composition(
            transformer.name(),
            format!("transformer dropped column '{}'", dropped),
        ));
    }
    if let Some(missing) = transformer
        .produced_columns()
        .into_iter()
        .find(|c| !out.has_column(c))
    {
        return Err(ScreenerError::composition(
            transformer.name(),
            format!("transformer did not produce declared column '{}'", missing),
        ));
    }
    Ok(out)
}

/// Ordered transformers applied one after another. A chain is itself a transformer, so
/// chains nest and `(a, b), c` behaves like `a, (b, c)`.
#[derive(Debug, Default)]
pub struct TransformerChain {
    name: String,
    stages: Vec<Box<dyn Transformer>>,
}

impl TransformerChain {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    pub fn then(mut self, stage: impl Transformer + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn push(&mut self, stage: Box<dyn Transformer>) {
        self.stages.push(stage);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Walk the stages over `available` and return the columns present after the last one.
    pub fn validate(&self, available: &BTreeSet<String>) -> Result<BTreeSet<String>> {
        let mut available = available.clone();
        for stage in &self.stages {
            if let Some(missing) = stage
                .required_columns()
                .into_iter()
                .find(|c| !available.contains(c))
            {
                return Err(ScreenerError::composition(
                    stage.name(),
                    format!("requires column '{}' which no earlier stage produces", missing),
                ));
            }
            available.extend(stage.produced_columns());
        }
        Ok(available)
    }
}

impl Transformer for TransformerChain {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_columns(&self) -> BTreeSet<String> {
        let mut produced = BTreeSet::new();
        let mut required = BTreeSet::new();
        for stage in &self.stages {
            for column in stage.required_columns() {
                if !produced.contains(&column) {
                    required.insert(column);
                }
            }
            produced.extend(stage.produced_columns());
        }
        required
    }

    fn produced_columns(&self) -> BTreeSet<String> {
        self.stages
            .iter()
            .flat_map(|s| s.produced_columns())
            .collect()
    }

    fn transform(&self, frame: &Frame) -> Result<Frame> {
        let mut current = frame.clone();
        for stage in &self.stages {
            current = apply(stage.as_ref(), &current)?;
        }
        Ok(current)
    }
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Adds `diff`, `dea` and `macd` from closes.
#[derive(Debug, Clone)]
pub struct MacdTransformer {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdTransformer {
    fn default() -> Self {
        Self {
            fast: crate::indicators::DEFAULT_FAST,
            slow: crate::indicators::DEFAULT_SLOW,
            signal: crate::indicators::DEFAULT_SIGNAL,
        }
    }
}

impl Transformer for MacdTransformer {
    fn name(&self) -> &str {
        "macd"
    }

    fn required_columns(&self) -> BTreeSet<String> {
        set(&[Frame::CLOSE])
    }

    fn produced_columns(&self) -> BTreeSet<String> {
        set(&["diff", "dea", "macd"])
    }

    fn transform(&self, frame: &Frame) -> Result<Frame> {
        let closes = frame.numeric(Frame::CLOSE)?;
        let (mut diff, mut dea, mut macd) = (Vec::new(), Vec::new(), Vec::new());
        for (_, range) in frame.entity_groups() {
            let series = calculate_macd(&closes[range], self.fast, self.slow, self.signal);
            diff.extend(series.diff);
            dea.extend(series.dea);
            macd.extend(series.macd);
        }
        frame
            .with_column("diff", Column::Numeric(diff))?
            .with_column("dea", Column::Numeric(dea))?
            .with_column("macd", Column::Numeric(macd))
    }
}

/// Adds `ma{w}` per window and `bull`: every shorter average strictly above the next
/// longer one.
#[derive(Debug, Clone)]
pub struct CrossMaTransformer {
    windows: Vec<usize>,
}

impl CrossMaTransformer {
    pub const BULL: &'static str = "bull";

    /// Windows are sorted ascending; duplicates are removed.
    pub fn new(windows: &[usize]) -> Self {
        let mut windows = windows.to_vec();
        windows.sort_unstable();
        windows.dedup();
        Self { windows }
    }

    pub fn windows(&self) -> &[usize] {
        &self.windows
    }
}

impl Transformer for CrossMaTransformer {
    fn name(&self) -> &str {
        "cross_ma"
    }

    fn required_columns(&self) -> BTreeSet<String> {
        set(&[Frame::CLOSE])
    }

    fn produced_columns(&self) -> BTreeSet<String> {
        let mut out: BTreeSet<String> = self.windows.iter().map(|w| ma_column(*w)).collect();
        out.insert(Self::BULL.to_string());
        out
    }

    fn transform(&self, frame: &Frame) -> Result<Frame> {
        let mut out = frame.clone();
        let mut averages = Vec::with_capacity(self.windows.len());
        for &window in &self.windows {
            let ma = frame.per_entity(Frame::CLOSE, |closes| calculate_ma(closes, window))?;
            out = out.with_column(ma_column(window), Column::Numeric(ma.clone()))?;
            averages.push(ma);
        }

        let bull = (0..frame.len())
            .map(|row| {
                CombinationMode::And.combine(
                    averages
                        .windows(2)
                        .map(|pair| Some(pair[0][row]? > pair[1][row]?)),
                )
            })
            .collect();
        out.with_column(Self::BULL, Column::Bool(bull))
    }
}

/// Adds `ma{w}` per window, `over_ma` (close above the averages, all or any of them per
/// `over_mode`) and `up`: over now, and not over at least once during the preceding
/// `up_intervals` bars of the same entity.
#[derive(Debug, Clone)]
pub struct MaBreakoutTransformer {
    windows: Vec<usize>,
    over_mode: CombinationMode,
    up_intervals: usize,
}

impl MaBreakoutTransformer {
    pub const OVER_MA: &'static str = "over_ma";
    pub const UP: &'static str = "up";

    pub fn new(windows: &[usize], over_mode: CombinationMode, up_intervals: usize) -> Self {
        let mut windows = windows.to_vec();
        windows.sort_unstable();
        windows.dedup();
        Self {
            windows,
            over_mode,
            up_intervals,
        }
    }
}

impl Transformer for MaBreakoutTransformer {
    fn name(&self) -> &str {
        "ma_breakout"
    }

    fn required_columns(&self) -> BTreeSet<String> {
        set(&[Frame::CLOSE])
    }

    fn produced_columns(&self) -> BTreeSet<String> {
        let mut out: BTreeSet<String> = self.windows.iter().map(|w| ma_column(*w)).collect();
        out.insert(Self::OVER_MA.to_string());
        out.insert(Self::UP.to_string());
        out
    }

    fn transform(&self, frame: &Frame) -> Result<Frame> {
        let closes = frame.numeric(Frame::CLOSE)?;
        let mut out = frame.clone();
        let mut averages = Vec::with_capacity(self.windows.len());
        for &window in &self.windows {
            let ma = frame.per_entity(Frame::CLOSE, |c| calculate_ma(c, window))?;
            out = out.with_column(ma_column(window), Column::Numeric(ma.clone()))?;
            averages.push(ma);
        }

        let over: Vec<Option<bool>> = (0..frame.len())
            .map(|row| {
                self.over_mode
                    .combine(averages.iter().map(|ma| Some(closes[row]? > ma[row]?)))
            })
            .collect();

        let mut up = vec![None; frame.len()];
        for (_, range) in frame.entity_groups() {
            for row in range.clone() {
                up[row] = match over[row] {
                    Some(true) => {
                        let from = row.saturating_sub(self.up_intervals).max(range.start);
                        Some(over[from..row].iter().any(|o| *o == Some(false)))
                    }
                    other => other,
                };
            }
        }

        out.with_column(Self::OVER_MA, Column::Bool(over))?
            .with_column(Self::UP, Column::Bool(up))
    }
}

/// Adds `vol_ma{w}` (mean volume of the `window` bars before each bar) and `volume_up`
/// (volume above `multiple` times that mean).
#[derive(Debug, Clone)]
pub struct VolumeUpTransformer {
    window: usize,
    multiple: f64,
}

impl VolumeUpTransformer {
    pub const VOLUME_UP: &'static str = "volume_up";

    pub fn new(window: usize, multiple: f64) -> Self {
        Self { window, multiple }
    }

    pub fn ma_column(&self) -> String {
        format!("vol_ma{}", self.window)
    }
}

impl Default for VolumeUpTransformer {
    fn default() -> Self {
        Self::new(30, 2.0)
    }
}

impl Transformer for VolumeUpTransformer {
    fn name(&self) -> &str {
        "volume_up"
    }

    fn required_columns(&self) -> BTreeSet<String> {
        set(&[Frame::VOLUME])
    }

    fn produced_columns(&self) -> BTreeSet<String> {
        [self.ma_column(), Self::VOLUME_UP.to_string()].into_iter().collect()
    }

    fn transform(&self, frame: &Frame) -> Result<Frame> {
        let volumes = frame.numeric(Frame::VOLUME)?;
        let vol_ma = frame.per_entity(Frame::VOLUME, |v| calculate_trailing_ma(v, self.window))?;
        let volume_up = volumes
            .iter()
            .zip(&vol_ma)
            .map(|(v, ma)| Some((*v)? > (*ma)? * self.multiple))
            .collect();
        frame
            .with_column(self.ma_column(), Column::Numeric(vol_ma))?
            .with_column(Self::VOLUME_UP, Column::Bool(volume_up))
    }
}

/// Materializes a filter expression as a boolean column.
#[derive(Debug, Clone)]
pub struct ExprTransformer {
    output: String,
    expr: FilterExpr,
}

impl ExprTransformer {
    pub fn new(output: impl Into<String>, expr: FilterExpr) -> Self {
        Self {
            output: output.into(),
            expr,
        }
    }
}

impl Transformer for ExprTransformer {
    fn name(&self) -> &str {
        &self.output
    }

    fn required_columns(&self) -> BTreeSet<String> {
        self.expr.columns()
    }

    fn produced_columns(&self) -> BTreeSet<String> {
        set(&[self.output.as_str()])
    }

    fn transform(&self, frame: &Frame) -> Result<Frame> {
        let values = self.expr.evaluate_all(frame)?;
        frame.with_column(self.output.clone(), Column::Bool(values))
    }
}
