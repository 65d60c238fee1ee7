//! MACD (Moving Average Convergence Divergence) indicator

use crate::common::math;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

/// MACD lines for one entity, aligned with the input closes.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    /// EMA(fast) - EMA(slow)
    pub diff: Vec<Option<f64>>,
    /// EMA(signal) of diff
    pub dea: Vec<Option<f64>>,
    /// 2 * (diff - dea)
    pub macd: Vec<Option<f64>>,
}

/// Calculate MACD lines over a close series
pub fn calculate_macd(
    closes: &[Option<f64>],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> MacdSeries {
    let fast = math::ema(closes, fast_period);
    let slow = math::ema(closes, slow_period);

    let diff: Vec<Option<f64>> = fast
        .iter()
        .zip(&slow)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();
    let dea = math::ema(&diff, signal_period);
    let macd = diff
        .iter()
        .zip(&dea)
        .map(|(d, e)| Some(2.0 * ((*d)? - (*e)?)))
        .collect();

    MacdSeries { diff, dea, macd }
}

/// Calculate MACD with default periods (12, 26, 9)
pub fn calculate_macd_default(closes: &[Option<f64>]) -> MacdSeries {
    calculate_macd(closes, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
}
