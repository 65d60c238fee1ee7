//! Simple moving averages over closes and volumes

use crate::common::math;

/// Column name used for the moving average of `window` bars, e.g. `ma120`.
pub fn ma_column(window: usize) -> String {
    format!("ma{}", window)
}

/// Moving average including the current bar
pub fn calculate_ma(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    math::sma(values, window)
}

/// Moving average of the `window` bars strictly before each point
pub fn calculate_trailing_ma(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    math::shift(&math::sma(values, window), 1)
}
