//! Unit tests for MACD and moving averages

use bullscan::indicators::{calculate_ma, calculate_macd_default, calculate_trailing_ma};

fn some(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().copied().map(Some).collect()
}

#[test]
fn macd_of_flat_series_is_zero() {
    let series = calculate_macd_default(&some(&[10.0; 40]));
    assert!(series.diff.iter().all(|v| v.unwrap().abs() < 1e-9));
    assert!(series.macd.iter().all(|v| v.unwrap().abs() < 1e-9));
}

#[test]
fn macd_lines_turn_positive_on_uptrend() {
    let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
    let series = calculate_macd_default(&some(&closes));
    let last = closes.len() - 1;
    assert!(series.diff[last].unwrap() > 0.0);
    assert!(series.dea[last].unwrap() > 0.0);
    // diff leads dea on a steady trend
    assert!(series.macd[last].unwrap() > 0.0);
}

#[test]
fn macd_passes_missing_closes_through() {
    let mut closes = some(&[10.0, 11.0, 12.0]);
    closes.push(None);
    let series = calculate_macd_default(&closes);
    assert_eq!(series.diff[3], None);
    assert_eq!(series.macd[3], None);
}

#[test]
fn trailing_ma_excludes_current_bar() {
    let values = some(&[1.0, 2.0, 3.0, 10.0]);
    assert_eq!(calculate_ma(&values, 3)[3], Some(5.0));
    assert_eq!(calculate_trailing_ma(&values, 3)[3], Some(2.0));
    assert_eq!(calculate_trailing_ma(&values, 3)[2], None);
}
