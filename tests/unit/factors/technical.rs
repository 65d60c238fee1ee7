//! Unit tests for bar-backed technical factors

use std::sync::Arc;

use bullscan::error::ScreenerError;
use bullscan::factors::{
    bull_and_up_factor, col, gt, macd_factor, Factor, FactorBuilder, MacdTransformer,
    FILTER_RESULT,
};
use bullscan::models::{Entity, EntityType};
use bullscan::services::InMemoryMarketData;

use crate::test_utils::{date, stock, trending_bars};

fn market() -> Arc<InMemoryMarketData> {
    let mut market = InMemoryMarketData::new();
    for (code, step) in [("000001", 1.0), ("000002", -0.1)] {
        market = market
            .with_entity(Entity::new(EntityType::Stock, "sz", code, code))
            .with_bars(trending_bars(&stock(code), date(2023, 1, 1), 300, 100.0, step));
    }
    Arc::new(market)
}

#[test]
fn builder_rejects_filter_on_missing_column() {
    let result = FactorBuilder::new("broken", market())
        .entity_ids(vec![stock("000001")])
        .transform(MacdTransformer::default())
        .filter(col("bull"))
        .build();
    assert!(matches!(result, Err(ScreenerError::InvalidComposition { .. })));
}

#[test]
fn builder_requires_a_filter() {
    let result = FactorBuilder::new("unfiltered", market())
        .entity_ids(vec![stock("000001")])
        .build();
    assert!(matches!(result, Err(ScreenerError::InvalidComposition { .. })));
}

#[tokio::test]
async fn empty_range_is_data_unavailable() {
    let mut factor = macd_factor(market(), vec![stock("000001")]).build().unwrap();
    let err = factor
        .compute_result(date(2030, 1, 1), date(2030, 2, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, ScreenerError::DataUnavailable { .. }));
    assert!(factor.result_df().is_none());
}

#[tokio::test]
async fn empty_scope_is_rejected() {
    let mut factor = macd_factor(market(), Vec::new()).build().unwrap();
    let err = factor
        .compute_result(date(2023, 1, 1), date(2023, 12, 31))
        .await
        .unwrap_err();
    assert!(matches!(err, ScreenerError::InvalidScope));
}

#[tokio::test]
async fn inverted_range_is_rejected() {
    let mut factor = macd_factor(market(), vec![stock("000001")]).build().unwrap();
    let err = factor
        .compute_result(date(2023, 12, 31), date(2023, 1, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, ScreenerError::InvalidRange { .. }));
}

#[tokio::test]
async fn macd_factor_passes_rising_and_rejects_falling() {
    let end = date(2023, 10, 27);
    let mut factor = macd_factor(market(), vec![stock("000001"), stock("000002")])
        .build()
        .unwrap();
    let result = factor.compute_result(date(2023, 1, 1), end).await.unwrap();

    assert_eq!(result.filter_result(&stock("000001"), end), Some(true));
    assert_eq!(result.filter_result(&stock("000002"), end), Some(false));
    // first bar has diff == 0
    assert_eq!(result.filter_result(&stock("000001"), date(2023, 1, 1)), Some(false));

    let frame = factor.factor_df().unwrap();
    assert!(frame.has_column("diff") && frame.has_column(FILTER_RESULT));
}

#[tokio::test]
async fn bull_and_up_needs_the_long_average() {
    let provider = market();
    let mut factor = bull_and_up_factor(provider, vec![stock("000001")], 1_000.0)
        .build()
        .unwrap();
    let result = factor
        .compute_result(date(2023, 1, 1), date(2023, 10, 27))
        .await
        .unwrap();

    // ma250 is missing before the 250th bar, which counts as no signal
    assert_eq!(result.filter_result(&stock("000001"), date(2023, 9, 6)), Some(false));
    assert_eq!(result.filter_result(&stock("000001"), date(2023, 9, 7)), Some(true));
    assert_eq!(result.filter_result(&stock("000001"), date(2023, 10, 27)), Some(true));
}

#[tokio::test]
async fn turnover_threshold_filters_rows() {
    let mut factor = macd_factor(market(), vec![stock("000001")])
        .name("macd_liquid")
        .filter(col(FILTER_RESULT) & gt("turnover", 1e15))
        .build()
        .unwrap();
    let result = factor
        .compute_result(date(2023, 1, 1), date(2023, 10, 27))
        .await
        .unwrap();
    assert!(result.passing_at(date(2023, 10, 27)).is_empty());
    assert_eq!(factor.name(), "macd_liquid");
}
