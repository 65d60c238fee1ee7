//! Wiring of concrete collaborators from configuration

use std::sync::Arc;
use tracing::info;

use crate::config::{NotifierKind, ScreenerConfig};
use crate::error::{Result, ScreenerError};
use crate::jobs::JobContext;
use crate::metrics::Metrics;
use crate::services::{
    DisabledWatchlist, EmailNotifier, LogNotifier, MarketDataProvider, Notifier,
    RestMarketDataProvider, RestWatchlistRegistrar, WatchlistRegistrar, WebhookNotifier,
};

pub fn build_notifier(config: &ScreenerConfig) -> Result<Arc<dyn Notifier>> {
    let notifier: Arc<dyn Notifier> = match config.notifier {
        NotifierKind::Log => Arc::new(LogNotifier),
        NotifierKind::Email => {
            let smtp = config.smtp.clone().ok_or_else(|| {
                ScreenerError::Config("SMTP settings are required for the email notifier".to_string())
            })?;
            Arc::new(EmailNotifier::new(smtp))
        }
        NotifierKind::Webhook => {
            let url = config.webhook_url.as_deref().ok_or_else(|| {
                ScreenerError::Config("NOTIFIER_WEBHOOK_URL must be set".to_string())
            })?;
            Arc::new(WebhookNotifier::new(url)?)
        }
    };
    Ok(notifier)
}

pub fn build_watchlist(config: &ScreenerConfig) -> Result<Arc<dyn WatchlistRegistrar>> {
    Ok(match config.watchlist_url.as_deref() {
        Some(url) => Arc::new(RestWatchlistRegistrar::new(url)?),
        None => {
            info!("Bootstrap: WATCHLIST_URL not set, watchlist registration disabled");
            Arc::new(DisabledWatchlist)
        }
    })
}

/// Job context backed by the REST market-data service and the configured side effects.
pub fn build_context(config: &ScreenerConfig, metrics: Arc<Metrics>) -> Result<JobContext> {
    let provider: Arc<dyn MarketDataProvider> =
        Arc::new(RestMarketDataProvider::new(&config.market_data_url)?);

    info!(
        market_data = %config.market_data_url,
        notifier = ?config.notifier,
        "Bootstrap: collaborators configured"
    );

    Ok(JobContext::new(
        provider,
        build_watchlist(config)?,
        build_notifier(config)?,
        config.operator_email.clone(),
    )
    .with_reference_provider(config.reference_data_provider.clone())
    .with_metrics(metrics))
}
