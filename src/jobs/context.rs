//! Job context for dependency injection

use std::sync::Arc;
use tracing::error;

use crate::config::DEFAULT_REFERENCE_PROVIDER;
use crate::jobs::types::NotificationKind;
use crate::metrics::Metrics;
use crate::services::market_data::MarketDataProvider;
use crate::services::notifier::Notifier;
use crate::services::watchlist::WatchlistRegistrar;

/// Collaborators shared by every attempt of every workflow.
///
/// The notifier and the watchlist are external, side-effecting and non-transactional; no
/// locking is done around them and a message may be delivered more than once if the
/// process dies between send and bookkeeping.
pub struct JobContext {
    pub data_provider: Arc<dyn MarketDataProvider>,
    pub watchlist: Arc<dyn WatchlistRegistrar>,
    pub notifier: Arc<dyn Notifier>,
    /// Fixed recipient of every notification
    pub operator: String,
    /// Reference-data source name passed to `entities_by_id`
    pub reference_provider: String,
    pub metrics: Option<Arc<Metrics>>,
}

impl JobContext {
    pub fn new(
        data_provider: Arc<dyn MarketDataProvider>,
        watchlist: Arc<dyn WatchlistRegistrar>,
        notifier: Arc<dyn Notifier>,
        operator: impl Into<String>,
    ) -> Self {
        Self {
            data_provider,
            watchlist,
            notifier,
            operator: operator.into(),
            reference_provider: DEFAULT_REFERENCE_PROVIDER.to_string(),
            metrics: None,
        }
    }

    pub fn with_reference_provider(mut self, provider: impl Into<String>) -> Self {
        self.reference_provider = provider.into();
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Send one notification to the operator. Delivery failures are logged and counted,
    /// never retried. Returns whether the notifier accepted the message.
    pub async fn notify(&self, kind: NotificationKind, subject: &str, body: &str) -> bool {
        match self.notifier.send(&self.operator, subject, body).await {
            Ok(()) => {
                if let Some(ref metrics) = self.metrics {
                    metrics
                        .notifications_total
                        .with_label_values(&[kind.as_str()])
                        .inc();
                }
                true
            }
            Err(e) => {
                error!(
                    kind = kind.as_str(),
                    subject = %subject,
                    error = %e,
                    "Notification: failed to deliver {} notification '{}'",
                    kind.as_str(),
                    subject
                );
                if let Some(ref metrics) = self.metrics {
                    metrics
                        .notification_failures_total
                        .with_label_values(&[kind.as_str()])
                        .inc();
                }
                false
            }
        }
    }
}
