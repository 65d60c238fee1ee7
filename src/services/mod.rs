//! External collaborators: market data, watchlist registration and notification.

pub mod market_data;
pub mod notifier;
pub mod rest_provider;
pub mod watchlist;

pub use market_data::{select_top_liquidity, InMemoryMarketData, MarketDataProvider};
pub use notifier::{EmailNotifier, LogNotifier, Notifier, WebhookNotifier};
pub use rest_provider::RestMarketDataProvider;
pub use watchlist::{DisabledWatchlist, RestWatchlistRegistrar, WatchlistRegistrar};
