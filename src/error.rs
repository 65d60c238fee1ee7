//! Error taxonomy shared by every screening stage

use chrono::NaiveDate;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScreenerError>;

#[derive(Debug, Clone, Error)]
pub enum ScreenerError {
    /// Upstream data has no rows for the requested range. Drives the retry path.
    #[error("no data available for {what} between {start} and {end}")]
    DataUnavailable {
        what: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    /// Target retrieval was attempted before the selector ran.
    #[error("selector has not been run")]
    NotReady,

    /// Registering candidates in the external watchlist failed.
    #[error("watchlist registration failed for group '{group}': {reason}")]
    SideEffectFailure { group: String, reason: String },

    /// The notifier itself could not deliver a message.
    #[error("notification to {recipient} failed: {reason}")]
    NotificationFailure { recipient: String, reason: String },

    /// A transformer or filter references a column no earlier stage produces,
    /// or a stage dropped a column it did not own.
    #[error("invalid factor composition in '{stage}': {reason}")]
    InvalidComposition { stage: String, reason: String },

    #[error("entity scope is empty")]
    InvalidScope,

    #[error("end {end} is before start {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("top fraction must be in (0, 1], got {0}")]
    InvalidFraction(f64),

    /// Transport or decoding failure talking to a data collaborator.
    #[error("provider error: {0}")]
    Provider(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ScreenerError {
    pub fn data_unavailable(what: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self::DataUnavailable {
            what: what.into(),
            start,
            end,
        }
    }

    pub fn composition(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidComposition {
            stage: stage.into(),
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for ScreenerError {
    fn from(e: reqwest::Error) -> Self {
        Self::Provider(e.to_string())
    }
}

impl From<url::ParseError> for ScreenerError {
    fn from(e: url::ParseError) -> Self {
        Self::Provider(format!("invalid url: {}", e))
    }
}
