//! Scheduled stock screening: composable technical factors, a target selector and a
//! retrying job runner that reports candidates to an operator.

pub mod common;
pub mod config;
pub mod core;
pub mod error;
pub mod factors;
pub mod indicators;
pub mod jobs;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod signals;

pub use error::{Result, ScreenerError};
