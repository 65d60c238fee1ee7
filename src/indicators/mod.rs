//! Series indicators backing the technical factors.

pub mod momentum;
pub mod trend;

pub use momentum::*;
pub use trend::*;
