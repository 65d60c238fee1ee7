//! Target selection: narrowing the universe and combining factor signals.

pub mod selector;
pub mod universe;

pub use selector::{combine_results, TargetSelector};
pub use universe::UniverseBuilder;
