//! Process plumbing: scheduling, runtime, wiring and the status server

pub mod bootstrap;
pub mod http;
pub mod runtime;
pub mod scheduler;

pub use http::*;
pub use runtime::*;
pub use scheduler::*;
