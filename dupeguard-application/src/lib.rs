// DupeGuard Application Layer

pub mod commands;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod ops;
pub mod queries;
pub mod state;

#[cfg(test)]
mod test_support;

pub use engine::*;
pub use error::AppError;
pub use metrics::{Metrics, MetricsSnapshot};
pub use state::EngineState;
