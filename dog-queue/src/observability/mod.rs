pub mod metrics;

#[cfg(feature = "tracing-basic")]
pub mod subscriber;

pub use metrics::WorkerMetrics;

#[cfg(feature = "tracing-basic")]
pub use subscriber::{init_json_tracing, init_tracing};
