//! Dispatch middleware.
//!
//! [`Middleware`] hooks run on every dispatch attempt, including those that
//! fail before a listener is selected. [`MetricsMiddleware`] keeps per-queue
//! counters for diagnostics.

mod core;
mod metrics;

pub use self::core::Middleware;
pub use metrics::{MetricsMiddleware, QueueMetrics, NO_DESTINATION, UNROUTABLE};
