//! Lightweight in-process metrics.
//!
//! Measures and views live in an explicitly constructed [`MetricsRegistry`]
//! that is rendered by the `/metrics` handler in Prometheus text format.

pub mod metrics;
pub mod views;

pub use metrics::{Aggregation, DistributionSnapshot, Measure, MetricsRegistry, View};
