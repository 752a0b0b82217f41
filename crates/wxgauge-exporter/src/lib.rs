//! wxgauge exporter library entry.
//!
//! Wires the config, metrics registry, weather sampler, line processor and
//! HTTP scrape endpoint together. Consumed by the binary (`main.rs`) and by
//! integration tests.

pub mod app_state;
pub mod config;
pub mod obs;
pub mod ops;
pub mod repl;
pub mod router;
pub mod sampler;
