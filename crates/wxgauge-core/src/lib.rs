//! wxgauge core: transport-free data model and error types.
//!
//! This crate holds the weather sample model, the JSON field extraction used
//! by every weather source, and the error surface shared by the exporter.
//! It carries no runtime or HTTP dependencies.
//!
//! Panics, `unwrap`, and `expect` are compile-denied here. All fallible paths
//! surface as `WxError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod sample;

pub use error::{Result, WxError};
pub use sample::TemperatureSample;
