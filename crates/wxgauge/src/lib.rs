//! Top-level facade crate for wxgauge.
//!
//! Re-exports core types and the exporter library so users can depend on a single crate.

pub mod core {
    pub use wxgauge_core::*;
}

pub mod exporter {
    pub use wxgauge_exporter::*;
}
