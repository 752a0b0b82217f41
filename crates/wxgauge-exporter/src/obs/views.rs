//! Measures and the views registered at startup.

use super::metrics::{Aggregation, Measure, View};

pub const TEMPERATURE: Measure =
    Measure::new("temperature", "The temperature in Fahrenheit", "F");
pub const FEELS_LIKE: Measure =
    Measure::new("feels_like", "The temperature feel like in Fahrenheit", "F");
pub const LATENCY_MS: Measure =
    Measure::new("repl/latency", "The latency in milliseconds per REPL loop", "ms");
pub const LINE_LENGTHS: Measure =
    Measure::new("repl/line_lengths", "The distribution of line lengths", "By");

pub const TAG_METHOD: &str = "method";
pub const TAG_STATUS: &str = "status";
pub const TAG_ERROR: &str = "error";

pub const TEMPERATURE_VIEW: &str = "demo/temperature";
pub const FEELS_LIKE_VIEW: &str = "demo/feel_like";
pub const LATENCY_VIEW: &str = "demo/latency";
pub const LINE_COUNT_VIEW: &str = "demo/lines_in";
pub const LINE_LENGTH_VIEW: &str = "demo/line_lengths";

// [>=0ms, >=25ms, >=50ms, >=75ms, >=100ms, >=200ms, >=400ms, >=600ms, >=800ms, >=1s, >=2s, >=4s, >=6s]
const LATENCY_BOUNDS_MS: [f64; 13] = [
    0.0, 25.0, 50.0, 75.0, 100.0, 200.0, 400.0, 600.0, 800.0, 1000.0, 2000.0, 4000.0, 6000.0,
];

// [>=0B, >=5B, >=10B, >=15B, >=20B, >=40B, >=60B, >=80B, >=100B, >=200B, >=400B, >=600B, >=800B, >=1000B]
const LINE_LENGTH_BOUNDS: [f64; 14] = [
    0.0, 5.0, 10.0, 15.0, 20.0, 40.0, 60.0, 80.0, 100.0, 200.0, 400.0, 600.0, 800.0, 1000.0,
];

pub fn temperature_view() -> View {
    View::new(TEMPERATURE_VIEW, "Current temperature", TEMPERATURE, Aggregation::LastValue)
}

pub fn feels_like_view() -> View {
    View::new(FEELS_LIKE_VIEW, "Current feels-like temperature", FEELS_LIKE, Aggregation::LastValue)
}

pub fn latency_view() -> View {
    View::new(
        LATENCY_VIEW,
        "The distribution of the latencies",
        LATENCY_MS,
        Aggregation::Distribution(LATENCY_BOUNDS_MS.to_vec()),
    )
    .with_tag_keys(&[TAG_METHOD])
}

pub fn line_count_view() -> View {
    View::new(
        LINE_COUNT_VIEW,
        "The number of lines from standard input",
        LINE_LENGTHS,
        Aggregation::LastValue,
    )
}

pub fn line_length_view() -> View {
    View::new(
        LINE_LENGTH_VIEW,
        "Groups the lengths of keys in buckets",
        LINE_LENGTHS,
        Aggregation::Distribution(LINE_LENGTH_BOUNDS.to_vec()),
    )
}

/// Every view the exporter registers at startup.
pub fn default_views() -> Vec<View> {
    vec![
        latency_view(),
        line_count_view(),
        line_length_view(),
        temperature_view(),
        feels_like_view(),
    ]
}
