//! Exporter config loader (strict parsing).

pub mod schema;

use std::fs;

use wxgauge_core::error::{Result, WxError};

pub use schema::{
    ExporterConfig, MetricsSection, ReplSection, SamplerSection, ServerSection, WeatherSection,
};

pub fn load_from_file(path: &str) -> Result<ExporterConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| WxError::InvalidConfig(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ExporterConfig> {
    let cfg: ExporterConfig = serde_yaml::from_str(s)
        .map_err(|e| WxError::InvalidConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
