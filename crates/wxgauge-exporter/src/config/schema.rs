use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;
use wxgauge_core::error::{Result, WxError};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub metrics: MetricsSection,

    #[serde(default)]
    pub sampler: SamplerSection,

    pub weather: WeatherSection,

    #[serde(default)]
    pub repl: ReplSection,
}

impl ExporterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(WxError::InvalidConfig(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.server.validate()?;
        self.metrics.validate()?;
        self.sampler.validate()?;
        self.weather.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr().map(|_| ())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|_| {
            WxError::InvalidConfig(format!(
                "server.listen must be a valid SocketAddr, got {:?}",
                self.listen
            ))
        })
    }
}

fn default_listen() -> String {
    "0.0.0.0:8888".into()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
        }
    }
}

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        let mut chars = self.namespace.chars();
        let head_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
        if !head_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(WxError::InvalidConfig(
                "metrics.namespace must match [a-zA-Z_][a-zA-Z0-9_]*".into(),
            ));
        }
        Ok(())
    }
}

fn default_namespace() -> String {
    "exporter".into()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamplerSection {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for SamplerSection {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

impl SamplerSection {
    pub fn validate(&self) -> Result<()> {
        if !(100..=3_600_000).contains(&self.interval_ms) {
            return Err(WxError::InvalidConfig(
                "sampler.interval_ms must be between 100 and 3600000".into(),
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_interval_ms() -> u64 {
    2000
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeatherSection {
    #[serde(default = "default_weather_url")]
    pub url: String,

    #[serde(default = "default_city_id")]
    pub city_id: String,

    pub api_key: String,

    /// Provider unit system (`standard`, `metric`, `imperial`). Omitted from
    /// the request when unset.
    #[serde(default)]
    pub units: Option<String>,

    /// No timeout when unset; a stuck request holds the sampler.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl WeatherSection {
    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(WxError::InvalidConfig(
                "weather.url must start with http:// or https://".into(),
            ));
        }
        if self.city_id.trim().is_empty() {
            return Err(WxError::InvalidConfig("weather.city_id must not be empty".into()));
        }
        if self.api_key.trim().is_empty() {
            return Err(WxError::InvalidConfig("weather.api_key must not be empty".into()));
        }
        if self.timeout_ms == Some(0) {
            return Err(WxError::InvalidConfig(
                "weather.timeout_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn default_weather_url() -> String {
    "http://api.openweathermap.org/data/2.5/weather".into()
}
fn default_city_id() -> String {
    "1162015".into()
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ReplSection {
    /// Read lines from stdin and echo them upper-cased.
    #[serde(default)]
    pub enabled: bool,
}
