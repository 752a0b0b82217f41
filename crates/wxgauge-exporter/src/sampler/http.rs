//! Weather provider over HTTP.

use std::time::Duration;

use async_trait::async_trait;

use wxgauge_core::error::{Result, WxError};
use wxgauge_core::TemperatureSample;

use super::WeatherSource;
use crate::config::WeatherSection;

/// `GET {url}?id={city_id}&APPID={api_key}[&units=..]`, one request per fetch.
pub struct HttpWeatherSource {
    client: reqwest::Client,
    url: String,
    query: Vec<(&'static str, String)>,
}

impl HttpWeatherSource {
    pub fn from_config(cfg: &WeatherSection) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(ms) = cfg.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        let client = builder
            .build()
            .map_err(|e| WxError::Internal(format!("http client build failed: {e}")))?;

        let mut query = vec![("id", cfg.city_id.clone()), ("APPID", cfg.api_key.clone())];
        if let Some(units) = &cfg.units {
            query.push(("units", units.clone()));
        }

        Ok(Self {
            client,
            url: cfg.url.clone(),
            query,
        })
    }
}

#[async_trait]
impl WeatherSource for HttpWeatherSource {
    async fn fetch(&self) -> Result<TemperatureSample> {
        // Errors are stripped of the URL: it carries the API key.
        let resp = self
            .client
            .get(&self.url)
            .query(&self.query)
            .send()
            .await
            .map_err(|e| WxError::Fetch(e.without_url().to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(WxError::Fetch(format!("weather provider answered {status}")));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| WxError::Fetch(format!("read body failed: {}", e.without_url())))?;

        TemperatureSample::from_json(&body)
    }
}
