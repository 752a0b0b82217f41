//! Periodic weather sampling.
//!
//! A [`Sampler`] owns one [`WeatherSource`] and the shared registry. Every
//! period it fetches once; a successful fetch records `temperature` and
//! `feels_like` as last-value observations, a failed one is logged and
//! skipped. There is no retry or backoff.

pub mod http;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};

use wxgauge_core::{Result, TemperatureSample};

use crate::obs::{views, MetricsRegistry};

pub use http::HttpWeatherSource;

/// Anything that can produce one weather sample on demand.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch(&self) -> Result<TemperatureSample>;
}

pub struct Sampler<S> {
    source: S,
    registry: Arc<MetricsRegistry>,
    period: Duration,
}

impl<S: WeatherSource> Sampler<S> {
    pub fn new(source: S, registry: Arc<MetricsRegistry>, period: Duration) -> Self {
        Self { source, registry, period }
    }

    /// One fetch. Records exactly two observations on success, none on error.
    pub async fn tick(&self) -> Result<TemperatureSample> {
        let sample = self.source.fetch().await?;
        self.registry.record(&views::TEMPERATURE, sample.temperature, &[]);
        self.registry.record(&views::FEELS_LIKE, sample.feels_like, &[]);
        Ok(sample)
    }

    /// Tick every period until `shutdown` flips to true or its sender is dropped.
    /// The first tick fires one period after start.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(period_ms = self.period.as_millis() as u64, "sampler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown_requested(&mut shutdown) => break,
            }

            // A fetch in flight is dropped on shutdown; there is no fetch timeout by default.
            tokio::select! {
                res = self.tick() => match res {
                    Ok(s) => tracing::debug!(
                        temperature = s.temperature,
                        feels_like = s.feels_like,
                        pressure = s.pressure,
                        humidity = s.humidity,
                        "sample recorded"
                    ),
                    Err(e) => tracing::warn!(error = %e, code = e.code().as_str(), "weather fetch failed, tick skipped"),
                },
                _ = shutdown_requested(&mut shutdown) => {
                    tracing::info!("shutdown during fetch, fetch abandoned");
                    break;
                }
            }
        }

        tracing::info!("sampler stopped");
    }
}

/// Resolves once `shutdown` reads true or its sender is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        let stop = *shutdown.borrow_and_update();
        if stop || shutdown.changed().await.is_err() {
            return;
        }
    }
}
