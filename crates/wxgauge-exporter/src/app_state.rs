//! Shared application state for the exporter.
//!
//! Owns the config, the metrics registry (with every startup view
//! registered), and the draining flag read by `/readyz`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use wxgauge_core::error::Result;

use crate::config::ExporterConfig;
use crate::obs::{views, MetricsRegistry};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    metrics: Arc<MetricsRegistry>,
}

struct AppStateInner {
    cfg: ExporterConfig,
    draining: AtomicBool,
}

impl AppState {
    /// Build application state and register the startup views.
    /// A registration failure is returned; callers treat it as fatal.
    pub fn new(cfg: ExporterConfig) -> Result<Self> {
        let metrics = Arc::new(MetricsRegistry::new(&cfg.metrics.namespace));
        metrics.register_all(views::default_views())?;

        tracing::info!(views = ?metrics.view_names(), "views registered");

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                draining: AtomicBool::new(false),
            }),
            metrics,
        })
    }

    pub fn cfg(&self) -> &ExporterConfig {
        &self.inner.cfg
    }

    pub fn metrics(&self) -> Arc<MetricsRegistry> {
        Arc::clone(&self.metrics)
    }

    /// Mark draining state.
    pub fn set_draining(&self) {
        self.inner.draining.store(true, Ordering::Relaxed);
    }

    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Relaxed)
    }
}
