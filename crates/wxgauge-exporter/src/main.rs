//! wxgauge exporter
//!
//! - Scrape endpoint: /metrics (plus /healthz, /readyz)
//! - Weather sampler: one fetch per interval, temperature gauges
//! - Optional stdin line echo loop feeding the latency / line-length views
//!
//! Config load, view registration and socket bind failures are fatal.

use tokio::io::BufReader;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::{fmt, EnvFilter};

use wxgauge_core::Result;
use wxgauge_exporter::app_state::AppState;
use wxgauge_exporter::repl::LineProcessor;
use wxgauge_exporter::sampler::{HttpWeatherSource, Sampler};
use wxgauge_exporter::{config, router};

const DEFAULT_CONFIG_PATH: &str = "wxgauge.yaml";

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, code = e.code().as_str(), "wxgauge-exporter failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::load_from_file(&path)?;

    let listen = cfg.server.listen_addr()?;
    let period = cfg.sampler.interval();
    let repl_enabled = cfg.repl.enabled;
    let source = HttpWeatherSource::from_config(&cfg.weather)?;

    let state = AppState::new(cfg)?;
    let app = router::build_router(state.clone());

    tracing::info!(%listen, config = %path, "wxgauge-exporter starting");
    let listener = TcpListener::bind(listen).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sampler = Sampler::new(source, state.metrics(), period);
    let sampler_task = tokio::spawn(sampler.run(shutdown_rx));

    if repl_enabled {
        let processor = LineProcessor::new(state.metrics());
        tokio::spawn(async move {
            let stdin = BufReader::new(tokio::io::stdin());
            if let Err(e) = processor.run(stdin, tokio::io::stdout()).await {
                tracing::warn!(error = %e, "line loop stopped");
            }
        });
    }

    let drain = state.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "ctrl-c handler unavailable, serving until killed");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutdown signal received, draining");
            drain.set_draining();
            let _ = shutdown_tx.send(true);
        })
        .await?;

    if let Err(e) = sampler_task.await {
        tracing::error!(error = %e, "sampler task failed");
    }
    tracing::info!("wxgauge-exporter stopped");
    Ok(())
}
