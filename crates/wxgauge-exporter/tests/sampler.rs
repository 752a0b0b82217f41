//! Sampler tick and loop behaviour against scripted and HTTP weather sources.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tokio::sync::watch;

use wxgauge_core::{Result, TemperatureSample, WxError};
use wxgauge_exporter::config::WeatherSection;
use wxgauge_exporter::obs::{views, MetricsRegistry};
use wxgauge_exporter::sampler::{HttpWeatherSource, Sampler, WeatherSource};

const PERIOD: Duration = Duration::from_secs(2);

#[derive(Default)]
struct Script {
    replies: Mutex<VecDeque<Result<TemperatureSample>>>,
    calls: AtomicUsize,
}

#[derive(Clone, Default)]
struct ScriptedSource(Arc<Script>);

impl ScriptedSource {
    fn push_json(&self, body: &str) -> &Self {
        self.0
            .replies
            .lock()
            .unwrap()
            .push_back(TemperatureSample::from_json(body));
        self
    }

    fn push_err(&self, msg: &str) -> &Self {
        self.0
            .replies
            .lock()
            .unwrap()
            .push_back(Err(WxError::Fetch(msg.to_string())));
        self
    }

    fn calls(&self) -> usize {
        self.0.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherSource for ScriptedSource {
    async fn fetch(&self) -> Result<TemperatureSample> {
        self.0.calls.fetch_add(1, Ordering::SeqCst);
        self.0
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(WxError::Fetch("script exhausted".into())))
    }
}

fn registry() -> Arc<MetricsRegistry> {
    let r = MetricsRegistry::new("exporter");
    r.register_all(views::default_views()).unwrap();
    Arc::new(r)
}

fn gauges(r: &MetricsRegistry) -> (Option<f64>, Option<f64>) {
    (
        r.last_value(views::TEMPERATURE_VIEW, &[]),
        r.last_value(views::FEELS_LIKE_VIEW, &[]),
    )
}

fn sample_json(temp: f64, feels_like: f64) -> String {
    format!(r#"{{"main":{{"temp":{temp},"feels_like":{feels_like},"pressure":1013,"humidity":40}}}}"#)
}

#[tokio::test]
async fn tick_records_temp_and_feels_like() {
    let reg = registry();
    let src = ScriptedSource::default();
    src.push_json(r#"{"main":{"temp":72.5,"feels_like":70.1,"pressure":1013,"humidity":40}}"#);

    let sampler = Sampler::new(src.clone(), Arc::clone(&reg), PERIOD);
    let sample = sampler.tick().await.unwrap();

    assert_eq!(sample.pressure, 1013.0);
    assert_eq!(gauges(&reg), (Some(72.5), Some(70.1)));

    // Only the two temperature views moved.
    assert_eq!(reg.last_value(views::LINE_COUNT_VIEW, &[]), None);
    assert_eq!(reg.distribution(views::LINE_LENGTH_VIEW, &[]), None);
}

#[tokio::test]
async fn malformed_body_keeps_previous_gauges() {
    let reg = registry();
    let src = ScriptedSource::default();
    src.push_json(&sample_json(72.5, 70.1)).push_json(r#"{"main":{"temp":"#);

    let sampler = Sampler::new(src.clone(), Arc::clone(&reg), PERIOD);
    sampler.tick().await.unwrap();
    let err = sampler.tick().await.expect_err("must fail");

    assert_eq!(err.code().as_str(), "DECODE");
    assert_eq!(gauges(&reg), (Some(72.5), Some(70.1)));
}

#[tokio::test]
async fn transport_error_records_nothing() {
    let reg = registry();
    let src = ScriptedSource::default();
    src.push_err("connection refused");

    let sampler = Sampler::new(src.clone(), Arc::clone(&reg), PERIOD);
    let err = sampler.tick().await.expect_err("must fail");

    assert!(!err.is_fatal());
    assert_eq!(gauges(&reg), (None, None));
    assert_eq!(src.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn loop_keeps_ticking_after_errors_and_last_value_wins() {
    let reg = registry();
    let src = ScriptedSource::default();
    src.push_json(&sample_json(70.0, 69.0))
        .push_err("timeout")
        .push_json(&sample_json(75.0, 74.0));

    let (tx, rx) = watch::channel(false);
    let task = tokio::spawn(Sampler::new(src.clone(), Arc::clone(&reg), PERIOD).run(rx));

    // Nothing before the first period elapses.
    tokio::time::sleep(PERIOD / 2).await;
    assert_eq!(src.calls(), 0);

    tokio::time::sleep(PERIOD).await;
    assert_eq!(src.calls(), 1);
    assert_eq!(gauges(&reg), (Some(70.0), Some(69.0)));

    tokio::time::sleep(PERIOD).await;
    assert_eq!(src.calls(), 2);
    assert_eq!(gauges(&reg), (Some(70.0), Some(69.0)));

    tokio::time::sleep(PERIOD).await;
    assert_eq!(src.calls(), 3);
    assert_eq!(gauges(&reg), (Some(75.0), Some(74.0)));

    tx.send(true).unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn loop_stops_when_shutdown_sender_drops() {
    let reg = registry();
    let src = ScriptedSource::default();

    let (tx, rx) = watch::channel(false);
    let task = tokio::spawn(Sampler::new(src.clone(), reg, PERIOD).run(rx));

    drop(tx);
    task.await.unwrap();
    assert_eq!(src.calls(), 0);
}

/// Never answers.
struct HangingSource(Arc<AtomicUsize>);

#[async_trait]
impl WeatherSource for HangingSource {
    async fn fetch(&self) -> Result<TemperatureSample> {
        self.0.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn shutdown_interrupts_a_hanging_fetch() {
    let calls = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = watch::channel(false);
    let sampler = Sampler::new(HangingSource(Arc::clone(&calls)), registry(), Duration::from_millis(100));
    let task = tokio::spawn(sampler.run(rx));

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(3), task)
        .await
        .expect("sampler must stop while a fetch is in flight")
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

async fn weather_handler(Query(q): Query<HashMap<String, String>>) -> (StatusCode, String) {
    let id = q.get("id").map(String::as_str);
    let key = q.get("APPID").map(String::as_str);
    match (id, key, q.get("units").map(String::as_str)) {
        (Some("1162015"), Some("good"), Some("imperial")) => (StatusCode::OK, sample_json(72.5, 70.1)),
        (Some("1162015"), Some("good"), None) => (StatusCode::OK, sample_json(295.9, 296.3)),
        _ => (
            StatusCode::UNAUTHORIZED,
            r#"{"cod":401,"message":"Invalid API key"}"#.to_string(),
        ),
    }
}

async fn serve_weather() -> String {
    let app = Router::new().route("/data/2.5/weather", get(weather_handler));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/data/2.5/weather")
}

fn weather_cfg(url: String, api_key: &str, units: Option<&str>) -> WeatherSection {
    WeatherSection {
        url,
        city_id: "1162015".into(),
        api_key: api_key.into(),
        units: units.map(str::to_string),
        timeout_ms: Some(5000),
    }
}

#[tokio::test]
async fn http_source_reads_provider_json() {
    let url = serve_weather().await;

    let src = HttpWeatherSource::from_config(&weather_cfg(url.clone(), "good", Some("imperial"))).unwrap();
    let sample = src.fetch().await.unwrap();
    assert_eq!(sample.temperature, 72.5);
    assert_eq!(sample.feels_like, 70.1);
    assert_eq!(sample.humidity, 40.0);

    let src = HttpWeatherSource::from_config(&weather_cfg(url, "good", None)).unwrap();
    assert_eq!(src.fetch().await.unwrap().temperature, 295.9);
}

#[tokio::test]
async fn http_source_error_status_is_fetch_error() {
    let url = serve_weather().await;
    let src = HttpWeatherSource::from_config(&weather_cfg(url, "bad", None)).unwrap();

    let err = src.fetch().await.expect_err("must fail");
    assert_eq!(err.code().as_str(), "FETCH");
    assert!(!err.to_string().contains("bad"));
}

#[tokio::test]
async fn http_source_unreachable_is_fetch_error() {
    // Bind then drop to get a port nobody listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let src = HttpWeatherSource::from_config(&weather_cfg(format!("http://{addr}/w"), "good", None)).unwrap();
    let err = src.fetch().await.expect_err("must fail");
    assert_eq!(err.code().as_str(), "FETCH");
}
