//! In-process metrics registry (measures, views, Prometheus rendering).
//!
//! Writers record raw observations against a [`Measure`]; every registered
//! [`View`] bound to that measure folds the observation into its aggregation.
//! Views are keyed by name and hold one row per projected tag set. Rows are
//! atomics so `record` and `render` may run concurrently from any task.
//!
//! The registry is constructed once at startup and shared through `Arc`.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use wxgauge_core::error::{Result, WxError};

/// A named quantity that observations are recorded against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measure {
    pub name: &'static str,
    pub description: &'static str,
    pub unit: &'static str,
}

impl Measure {
    pub const fn new(name: &'static str, description: &'static str, unit: &'static str) -> Self {
        Self { name, description, unit }
    }
}

/// How a view folds observations.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation {
    /// Keep only the newest value.
    LastValue,
    /// Count values into buckets split at the given bounds. Bucket `i` holds
    /// `bounds[i-1] <= v < bounds[i]`; the last bucket holds `v >= bounds[last]`.
    Distribution(Vec<f64>),
}

/// A named aggregation over one measure.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub name: String,
    pub description: String,
    pub measure: Measure,
    pub aggregation: Aggregation,
    /// Only these tags survive into the view's rows, in this order.
    pub tag_keys: Vec<String>,
}

impl View {
    pub fn new(name: &str, description: &str, measure: Measure, aggregation: Aggregation) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            measure,
            aggregation,
            tag_keys: Vec::new(),
        }
    }

    pub fn with_tag_keys(mut self, keys: &[&str]) -> Self {
        self.tag_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(WxError::InvalidView("view name must not be empty".into()));
        }
        if let Aggregation::Distribution(bounds) = &self.aggregation {
            if bounds.is_empty() {
                return Err(WxError::InvalidView(format!(
                    "{}: distribution needs at least one bucket bound",
                    self.name
                )));
            }
            if bounds.iter().any(|b| !b.is_finite()) {
                return Err(WxError::InvalidView(format!(
                    "{}: bucket bounds must be finite",
                    self.name
                )));
            }
            if bounds.windows(2).any(|w| w[0] >= w[1]) {
                return Err(WxError::InvalidView(format!(
                    "{}: bucket bounds must be strictly increasing",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// Point-in-time copy of one distribution row.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionSnapshot {
    pub bounds: Vec<f64>,
    pub count: u64,
    pub sum: f64,
    /// Non-cumulative counts, `bounds.len() + 1` entries (last is overflow).
    pub bucket_counts: Vec<u64>,
}

type RowKey = Vec<(String, String)>;

struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn new(v: f64) -> Self {
        Self(AtomicU64::new(v.to_bits()))
    }
    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }
    fn store(&self, v: f64) {
        self.0.store(v.to_bits(), Ordering::Relaxed);
    }
    fn add(&self, v: f64) {
        let _ = self.0.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
            Some((f64::from_bits(bits) + v).to_bits())
        });
    }
}

struct AtomicDistribution {
    count: AtomicU64,
    sum: AtomicF64,
    buckets: Box<[AtomicU64]>,
}

impl AtomicDistribution {
    fn new(n_bounds: usize) -> Self {
        Self {
            count: AtomicU64::new(0),
            sum: AtomicF64::new(0.0),
            buckets: (0..=n_bounds).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    fn observe(&self, bounds: &[f64], v: f64) {
        let idx = bounds.iter().position(|&b| v < b).unwrap_or(bounds.len());
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum.add(v);
    }

    fn snapshot(&self, bounds: &[f64]) -> DistributionSnapshot {
        DistributionSnapshot {
            bounds: bounds.to_vec(),
            count: self.count.load(Ordering::Relaxed),
            sum: self.sum.load(),
            bucket_counts: self.buckets.iter().map(|b| b.load(Ordering::Relaxed)).collect(),
        }
    }
}

enum Row {
    LastValue(AtomicF64),
    Distribution(AtomicDistribution),
}

struct ViewState {
    view: View,
    rows: DashMap<RowKey, Row>,
}

impl ViewState {
    fn new(view: View) -> Self {
        Self { view, rows: DashMap::new() }
    }

    fn row_key(&self, tags: &[(&str, &str)]) -> RowKey {
        self.view
            .tag_keys
            .iter()
            .map(|k| {
                let v = tags
                    .iter()
                    .rev()
                    .find(|(tk, _)| *tk == k.as_str())
                    .map(|(_, tv)| tv.to_string())
                    .unwrap_or_default();
                (k.clone(), v)
            })
            .collect()
    }

    fn record(&self, value: f64, tags: &[(&str, &str)]) {
        let key = self.row_key(tags);
        match &self.view.aggregation {
            Aggregation::LastValue => match self.rows.entry(key) {
                Entry::Occupied(e) => {
                    if let Row::LastValue(g) = e.get() {
                        g.store(value);
                    }
                }
                Entry::Vacant(e) => {
                    e.insert(Row::LastValue(AtomicF64::new(value)));
                }
            },
            Aggregation::Distribution(bounds) => {
                let row = self
                    .rows
                    .entry(key)
                    .or_insert_with(|| Row::Distribution(AtomicDistribution::new(bounds.len())));
                if let Row::Distribution(d) = row.value() {
                    d.observe(bounds, value);
                }
            }
        }
    }

    fn sorted_rows(&self) -> Vec<RowKey> {
        let mut keys: Vec<RowKey> = self.rows.iter().map(|r| r.key().clone()).collect();
        keys.sort();
        keys
    }

    fn render(&self, metric: &str, out: &mut String) {
        let v = &self.view;
        let _ = writeln!(out, "# HELP {} {}", metric, escape_help(&v.description));
        match &v.aggregation {
            Aggregation::LastValue => {
                let _ = writeln!(out, "# TYPE {} gauge", metric);
                for key in self.sorted_rows() {
                    let Some(row) = self.rows.get(&key) else { continue };
                    if let Row::LastValue(g) = row.value() {
                        let label_str = label_str(&key);
                        if label_str.is_empty() {
                            let _ = writeln!(out, "{} {}", metric, g.load());
                        } else {
                            let _ = writeln!(out, "{}{{{}}} {}", metric, label_str, g.load());
                        }
                    }
                }
            }
            Aggregation::Distribution(bounds) => {
                let _ = writeln!(out, "# TYPE {} histogram", metric);
                for key in self.sorted_rows() {
                    let Some(row) = self.rows.get(&key) else { continue };
                    let Row::Distribution(d) = row.value() else { continue };
                    let snap = d.snapshot(bounds);

                    let label_str = label_str(&key);
                    let prefix = if label_str.is_empty() {
                        String::new()
                    } else {
                        format!("{},", label_str)
                    };
                    let braces = if label_str.is_empty() {
                        String::new()
                    } else {
                        format!("{{{}}}", label_str)
                    };

                    // Cumulative: `le=bounds[i]` counts every value below bounds[i].
                    let mut acc = 0u64;
                    for (le, n) in bounds.iter().zip(&snap.bucket_counts) {
                        acc += n;
                        let _ = writeln!(out, "{}_bucket{{{}le=\"{}\"}} {}", metric, prefix, le, acc);
                    }
                    acc += snap.bucket_counts.last().copied().unwrap_or(0);
                    let _ = writeln!(out, "{}_bucket{{{}le=\"+Inf\"}} {}", metric, prefix, acc);
                    let _ = writeln!(out, "{}_sum{} {}", metric, braces, snap.sum);
                    let _ = writeln!(out, "{}_count{} {}", metric, braces, acc);
                }
            }
        }
    }
}

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Map an arbitrary name onto `[a-zA-Z0-9_]`.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn label_str(key: &RowKey) -> String {
    key.iter()
        .map(|(k, v)| format!("{}=\"{}\"", sanitize(k), escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Registry of views. Safe for concurrent `record` and `render`.
pub struct MetricsRegistry {
    namespace: String,
    views: DashMap<String, Arc<ViewState>>,
}

impl MetricsRegistry {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            views: DashMap::new(),
        }
    }

    /// Register a view. A name that is already registered is rejected.
    pub fn register(&self, view: View) -> Result<()> {
        view.validate()?;
        match self.views.entry(view.name.clone()) {
            Entry::Occupied(_) => Err(WxError::ViewAlreadyRegistered(view.name)),
            Entry::Vacant(e) => {
                tracing::debug!(view = %view.name, measure = view.measure.name, "view registered");
                e.insert(Arc::new(ViewState::new(view)));
                Ok(())
            }
        }
    }

    /// Register several views, stopping at the first failure.
    pub fn register_all(&self, views: impl IntoIterator<Item = View>) -> Result<()> {
        for view in views {
            self.register(view)?;
        }
        Ok(())
    }

    /// Drop a view and everything it has accumulated.
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.views.remove(name).is_some();
        if removed {
            tracing::debug!(view = %name, "view unregistered");
        }
        removed
    }

    /// Unregister then register `view`, leaving it empty.
    pub fn reregister(&self, view: View) -> Result<()> {
        self.unregister(&view.name);
        self.register(view)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.views.contains_key(name)
    }

    pub fn view_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.views.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    /// Fold one observation into every view bound to `measure`.
    /// Non-finite values and measures without views are dropped.
    pub fn record(&self, measure: &Measure, value: f64, tags: &[(&str, &str)]) {
        if !value.is_finite() {
            tracing::debug!(measure = measure.name, value, "dropping non-finite observation");
            return;
        }
        for state in self.bound_views(measure) {
            state.record(value, tags);
        }
    }

    /// Current value of a last-value view row.
    pub fn last_value(&self, view: &str, tags: &[(&str, &str)]) -> Option<f64> {
        let state = self.views.get(view)?.value().clone();
        let key = state.row_key(tags);
        let row = state.rows.get(&key)?;
        match row.value() {
            Row::LastValue(g) => Some(g.load()),
            Row::Distribution(_) => None,
        }
    }

    /// Current state of a distribution view row.
    pub fn distribution(&self, view: &str, tags: &[(&str, &str)]) -> Option<DistributionSnapshot> {
        let state = self.views.get(view)?.value().clone();
        let Aggregation::Distribution(bounds) = &state.view.aggregation else {
            return None;
        };
        let key = state.row_key(tags);
        let row = state.rows.get(&key)?;
        match row.value() {
            Row::Distribution(d) => Some(d.snapshot(bounds)),
            Row::LastValue(_) => None,
        }
    }

    /// Render every view in Prometheus text exposition format. Read-only.
    pub fn render(&self) -> String {
        let mut states: Vec<Arc<ViewState>> = self.views.iter().map(|r| r.value().clone()).collect();
        states.sort_by(|a, b| a.view.name.cmp(&b.view.name));

        let mut out = String::new();
        for state in states {
            let metric = format!("{}_{}", self.namespace, sanitize(&state.view.name));
            state.render(&metric, &mut out);
        }
        out
    }

    fn bound_views(&self, measure: &Measure) -> Vec<Arc<ViewState>> {
        self.views
            .iter()
            .filter(|r| r.value().view.measure.name == measure.name)
            .map(|r| r.value().clone())
            .collect()
    }
}
