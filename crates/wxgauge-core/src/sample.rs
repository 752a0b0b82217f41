//! Weather sample model and JSON field extraction.
//!
//! The weather provider answers with a JSON document carrying the readings
//! under `main`. Only the body has to be valid JSON: a missing field, `null`,
//! or a non-numeric string reads as `0.0`, numeric strings parse, and `true`
//! reads as `1.0`. Values pass through without unit conversion.

use serde_json::Value;

use crate::error::{Result, WxError};

/// One poll's worth of readings. Not retained after it is recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TemperatureSample {
    pub temperature: f64,
    pub feels_like: f64,
    pub pressure: f64,
    pub humidity: f64,
}

impl TemperatureSample {
    /// Extract `main.temp`, `main.feels_like`, `main.pressure`, `main.humidity`.
    pub fn from_json(body: &str) -> Result<Self> {
        let doc: Value =
            serde_json::from_str(body).map_err(|e| WxError::Decode(format!("invalid json: {e}")))?;

        Ok(Self {
            temperature: field(&doc, "/main/temp"),
            feels_like: field(&doc, "/main/feels_like"),
            pressure: field(&doc, "/main/pressure"),
            humidity: field(&doc, "/main/humidity"),
        })
    }
}

fn field(doc: &Value, pointer: &str) -> f64 {
    match doc.pointer(pointer) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        Some(Value::Bool(true)) => 1.0,
        _ => 0.0,
    }
}
