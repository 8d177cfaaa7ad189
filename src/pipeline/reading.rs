use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::RawReading;

/// One normalized water-quality measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Source row id, when the backend sent one
    pub record_id: Option<String>,
    pub device_id: String,
    pub recorded_at: DateTime<Utc>,
    pub ph: f64,
    pub tds: f64,
    pub turbidity: f64,
    /// Potability as decided upstream, never re-derived here
    pub is_potable: bool,
}

impl From<RawReading> for Reading {
    fn from(raw: RawReading) -> Self {
        Self {
            record_id: raw.id.as_ref().and_then(coerce_string),
            device_id: raw
                .device_id
                .as_ref()
                .and_then(coerce_string)
                .unwrap_or_default(),
            recorded_at: raw
                .created_at
                .as_ref()
                .and_then(coerce_timestamp)
                .unwrap_or_else(Utc::now),
            // Missing or null measurements read as 0.0
            ph: coerce_number(raw.ph.as_ref()),
            tds: coerce_number(raw.tds.as_ref()),
            turbidity: coerce_number(raw.turbidez.as_ref()),
            is_potable: coerce_flag(raw.es_potable.as_ref()),
        }
    }
}

/// Safety limits shared by the potability flag and the per-metric colors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub ph_min: f64,
    pub ph_max: f64,
    pub tds_max: f64,
    pub turbidity_max: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            ph_min: 6.5,
            ph_max: 8.5,
            tds_max: 500.0,
            turbidity_max: 10.0,
        }
    }
}

impl Thresholds {
    #[must_use]
    pub fn ph_safe(&self, ph: f64) -> bool {
        ph >= self.ph_min && ph <= self.ph_max
    }

    #[must_use]
    pub fn tds_safe(&self, tds: f64) -> bool {
        tds < self.tds_max
    }

    #[must_use]
    pub fn turbidity_safe(&self, turbidity: f64) -> bool {
        turbidity < self.turbidity_max
    }

    #[must_use]
    pub fn is_potable(&self, ph: f64, tds: f64, turbidity: f64) -> bool {
        self.ph_safe(ph) && self.tds_safe(tds) && self.turbidity_safe(turbidity)
    }
}

fn coerce_number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0),
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        _ => 0.0,
    }
}

fn coerce_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => matches!(s.trim().to_lowercase().as_str(), "true" | "t" | "1"),
        _ => false,
    }
}

fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Accepts RFC 3339 and Postgres `timestamp without time zone` output (read as UTC).
fn coerce_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                    .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                    .map(|naive| naive.and_utc())
                    .ok()
            }),
        // Epoch seconds
        Value::Number(n) => n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    }
}
