//! Window snapshot → dashboard view-model.
//!
//! Everything the presentation layer draws is derived here from the rolling
//! window alone: numeric readouts and their safety colors come from the latest
//! reading, the potability banner mirrors that reading's upstream flag, and the
//! time-series charts get the whole window in chronological order.
//!
//! Rendering is a pure function. An empty window renders to `None`, which the
//! presentation layer treats as "leave the previous frame alone".

use std::f64::consts::PI;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::pipeline::{Reading, RollingWindow, Thresholds};

/// Gauge arc starts at 140° (roughly 7 o'clock) and sweeps 260°.
const GAUGE_START_DEG: f64 = 140.0;
const GAUGE_SWEEP_DEG: f64 = 260.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Ph,
    Tds,
    Turbidity,
}

impl Metric {
    pub const ALL: [Self; 3] = [Self::Ph, Self::Tds, Self::Turbidity];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Ph => "pH",
            Self::Tds => "TDS",
            Self::Turbidity => "Turbidity",
        }
    }

    #[must_use]
    pub fn value(self, reading: &Reading) -> f64 {
        match self {
            Self::Ph => reading.ph,
            Self::Tds => reading.tds,
            Self::Turbidity => reading.turbidity,
        }
    }

    /// Fixed display precision: pH and turbidity one decimal, TDS whole ppm.
    #[must_use]
    pub fn format(self, value: f64) -> String {
        match self {
            Self::Ph | Self::Turbidity => format!("{value:.1}"),
            Self::Tds => format!("{:.0}", value.round()),
        }
    }

    #[must_use]
    pub fn is_safe(self, value: f64, thresholds: &Thresholds) -> bool {
        match self {
            Self::Ph => thresholds.ph_safe(value),
            Self::Tds => thresholds.tds_safe(value),
            Self::Turbidity => thresholds.turbidity_safe(value),
        }
    }

    /// Dial range used for needle placement
    #[must_use]
    pub fn gauge_range(self) -> (f64, f64) {
        match self {
            Self::Ph => (0.0, 14.0),
            Self::Tds => (0.0, 1000.0),
            Self::Turbidity => (0.0, 10.0),
        }
    }

    /// Y-axis range of the history chart
    #[must_use]
    pub fn chart_range(self) -> (f64, f64) {
        match self {
            Self::Ph => (0.0, 14.0),
            Self::Tds => (0.0, 1000.0),
            Self::Turbidity => (0.0, 20.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SafetyState {
    Safe,
    Unsafe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Potability {
    Potable,
    NotPotable,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Readout {
    pub metric: Metric,
    pub value: f64,
    pub display: String,
    pub state: SafetyState,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Gauge {
    pub metric: Metric,
    pub value: f64,
    pub min: f64,
    pub max: f64,
    /// Needle rotation in radians, clamped to the dial
    pub needle_angle: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Series {
    pub metric: Metric,
    #[schema(value_type = String)]
    pub label: &'static str,
    pub y_min: f64,
    pub y_max: f64,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DashboardView {
    pub device_id: String,
    pub latest_at: DateTime<Utc>,
    pub readouts: Vec<Readout>,
    pub potability: Potability,
    pub gauges: Vec<Gauge>,
    /// Shared x-axis labels, oldest first
    pub labels: Vec<String>,
    pub series: Vec<Series>,
}

impl DashboardView {
    #[must_use]
    pub fn readout(&self, metric: Metric) -> Option<&Readout> {
        self.readouts.iter().find(|r| r.metric == metric)
    }

    #[must_use]
    pub fn series_for(&self, metric: Metric) -> Option<&Series> {
        self.series.iter().find(|s| s.metric == metric)
    }
}

/// Build the view-model for the current window, or `None` if it is empty.
#[must_use]
pub fn render(window: &RollingWindow, thresholds: &Thresholds) -> Option<DashboardView> {
    let latest = window.latest()?;

    let readouts = Metric::ALL
        .iter()
        .map(|&metric| {
            let value = metric.value(latest);
            Readout {
                metric,
                value,
                display: metric.format(value),
                state: if metric.is_safe(value, thresholds) {
                    SafetyState::Safe
                } else {
                    SafetyState::Unsafe
                },
            }
        })
        .collect();

    let gauges = Metric::ALL
        .iter()
        .map(|&metric| {
            let value = metric.value(latest);
            let (min, max) = metric.gauge_range();
            Gauge {
                metric,
                value,
                min,
                max,
                needle_angle: needle_angle(value, min, max),
            }
        })
        .collect();

    // Realtime delivery can be out of order; charts always read left to right in time.
    let mut history: Vec<&Reading> = window.iter().collect();
    history.sort_by_key(|r| r.recorded_at);

    let labels = history
        .iter()
        .map(|r| r.recorded_at.format("%H:%M:%S").to_string())
        .collect();

    let series = Metric::ALL
        .iter()
        .map(|&metric| {
            let (y_min, y_max) = metric.chart_range();
            Series {
                metric,
                label: metric.label(),
                y_min,
                y_max,
                values: history.iter().map(|r| metric.value(r)).collect(),
            }
        })
        .collect();

    Some(DashboardView {
        device_id: latest.device_id.clone(),
        latest_at: latest.recorded_at,
        readouts,
        potability: if latest.is_potable {
            Potability::Potable
        } else {
            Potability::NotPotable
        },
        gauges,
        labels,
        series,
    })
}

/// Map a value onto the 260° dial, in radians.
#[must_use]
pub fn needle_angle(value: f64, min: f64, max: f64) -> f64 {
    let span = max - min;
    let normalized = if span > 0.0 {
        ((value - min) / span).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (GAUGE_START_DEG + normalized * GAUGE_SWEEP_DEG) * PI / 180.0
}
