//! Unit tests for the dashboard view-model.
//!
//! Run with: cargo test --test render_test

use std::f64::consts::PI;

use chrono::{TimeZone, Utc};
use water_monitor::pipeline::render::needle_angle;
use water_monitor::pipeline::{
    render, Metric, Potability, Reading, RollingWindow, SafetyState, Thresholds,
};

fn reading(second: u32, ph: f64, tds: f64, turbidity: f64, is_potable: bool) -> Reading {
    Reading {
        record_id: Some(second.to_string()),
        device_id: "AA:BB:CC:DD:EE:FF".to_string(),
        recorded_at: Utc.with_ymd_and_hms(2025, 3, 1, 8, 5, second).unwrap(),
        ph,
        tds,
        turbidity,
        is_potable,
    }
}

fn window_of(readings: Vec<Reading>) -> RollingWindow {
    let mut window = RollingWindow::new(20);
    window.replace(readings);
    window
}

#[test]
fn empty_window_renders_nothing() {
    assert!(render(&RollingWindow::new(20), &Thresholds::default()).is_none());
}

#[test]
fn readouts_use_fixed_precision() {
    let window = window_of(vec![reading(0, 7.04, 120.6, 2.26, true)]);
    let view = render(&window, &Thresholds::default()).unwrap();

    assert_eq!(view.readout(Metric::Ph).unwrap().display, "7.0");
    assert_eq!(view.readout(Metric::Tds).unwrap().display, "121");
    assert_eq!(view.readout(Metric::Turbidity).unwrap().display, "2.3");
}

#[test]
fn each_metric_is_colored_independently() {
    let window = window_of(vec![reading(0, 9.1, 120.0, 12.0, false)]);
    let view = render(&window, &Thresholds::default()).unwrap();

    assert_eq!(view.readout(Metric::Ph).unwrap().state, SafetyState::Unsafe);
    assert_eq!(view.readout(Metric::Tds).unwrap().state, SafetyState::Safe);
    assert_eq!(
        view.readout(Metric::Turbidity).unwrap().state,
        SafetyState::Unsafe
    );
}

#[test]
fn banner_mirrors_upstream_flag() {
    // All metrics in range, but the device said not potable
    let window = window_of(vec![reading(0, 7.0, 100.0, 1.0, false)]);
    let view = render(&window, &Thresholds::default()).unwrap();
    assert_eq!(view.potability, Potability::NotPotable);

    let window = window_of(vec![reading(0, 7.0, 100.0, 1.0, true)]);
    let view = render(&window, &Thresholds::default()).unwrap();
    assert_eq!(view.potability, Potability::Potable);
}

#[test]
fn readouts_come_from_latest_and_series_cover_window() {
    let window = window_of(vec![
        reading(1, 6.8, 100.0, 1.0, true),
        reading(2, 7.0, 110.0, 2.0, true),
        reading(3, 7.2, 120.0, 3.0, true),
    ]);
    let view = render(&window, &Thresholds::default()).unwrap();

    assert_eq!(view.readout(Metric::Tds).unwrap().value, 120.0);
    assert_eq!(view.labels, vec!["08:05:01", "08:05:02", "08:05:03"]);
    assert_eq!(
        view.series_for(Metric::Tds).unwrap().values,
        vec![100.0, 110.0, 120.0]
    );
    assert_eq!(view.series.len(), 3);
    assert_eq!(view.gauges.len(), 3);
    assert_eq!(view.device_id, "AA:BB:CC:DD:EE:FF");
}

#[test]
fn series_are_chronological_even_if_window_is_not() {
    let mut window = RollingWindow::new(20);
    window.append(reading(5, 7.0, 500.0, 1.0, true));
    window.append(reading(3, 7.0, 300.0, 1.0, true));
    window.append(reading(4, 7.0, 400.0, 1.0, true));

    let view = render(&window, &Thresholds::default()).unwrap();
    assert_eq!(view.labels, vec!["08:05:03", "08:05:04", "08:05:05"]);
    assert_eq!(
        view.series_for(Metric::Tds).unwrap().values,
        vec![300.0, 400.0, 500.0]
    );
}

#[test]
fn chart_ranges_are_fixed() {
    let window = window_of(vec![reading(0, 7.0, 100.0, 1.0, true)]);
    let view = render(&window, &Thresholds::default()).unwrap();

    let turbidity = view.series_for(Metric::Turbidity).unwrap();
    assert_eq!((turbidity.y_min, turbidity.y_max), (0.0, 20.0));
    assert_eq!(turbidity.label, "Turbidity");
    let ph = view.series_for(Metric::Ph).unwrap();
    assert_eq!((ph.y_min, ph.y_max), (0.0, 14.0));
}

#[test]
fn render_is_idempotent() {
    let window = window_of(vec![
        reading(1, 6.8, 100.0, 1.0, true),
        reading(2, 7.0, 110.0, 2.0, false),
    ]);
    let thresholds = Thresholds::default();

    assert_eq!(render(&window, &thresholds), render(&window, &thresholds));
}

#[test]
fn needle_angle_is_clamped_to_dial() {
    let start = 140.0 * PI / 180.0;
    let end = 400.0 * PI / 180.0;

    assert!((needle_angle(0.0, 0.0, 14.0) - start).abs() < 1e-9);
    assert!((needle_angle(14.0, 0.0, 14.0) - end).abs() < 1e-9);
    assert!((needle_angle(7.0, 0.0, 14.0) - 270.0 * PI / 180.0).abs() < 1e-9);
    assert!((needle_angle(-3.0, 0.0, 14.0) - start).abs() < 1e-9);
    assert!((needle_angle(50.0, 0.0, 10.0) - end).abs() < 1e-9);
}
