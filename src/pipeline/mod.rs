pub mod reading;
pub mod render;
pub mod window;

pub use reading::{Reading, Thresholds};
pub use render::{render, DashboardView, Metric, Potability, SafetyState};
pub use window::{RollingWindow, DEFAULT_CAPACITY};
