//! Alarm thresholds for raw sensor channels
//!
//! Compared inclusively (`value >= threshold`) against the maximum of each
//! channel over the trailing readings. They are reported next to the model's
//! vote and never change it.

/// Temperature alarm threshold (°C).
pub const TEMP_ALARM_C: f32 = 29.10;

/// Motor current alarm threshold (A).
pub const CURRENT_ALARM_A: f32 = 10.00;

/// Vibration magnitude alarm threshold (‖(ax, ay, az)‖, sensor units).
pub const VIBRATION_ALARM: f32 = 0.20;
