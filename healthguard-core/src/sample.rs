//! Canonical sensor sample
//!
//! One cleaned telemetry row. Raw channels are kept as read; derived values
//! (vibration magnitude, calendar fractions) are computed on demand so a
//! sample never carries stale derived state.

use serde::{Deserialize, Serialize};

use crate::time::{self, Timestamp};

/// A cleaned telemetry reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    /// Reading time (UTC)
    pub timestamp: Timestamp,
    /// Machine temperature (°C)
    pub temp: f32,
    /// Motor current (A)
    pub current: f32,
    /// Acceleration, x axis
    pub ax: f32,
    /// Acceleration, y axis
    pub ay: f32,
    /// Acceleration, z axis
    pub az: f32,
}

impl SensorSample {
    /// Build a sample from its raw channels
    pub fn new(timestamp: Timestamp, temp: f32, current: f32, accel: [f32; 3]) -> Self {
        Self {
            timestamp,
            temp,
            current,
            ax: accel[0],
            ay: accel[1],
            az: accel[2],
        }
    }

    /// Euclidean norm of the acceleration triplet
    pub fn vibration_magnitude(&self) -> f32 {
        (self.ax * self.ax + self.ay * self.ay + self.az * self.az).sqrt()
    }

    /// `hour / 24` in UTC
    pub fn hour_frac(&self) -> f32 {
        time::hour_fraction(&self.timestamp)
    }

    /// `day_of_month / 31` in UTC
    pub fn day_frac(&self) -> f32 {
        time::day_fraction(&self.timestamp)
    }

    /// True when every raw channel is a finite number
    pub fn is_finite(&self) -> bool {
        [self.temp, self.current, self.ax, self.ay, self.az]
            .iter()
            .all(|v| v.is_finite())
    }
}
