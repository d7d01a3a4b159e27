//! Common test utilities for model integration tests
//!
//! Provides:
//! - Telemetry generators producing raw tables the cleaner accepts
//! - Small network configurations that train in milliseconds

#![allow(dead_code)]

use healthguard_core::RawTable;
use healthguard_ml::{ClassifierConfig, PipelineConfig};

/// 2024-03-15 18:30:00 UTC
pub const START_MS: i64 = 1_710_527_400_000;

/// One minute between readings
pub const STEP_MS: i64 = 60_000;

/// One raw telemetry row
#[derive(Debug, Clone, Copy)]
pub struct Row {
    pub temp: f32,
    pub current: f32,
    pub accel: [f32; 3],
}

impl Row {
    pub fn calm() -> Self {
        Self {
            temp: 20.0,
            current: 5.0,
            accel: [0.0, 0.0, 0.0],
        }
    }

    pub fn spike() -> Self {
        Self {
            temp: 35.0,
            current: 15.0,
            accel: [1.0, 1.0, 1.0],
        }
    }
}

/// Builds raw tables in the device's export format (units appended)
pub struct TelemetryBuilder {
    rows: Vec<Row>,
}

impl TelemetryBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn push(mut self, row: Row, count: usize) -> Self {
        self.rows.extend(std::iter::repeat(row).take(count));
        self
    }

    /// Deterministic pseudo-noisy operation cycling through three regimes
    pub fn regimes(mut self, count: usize) -> Self {
        let mut state: u32 = 0x2545_f491;
        for i in 0..count {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let noise = (state % 1000) as f32 / 1000.0 - 0.5;

            let regime = (i / 7) % 3;
            self.rows.push(Row {
                temp: 20.0 + regime as f32 * 5.0 + noise,
                current: 5.0 + regime as f32 * 2.5 + noise * 0.3,
                accel: [0.01, 0.02, 0.03 + regime as f32 * 0.08 + noise * 0.01],
            });
        }
        self
    }

    pub fn build(self) -> RawTable {
        let mut table = RawTable::new(
            ["timestamp", "temp", "current", "ax", "ay", "az"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        for (i, row) in self.rows.iter().enumerate() {
            table.push_row(vec![
                (START_MS + i as i64 * STEP_MS).to_string(),
                format!("{:.2}°C", row.temp),
                format!("{:.2} A", row.current),
                format!("{:.3}", row.accel[0]),
                format!("{:.3}", row.accel[1]),
                format!("{:.3}", row.accel[2]),
            ]);
        }
        table
    }
}

impl Default for TelemetryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Pipeline settings with a tiny network and a short schedule
pub fn quick_config() -> PipelineConfig {
    PipelineConfig::default().with_classifier(
        ClassifierConfig::default()
            .with_units(8, 4, 4)
            .with_max_epochs(3),
    )
}
