//! Common test utilities for cleaning and feature integration tests

#![allow(dead_code)]

use healthguard_core::{time::from_epoch_millis, SensorSample};

/// 2024-03-15 18:30:00 UTC
pub const START_MS: i64 = 1_710_527_400_000;

/// Header in the gateway export order
pub const HEADER: &str = "timestamp,temp,current,ax,ay,az";

/// One CSV line with units the way the gateway writes them
pub fn csv_line(millis: i64, temp: f32, current: f32, accel: [f32; 3]) -> String {
    format!(
        "{},{:.2}°C,{:.2} A,{:.3},{:.3},{:.3}",
        millis, temp, current, accel[0], accel[1], accel[2]
    )
}

/// A full CSV document with `rows` readings one minute apart
pub fn csv_document(rows: usize) -> String {
    let mut doc = String::from(HEADER);
    doc.push('\n');
    for i in 0..rows {
        let level = (i % 4) as f32;
        doc.push_str(&csv_line(
            START_MS + i as i64 * 60_000,
            20.0 + level,
            5.0 + level * 0.5,
            [0.01, 0.02, 0.05 * level],
        ));
        doc.push('\n');
    }
    doc
}

/// Samples one minute apart with slowly rising temperature
pub fn samples(count: usize) -> Vec<SensorSample> {
    (0..count)
        .map(|i| {
            let ts = from_epoch_millis(START_MS + i as i64 * 60_000)
                .expect("timestamp in range");
            SensorSample::new(ts, 20.0 + i as f32 * 0.1, 5.0, [0.0, 0.0, 0.1])
        })
        .collect()
}
