//! Feature Engineering for Health-State Models
//!
//! ## Overview
//!
//! Every cleaned sample becomes a 5-dimensional [`FeatureVector`]:
//!
//! ```text
//! [ temp_z, current_z, hour_z, day_z, vibration_norm ]
//!     │        │         │       │         └─ min-max of ‖(ax, ay, az)‖
//!     │        │         │       └─ z-score of day_of_month / 31
//!     │        │         └─ z-score of hour / 24
//!     │        └─ z-score of current
//!     └─ z-score of temperature
//! ```
//!
//! Consecutive vectors are then sliced into overlapping [`Window`]s of
//! `sequence_length` samples with stride 1.
//!
//! ## Scaling Source
//!
//! Scaling statistics come from one of two places:
//!
//! - [`ScalingSource::FitBatch`]: mean/std and min/max of the batch being
//!   transformed. Two batches scaled this way are *not* on a common scale:
//!   a hot afternoon looks "normal" if the whole batch is hot.
//! - [`ScalingSource::Fixed`]: parameters fitted earlier (the training batch,
//!   persisted inside the classifier artifact) so inference sees the same
//!   coordinates the classifier was trained in.
//!
//! ## Window Count
//!
//! For `N` samples and window length `L` exactly `max(0, N − L)` windows are
//! produced; the window starting at sample `i` covers `i..i + L`. The newest
//! sample therefore never ends a window. Fewer than `L + 1` samples give an
//! empty result, which callers treat as "insufficient data", not as a fault.

mod scaler;
mod window;

use serde::{Deserialize, Serialize};

use crate::{
    constants::{FEATURE_DIM, SEQUENCE_LENGTH},
    sample::SensorSample,
};

pub use scaler::{FeatureScaler, MinMax, ScalerParams, ZScore};
pub use window::{build_windows, mean_over_windows, Window};

/// Named feature dimensions, in vector order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureKind {
    /// Z-scored temperature
    Temperature,
    /// Z-scored current
    Current,
    /// Z-scored hour fraction
    HourOfDay,
    /// Z-scored day-of-month fraction
    DayOfMonth,
    /// Min-max scaled vibration magnitude
    Vibration,
}

impl FeatureKind {
    /// All kinds in vector order
    pub const ALL: [FeatureKind; FEATURE_DIM] = [
        FeatureKind::Temperature,
        FeatureKind::Current,
        FeatureKind::HourOfDay,
        FeatureKind::DayOfMonth,
        FeatureKind::Vibration,
    ];

    /// Position inside a [`FeatureVector`]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Kind stored at `index`
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Name used in reports
    pub fn name(self) -> &'static str {
        match self {
            FeatureKind::Temperature => "temperature",
            FeatureKind::Current => "current",
            FeatureKind::HourOfDay => "hour_of_day",
            FeatureKind::DayOfMonth => "day_of_month",
            FeatureKind::Vibration => "vibration",
        }
    }
}

/// One engineered, scaled sample
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector(pub [f32; FEATURE_DIM]);

impl FeatureVector {
    /// Raw values in [`FeatureKind::ALL`] order
    pub fn values(&self) -> &[f32; FEATURE_DIM] {
        &self.0
    }

    /// Value of one named feature
    pub fn get(&self, kind: FeatureKind) -> f32 {
        self.0[kind.index()]
    }

    /// Feature with the largest value; ties go to the earlier dimension
    pub fn argmax(&self) -> (FeatureKind, f32) {
        let mut best = 0;
        for (i, &value) in self.0.iter().enumerate().skip(1) {
            if value > self.0[best] {
                best = i;
            }
        }
        (FeatureKind::ALL[best], self.0[best])
    }
}

/// Feature engineering settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Samples per window
    pub sequence_length: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sequence_length: SEQUENCE_LENGTH,
        }
    }
}

/// Where scaling statistics come from
#[derive(Debug, Clone, Copy)]
pub enum ScalingSource<'a> {
    /// Fit on the batch being transformed
    FitBatch,
    /// Reuse previously fitted parameters
    Fixed(&'a ScalerParams),
}

/// Output of [`FeatureEngineer::engineer`]
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    /// One vector per input sample, same order
    pub vectors: Vec<FeatureVector>,
    /// Parameters the vectors were scaled with
    pub scaler: ScalerParams,
}

/// Derives, scales and windows features
#[derive(Debug, Clone, Default)]
pub struct FeatureEngineer {
    config: FeatureConfig,
}

impl FeatureEngineer {
    /// Engineer with explicit settings
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    /// Settings in use
    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Scale every sample into a feature vector
    pub fn engineer(&self, samples: &[SensorSample], scaling: ScalingSource<'_>) -> FeatureSet {
        let scaler = match scaling {
            ScalingSource::FitBatch => FeatureScaler::fit(samples),
            ScalingSource::Fixed(params) => params.clone(),
        };

        let vectors = samples.iter().map(|s| scaler.transform(s)).collect();
        FeatureSet { vectors, scaler }
    }

    /// Slice vectors into overlapping windows
    pub fn windows(&self, vectors: &[FeatureVector]) -> Vec<Window> {
        build_windows(vectors, self.config.sequence_length)
    }

    /// Minimum sample count that yields at least one window
    pub fn min_samples(&self) -> usize {
        self.config.sequence_length + 1
    }
}
