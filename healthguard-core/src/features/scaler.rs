//! Batch scalers
//!
//! Statistics are accumulated in `f64` and stored as `f32`. A feature with no
//! spread gets a unit scale, so every value of the fitting batch maps to 0
//! instead of dividing by zero.

use serde::{Deserialize, Serialize};

use super::FeatureVector;
use crate::sample::SensorSample;

/// Standardization parameters (population standard deviation)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZScore {
    /// Batch mean
    pub mean: f32,
    /// Divisor; 1.0 when the batch had no spread
    pub scale: f32,
}

impl Default for ZScore {
    fn default() -> Self {
        Self {
            mean: 0.0,
            scale: 1.0,
        }
    }
}

impl ZScore {
    /// Fit on a sequence of values
    pub fn fit(values: impl Iterator<Item = f32> + Clone) -> Self {
        let (count, sum) = values
            .clone()
            .fold((0usize, 0f64), |(n, s), v| (n + 1, s + v as f64));
        if count == 0 {
            return Self::default();
        }

        let mean = sum / count as f64;
        let variance = values.map(|v| (v as f64 - mean).powi(2)).sum::<f64>() / count as f64;
        let std = variance.sqrt();

        Self {
            mean: mean as f32,
            scale: if std > 0.0 { std as f32 } else { 1.0 },
        }
    }

    /// `(value - mean) / scale`
    pub fn apply(&self, value: f32) -> f32 {
        (value - self.mean) / self.scale
    }
}

/// Min-max normalization parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMax {
    /// Batch minimum
    pub min: f32,
    /// `max - min`; 1.0 when the batch had no spread
    pub range: f32,
}

impl Default for MinMax {
    fn default() -> Self {
        Self { min: 0.0, range: 1.0 }
    }
}

impl MinMax {
    /// Fit on a sequence of values
    pub fn fit(values: impl Iterator<Item = f32>) -> Self {
        let (min, max) = values.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        if !min.is_finite() || !max.is_finite() {
            return Self::default();
        }

        let range = max - min;
        Self {
            min,
            range: if range > 0.0 { range } else { 1.0 },
        }
    }

    /// `(value - min) / range`
    pub fn apply(&self, value: f32) -> f32 {
        (value - self.min) / self.range
    }
}

/// Fitted parameters for all five features
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScalerParams {
    /// Temperature standardization
    pub temp: ZScore,
    /// Current standardization
    pub current: ZScore,
    /// Hour-fraction standardization
    pub hour: ZScore,
    /// Day-fraction standardization
    pub day: ZScore,
    /// Vibration magnitude normalization
    pub vibration: MinMax,
}

impl ScalerParams {
    /// Scale one sample
    pub fn transform(&self, sample: &SensorSample) -> FeatureVector {
        FeatureVector([
            self.temp.apply(sample.temp),
            self.current.apply(sample.current),
            self.hour.apply(sample.hour_frac()),
            self.day.apply(sample.day_frac()),
            self.vibration.apply(sample.vibration_magnitude()),
        ])
    }
}

/// Fits [`ScalerParams`] on a batch
pub struct FeatureScaler;

impl FeatureScaler {
    /// Fit every feature on `samples`; an empty batch gives identity scaling
    pub fn fit(samples: &[SensorSample]) -> ScalerParams {
        ScalerParams {
            temp: ZScore::fit(samples.iter().map(|s| s.temp)),
            current: ZScore::fit(samples.iter().map(|s| s.current)),
            hour: ZScore::fit(samples.iter().map(|s| s.hour_frac())),
            day: ZScore::fit(samples.iter().map(|s| s.day_frac())),
            vibration: MinMax::fit(samples.iter().map(|s| s.vibration_magnitude())),
        }
    }
}
