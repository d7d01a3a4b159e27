//! Sliding windows over feature vectors

use serde::{Deserialize, Serialize};

use super::FeatureVector;
use crate::constants::FEATURE_DIM;

/// Contiguous run of feature vectors, oldest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    /// Index of the first sample in the source table
    pub start: usize,
    /// The vectors, in time order
    pub vectors: Vec<FeatureVector>,
}

impl Window {
    /// Number of time steps
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// True for a zero-length window
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Row-major flattening: `len × FEATURE_DIM` values
    pub fn flatten(&self) -> Vec<f32> {
        self.vectors.iter().flat_map(|v| v.0).collect()
    }

    /// Per-feature mean across the time steps
    pub fn mean_vector(&self) -> FeatureVector {
        mean_of(self.vectors.iter())
    }
}

/// Per-feature mean over any number of vectors; zero vector when empty
pub(crate) fn mean_of<'a>(vectors: impl Iterator<Item = &'a FeatureVector>) -> FeatureVector {
    let mut sum = [0f64; FEATURE_DIM];
    let mut count = 0usize;
    for v in vectors {
        for (acc, &x) in sum.iter_mut().zip(v.0.iter()) {
            *acc += x as f64;
        }
        count += 1;
    }
    if count == 0 {
        return FeatureVector::default();
    }

    let mut mean = [0f32; FEATURE_DIM];
    for (m, s) in mean.iter_mut().zip(sum) {
        *m = (s / count as f64) as f32;
    }
    FeatureVector(mean)
}

/// Mean feature vector over every time step of every window
pub fn mean_over_windows(windows: &[Window]) -> FeatureVector {
    mean_of(windows.iter().flat_map(|w| w.vectors.iter()))
}

/// Build overlapping windows with stride 1.
///
/// Produces `max(0, N − len)` windows; window `i` covers vectors `i..i + len`.
/// A zero `len` yields no windows.
pub fn build_windows(vectors: &[FeatureVector], len: usize) -> Vec<Window> {
    if len == 0 {
        return Vec::new();
    }

    let count = vectors.len().saturating_sub(len);
    (0..count)
        .map(|start| Window {
            start,
            vectors: vectors[start..start + len].to_vec(),
        })
        .collect()
}
