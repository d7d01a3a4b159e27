//! Property tests for sanitizing, scaling and windowing

mod common;

use healthguard_core::{
    build_windows, cleaner::sanitize_numeric, constants::FEATURE_DIM, FeatureConfig,
    FeatureEngineer, FeatureVector, ScalingSource,
};
use proptest::prelude::*;

proptest! {
    #[test]
    fn sanitize_is_idempotent(raw in ".{0,24}") {
        let once = sanitize_numeric(&raw);
        prop_assert_eq!(sanitize_numeric(&once), once.clone());
        prop_assert!(once
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | 'e' | 'E')));
    }

    #[test]
    fn window_count_is_n_minus_len(n in 0usize..60, len in 1usize..15) {
        let vectors: Vec<FeatureVector> =
            (0..n).map(|i| FeatureVector([i as f32; FEATURE_DIM])).collect();
        let windows = build_windows(&vectors, len);

        prop_assert_eq!(windows.len(), n.saturating_sub(len));
        for (i, window) in windows.iter().enumerate() {
            prop_assert_eq!(window.start, i);
            prop_assert_eq!(window.len(), len);
            prop_assert_eq!(window.vectors[0].0[0], i as f32);
        }
    }

    #[test]
    fn batch_scaling_centres_temperature(count in 2usize..80) {
        let samples = common::samples(count);
        let engineer = FeatureEngineer::new(FeatureConfig::default());
        let features = engineer.engineer(&samples, ScalingSource::FitBatch);

        let mean: f32 =
            features.vectors.iter().map(|v| v.0[0]).sum::<f32>() / count as f32;
        prop_assert!(mean.abs() < 1e-3);

        // Constant channels map to zero
        prop_assert!(features.vectors.iter().all(|v| v.0[1] == 0.0));
        prop_assert!(features.vectors.iter().all(|v| v.0[4] == 0.0));
    }
}
