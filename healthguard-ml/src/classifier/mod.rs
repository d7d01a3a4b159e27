//! Sequence Classifier
//!
//! ## Overview
//!
//! A stacked LSTM that learns to reproduce the clusterer's pseudo-labels from
//! the raw window sequence. Where k-means sees a window as one flat point,
//! the recurrent layers see it in time order, so drifts and spikes late in a
//! window can weigh differently from the same values early on.
//!
//! ## Artifact
//!
//! A [`ClassifierModel`] carries everything inference needs:
//!
//! | Field             | Purpose                                          |
//! |-------------------|--------------------------------------------------|
//! | `network`         | LSTM / dense weights                             |
//! | `scaler`          | Feature scaling fitted on the training batch     |
//! | `sequence_length` | Window length the network was trained on         |
//! | `summary`         | Epoch history, best epoch, final learning rate   |
//!
//! Prediction never uses dropout and never touches a random generator, so the
//! same model and the same windows always give the same probabilities.

mod dense;
mod lstm;
mod network;
mod optimizer;
mod training;

use ndarray::{Array1, Array2};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use healthguard_core::{
    constants::{
        ADAM_BETA1, ADAM_BETA2, ADAM_EPSILON, BATCH_SIZE, DENSE_UNITS, DROPOUT_RATE,
        EARLY_STOPPING_PATIENCE, FEATURE_DIM, HEALTH_STATE_COUNT, L2_PENALTY, LEARNING_RATE,
        LR_PLATEAU_FACTOR, LR_PLATEAU_PATIENCE, LSTM_UNITS_FIRST, LSTM_UNITS_SECOND, MAX_EPOCHS,
        MIN_LEARNING_RATE, RANDOM_SEED, VALIDATION_SPLIT,
    },
    ScalerParams, Window,
};

use crate::{
    errors::{MLError, MLResult},
    state::HealthState,
};

pub use network::Network;
pub use training::{EpochStats, MonitoredLoss, TrainingSummary};

use training::Example;

/// Network shape and training schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Units of the sequence-returning LSTM
    pub lstm_units_first: usize,
    /// Units of the last-state LSTM
    pub lstm_units_second: usize,
    /// Units of the ReLU dense layer
    pub dense_units: usize,
    /// Dropout after each LSTM
    pub dropout: f32,
    /// L2 penalty on every kernel
    pub l2: f32,
    /// Initial learning rate
    pub learning_rate: f32,
    /// Adam β1
    pub adam_beta1: f32,
    /// Adam β2
    pub adam_beta2: f32,
    /// Adam ε
    pub adam_epsilon: f32,
    /// Windows per gradient step
    pub batch_size: usize,
    /// Epoch limit
    pub max_epochs: usize,
    /// Held-out share
    pub validation_split: f32,
    /// Epochs without improvement before stopping
    pub early_stopping_patience: usize,
    /// Epochs without improvement before reducing the learning rate
    pub lr_plateau_patience: usize,
    /// Learning-rate multiplier on a plateau
    pub lr_plateau_factor: f32,
    /// Learning-rate floor
    pub min_learning_rate: f32,
    /// Seed for initialization, shuffling and dropout
    pub seed: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            lstm_units_first: LSTM_UNITS_FIRST,
            lstm_units_second: LSTM_UNITS_SECOND,
            dense_units: DENSE_UNITS,
            dropout: DROPOUT_RATE,
            l2: L2_PENALTY,
            learning_rate: LEARNING_RATE,
            adam_beta1: ADAM_BETA1,
            adam_beta2: ADAM_BETA2,
            adam_epsilon: ADAM_EPSILON,
            batch_size: BATCH_SIZE,
            max_epochs: MAX_EPOCHS,
            validation_split: VALIDATION_SPLIT,
            early_stopping_patience: EARLY_STOPPING_PATIENCE,
            lr_plateau_patience: LR_PLATEAU_PATIENCE,
            lr_plateau_factor: LR_PLATEAU_FACTOR,
            min_learning_rate: MIN_LEARNING_RATE,
            seed: RANDOM_SEED,
        }
    }
}

impl ClassifierConfig {
    /// Override the epoch limit
    pub fn with_max_epochs(mut self, max_epochs: usize) -> Self {
        self.max_epochs = max_epochs;
        self
    }

    /// Override all three layer widths
    pub fn with_units(mut self, first: usize, second: usize, dense: usize) -> Self {
        self.lstm_units_first = first;
        self.lstm_units_second = second;
        self.dense_units = dense;
        self
    }
}

/// Trains [`ClassifierModel`]s
#[derive(Debug, Clone, Default)]
pub struct SequenceClassifier {
    config: ClassifierConfig,
}

impl SequenceClassifier {
    /// Classifier with explicit settings
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Settings in use
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Fit on `windows` with one label in `0..3` per window.
    ///
    /// `scaler` is the scaling the windows were produced with; it is stored
    /// in the artifact so inference can reproduce it.
    pub fn fit(
        &self,
        windows: &[Window],
        labels: &[usize],
        scaler: ScalerParams,
    ) -> MLResult<ClassifierModel> {
        if windows.is_empty() {
            return Err(MLError::InsufficientData {
                required: 1,
                available: 0,
            });
        }
        if labels.len() != windows.len() {
            return Err(MLError::LabelMismatch {
                reason: format!("{} labels for {} windows", labels.len(), windows.len()),
            });
        }
        if let Some(bad) = labels.iter().find(|&&l| l >= HEALTH_STATE_COUNT) {
            return Err(MLError::LabelMismatch {
                reason: format!("label {} outside 0..{}", bad, HEALTH_STATE_COUNT),
            });
        }

        let sequence_length = windows[0].len();
        let examples = windows
            .iter()
            .zip(labels)
            .map(|(w, &label)| {
                check_length(w, sequence_length)?;
                Ok(Example {
                    steps: steps_of(w),
                    label,
                })
            })
            .collect::<MLResult<Vec<_>>>()?;

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut network = Network::new(FEATURE_DIM, &self.config, &mut rng);
        // Training draws from its own stream so the init is independent of it
        let mut train_config = self.config.clone();
        train_config.seed = rng.gen();
        let summary = training::train(&mut network, &examples, &train_config);

        Ok(ClassifierModel {
            network,
            scaler,
            sequence_length,
            summary,
        })
    }
}

/// Trained classifier plus the context it needs at inference time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierModel {
    network: Network,
    scaler: ScalerParams,
    sequence_length: usize,
    summary: TrainingSummary,
}

impl ClassifierModel {
    /// Class probabilities per window, `[Normal, Moderate, Alert]`
    pub fn predict(&self, windows: &[Window]) -> MLResult<Vec<[f32; HEALTH_STATE_COUNT]>> {
        windows
            .iter()
            .map(|w| {
                check_length(w, self.sequence_length)?;
                Ok(self.network.forward(&steps_of(w)))
            })
            .collect()
    }

    /// Arg-max class per window; ties go to the lowest class
    pub fn predict_classes(&self, windows: &[Window]) -> MLResult<Vec<usize>> {
        Ok(self.predict(windows)?.iter().map(argmax).collect())
    }

    /// Predicted health state per window
    pub fn predict_states(&self, windows: &[Window]) -> MLResult<Vec<HealthState>> {
        Ok(self
            .predict_classes(windows)?
            .into_iter()
            .filter_map(HealthState::from_id)
            .collect())
    }

    /// Scaling fitted on the training batch
    pub fn scaler(&self) -> &ScalerParams {
        &self.scaler
    }

    /// Window length the network expects
    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    /// How training went
    pub fn summary(&self) -> &TrainingSummary {
        &self.summary
    }

    /// Network weights
    pub fn network(&self) -> &Network {
        &self.network
    }
}

fn check_length(window: &Window, expected: usize) -> MLResult<()> {
    if window.len() == expected {
        return Ok(());
    }
    Err(MLError::ShapeMismatch {
        expected: format!("windows of {} steps", expected),
        actual: format!("window of {} steps at sample {}", window.len(), window.start),
    })
}

/// Window as one input row per time step
fn steps_of(window: &Window) -> Vec<Array1<f32>> {
    window
        .vectors
        .iter()
        .map(|v| Array1::from(v.0.to_vec()))
        .collect()
}

fn argmax(probs: &[f32; HEALTH_STATE_COUNT]) -> usize {
    let mut best = 0;
    for (i, &p) in probs.iter().enumerate().skip(1) {
        if p > probs[best] {
            best = i;
        }
    }
    best
}

/// Glorot (Xavier) uniform `rows × cols` matrix
pub(crate) fn glorot_uniform(rows: usize, cols: usize, rng: &mut StdRng) -> Array2<f32> {
    let limit = (6.0 / (rows + cols).max(1) as f32).sqrt();
    Array2::from_shape_fn((rows, cols), |_| rng.gen_range(-limit..=limit))
}

pub(crate) fn sigmoid(v: f32) -> f32 {
    1.0 / (1.0 + (-v).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use healthguard_core::FeatureVector;

    fn tiny() -> ClassifierConfig {
        ClassifierConfig::default()
            .with_units(6, 4, 4)
            .with_max_epochs(40)
    }

    fn window(start: usize, level: f32) -> Window {
        Window {
            start,
            vectors: vec![FeatureVector([level; FEATURE_DIM]); 3],
        }
    }

    fn separable() -> (Vec<Window>, Vec<usize>) {
        let mut windows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..12 {
            let label = i % 3;
            windows.push(window(i, label as f32 * 2.0 - 2.0));
            labels.push(label);
        }
        (windows, labels)
    }

    #[test]
    fn rejects_bad_labels() {
        let (windows, labels) = separable();
        let classifier = SequenceClassifier::new(tiny());

        let err = classifier
            .fit(&windows, &labels[..5], ScalerParams::default())
            .unwrap_err();
        assert!(matches!(err, MLError::LabelMismatch { .. }));

        let mut out_of_range = labels.clone();
        out_of_range[0] = 3;
        let err = classifier
            .fit(&windows, &out_of_range, ScalerParams::default())
            .unwrap_err();
        assert!(matches!(err, MLError::LabelMismatch { .. }));

        let err = classifier.fit(&[], &[], ScalerParams::default()).unwrap_err();
        assert!(matches!(err, MLError::InsufficientData { .. }));
    }

    #[test]
    fn learns_separable_levels() {
        let (windows, labels) = separable();
        let config = ClassifierConfig {
            dropout: 0.0,
            learning_rate: 1e-2,
            validation_split: 0.0,
            early_stopping_patience: 20,
            ..tiny().with_max_epochs(200)
        };
        let model = SequenceClassifier::new(config)
            .fit(&windows, &labels, ScalerParams::default())
            .unwrap();

        let probs = model.predict(&windows).unwrap();
        assert!(probs
            .iter()
            .all(|p| (p.iter().sum::<f32>() - 1.0).abs() < 1e-5));

        let predicted = model.predict_classes(&windows).unwrap();
        let correct = predicted.iter().zip(&labels).filter(|(p, l)| p == l).count();
        assert!(correct >= 10, "only {correct} of 12 correct");
        assert_eq!(model.summary().monitored, MonitoredLoss::Training);
    }

    #[test]
    fn training_and_prediction_are_deterministic() {
        let (windows, labels) = separable();
        let classifier = SequenceClassifier::new(tiny().with_max_epochs(3));
        let a = classifier.fit(&windows, &labels, ScalerParams::default()).unwrap();
        let b = classifier.fit(&windows, &labels, ScalerParams::default()).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.predict(&windows).unwrap(), a.predict(&windows).unwrap());
        assert_eq!(a.summary().val_windows, 3);
        assert_eq!(a.summary().train_windows, 9);
    }

    #[test]
    fn single_window_monitors_training_loss() {
        let (windows, labels) = separable();
        let model = SequenceClassifier::new(tiny().with_max_epochs(2))
            .fit(&windows[..1], &labels[..1], ScalerParams::default())
            .unwrap();
        assert_eq!(model.summary().monitored, MonitoredLoss::Training);
        assert_eq!(model.summary().val_windows, 0);
        assert_eq!(model.sequence_length(), 3);
    }

    #[test]
    fn wrong_length_window_is_rejected() {
        let (windows, labels) = separable();
        let model = SequenceClassifier::new(tiny().with_max_epochs(1))
            .fit(&windows, &labels, ScalerParams::default())
            .unwrap();
        let short = Window {
            start: 0,
            vectors: vec![FeatureVector::default(); 2],
        };
        assert!(matches!(
            model.predict(&[short]),
            Err(MLError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn argmax_ties_go_low() {
        assert_eq!(argmax(&[0.4, 0.4, 0.2]), 0);
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), 1);
        assert_eq!(argmax(&[0.1, 0.2, 0.7]), 2);
    }
}
