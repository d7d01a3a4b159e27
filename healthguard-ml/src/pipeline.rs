//! End-to-end health pipeline
//!
//! ## Training
//!
//! ```text
//! RawTable ─ clean ─ engineer(fit batch) ─ windows
//!                                            ├─ clusterer: fit or load
//!                                            │     └─ pseudo-labels
//!                                            └─ classifier: fit or load (windows, labels, scaler)
//! ```
//!
//! ## Inference
//!
//! ```text
//! RawTable ─ clean ─ engineer(stored or batch scaling) ─ windows
//!              │                                           └─ classifier.predict
//!              └──────────────── raw samples ───────────────────┴─ ReportEngine
//! ```
//!
//! Inference is strict: a missing or corrupt model is an error, never a cue
//! to train. [`HealthPipeline::infer`] only reads `&self` and the immutable
//! [`LoadedModels`], so one pipeline can serve many threads.

use std::sync::Arc;

use thiserror::Error;

use healthguard_core::{
    constants::HEALTH_STATE_COUNT, Cleaner, CleaningStats, CoreError, FeatureConfig,
    FeatureEngineer, RawTable, ScalingSource,
};

use crate::{
    classifier::{ClassifierModel, SequenceClassifier},
    cluster::{Clusterer, ClustererModel},
    config::{PipelineConfig, ScalingMode},
    errors::MLError,
    lifecycle::{load_existing, Artifact, ModelSource},
    report::{ReportEngine, ReportOutcome},
    state::HealthState,
    store::{ModelKey, ModelStore},
};

/// Pipeline failures
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Input loading or cleaning failed
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Training, storage or reporting failed
    #[error(transparent)]
    ML(#[from] MLError),

    /// Too few cleaned samples to build a single window
    #[error("Insufficient data: {available} cleaned samples, need at least {required}")]
    InsufficientData {
        /// Cleaned samples
        available: usize,
        /// Minimum for one window
        required: usize,
    },

    /// A model needed for inference could not be loaded
    #[error("Model `{key}` unavailable: {reason}")]
    ModelUnavailable {
        /// Store key
        key: ModelKey,
        /// Why loading failed
        reason: String,
    },
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Both models, shareable across threads
#[derive(Debug, Clone)]
pub struct LoadedModels {
    /// Health-state clusterer
    pub clusterer: Arc<ClustererModel>,
    /// Sequence classifier
    pub classifier: Arc<ClassifierModel>,
}

/// What a training run did
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    /// The models now in the store
    pub models: LoadedModels,
    /// Provenance of the clusterer
    pub clusterer_source: ModelSource,
    /// Provenance of the classifier
    pub classifier_source: ModelSource,
    /// Cleaning counters
    pub cleaning: CleaningStats,
    /// Windows built from the input
    pub windows: usize,
    /// Pseudo-label count per health state
    pub label_counts: [usize; HEALTH_STATE_COUNT],
}

/// Cleaner, feature engineer, models and report engine wired to a store
pub struct HealthPipeline<S: ModelStore> {
    config: PipelineConfig,
    store: S,
}

impl<S: ModelStore> HealthPipeline<S> {
    /// Pipeline over `store`
    pub fn new(config: PipelineConfig, store: S) -> Self {
        Self { config, store }
    }

    /// Settings in use
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Backing model store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Clean, window and fit (or load) both models
    pub fn train(&self, table: &RawTable) -> PipelineResult<TrainOutcome> {
        let cleaned = Cleaner::new(self.config.columns.clone()).clean(table)?;
        let engineer = FeatureEngineer::new(self.config.features);
        if cleaned.len() < engineer.min_samples() {
            return Err(PipelineError::InsufficientData {
                available: cleaned.len(),
                required: engineer.min_samples(),
            });
        }

        let features = engineer.engineer(&cleaned.samples, ScalingSource::FitBatch);
        let windows = engineer.windows(&features.vectors);
        log::info!(
            "Training on {} samples → {} windows of {}",
            cleaned.len(),
            windows.len(),
            engineer.config().sequence_length
        );

        let clusterer = Clusterer::new(self.config.cluster.clone()).fit_or_load(
            &self.store,
            self.config.corrupt_policy,
            &windows,
        )?;
        let labels = clusterer.model.pseudo_labels(&windows)?;

        let mut label_counts = [0usize; HEALTH_STATE_COUNT];
        for &label in &labels {
            label_counts[label] += 1;
        }
        log::info!("Pseudo-label distribution: {:?}", label_counts);

        let classifier = SequenceClassifier::new(self.config.classifier.clone()).fit_or_load(
            &self.store,
            self.config.corrupt_policy,
            &windows,
            &labels,
            &features.scaler,
        )?;

        log::info!(
            "Clusterer {}, classifier {}",
            clusterer.source,
            classifier.source
        );
        Ok(TrainOutcome {
            models: LoadedModels {
                clusterer: Arc::new(clusterer.model),
                classifier: Arc::new(classifier.model),
            },
            clusterer_source: clusterer.source,
            classifier_source: classifier.source,
            cleaning: cleaned.stats,
            windows: windows.len(),
            label_counts,
        })
    }

    /// Load both models for inference; nothing is trained
    pub fn load_models(&self) -> PipelineResult<LoadedModels> {
        Ok(LoadedModels {
            clusterer: Arc::new(self.load_strict::<ClustererModel>()?),
            classifier: Arc::new(self.load_strict::<ClassifierModel>()?),
        })
    }

    fn load_strict<M: Artifact>(&self) -> PipelineResult<M> {
        load_existing::<M>(&self.store).map_err(|e| PipelineError::ModelUnavailable {
            key: M::KEY,
            reason: e.to_string(),
        })
    }

    /// Report on the most recent data in `table`
    pub fn infer(&self, table: &RawTable, models: &LoadedModels) -> PipelineResult<ReportOutcome> {
        let cleaned = Cleaner::new(self.config.columns.clone()).clean(table)?;

        let sequence_length = models.classifier.sequence_length();
        if sequence_length != self.config.features.sequence_length {
            log::debug!(
                "Using the classifier's window length {} (configured {})",
                sequence_length,
                self.config.features.sequence_length
            );
        }
        let engineer = FeatureEngineer::new(FeatureConfig { sequence_length });

        let scaling = match self.config.scaling {
            ScalingMode::Persisted => ScalingSource::Fixed(models.classifier.scaler()),
            ScalingMode::Batch => ScalingSource::FitBatch,
        };
        let features = engineer.engineer(&cleaned.samples, scaling);
        let windows = engineer.windows(&features.vectors);

        let states: Vec<HealthState> = models.classifier.predict_states(&windows)?;
        let outcome =
            ReportEngine::new(self.config.report.clone()).build(&cleaned, &windows, &states)?;
        Ok(outcome)
    }
}
