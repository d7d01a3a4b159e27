//! Health-State Models for Machine Telemetry
//!
//! ## Overview
//!
//! Two models turn feature windows from `healthguard-core` into a machine
//! health verdict:
//!
//! 1. **Clusterer** ([`cluster`]): k-means with three clusters over flattened
//!    windows. The clusters serve as labels; each cluster id is mapped to a
//!    [`HealthState`] by centroid magnitude.
//! 2. **Classifier** ([`classifier`]): a stacked LSTM trained on those
//!    pseudo-labels, which reads each window as a time series.
//!
//! The [`report`] engine then votes over the trailing predictions, checks raw
//! channel maxima against fixed alarm thresholds and, for an Alert vote,
//! names the feature most likely behind it.
//!
//! ## Model Lifecycle
//!
//! ```text
//!            ┌──────────── NotFound ──────────────┐
//!            │                                    ▼
//! store ─ load ── Loaded ──► use as-is        train ─► save ─► use
//!            │                                    ▲
//!            └── Corrupt ─► Fail (default) │ Retrain ┘
//! ```
//!
//! Models are immutable once trained or loaded and are shared through
//! [`std::sync::Arc`] for concurrent inference.
//!
//! ## Example
//!
//! ```no_run
//! use healthguard_core::{CsvSource, TableSource};
//! use healthguard_ml::{FileModelStore, HealthPipeline, PipelineConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let table = CsvSource::from_path("telemetry.csv").load_table()?;
//! let pipeline = HealthPipeline::new(PipelineConfig::default(), FileModelStore::new("models"));
//!
//! let trained = pipeline.train(&table)?;
//! println!("clusterer {}, classifier {}", trained.clusterer_source, trained.classifier_source);
//!
//! let report = pipeline.infer(&table, &trained.models)?;
//! print!("{}", report);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod classifier;
pub mod cluster;
pub mod config;
pub mod errors;
pub mod lifecycle;
pub mod pipeline;
pub mod report;
pub mod state;
pub mod store;

// Public API
pub use classifier::{
    ClassifierConfig, ClassifierModel, EpochStats, MonitoredLoss, SequenceClassifier,
    TrainingSummary,
};
pub use cluster::{ClusterConfig, Clusterer, ClustererModel};
pub use config::{PipelineConfig, ScalingMode};
pub use errors::{MLError, MLResult};
pub use lifecycle::{fit_or_load, load_existing, Artifact, CorruptPolicy, Fitted, ModelSource};
pub use pipeline::{HealthPipeline, LoadedModels, PipelineError, PipelineResult, TrainOutcome};
pub use report::{
    aggregate, Channel, ChannelStatus, FaultAttribution, HealthReport, Reading, ReportConfig,
    ReportEngine, ReportOutcome,
};
pub use state::{HealthState, SeverityMapping, SeverityOrder};
pub use store::{FileModelStore, LoadOutcome, MemoryModelStore, ModelKey, ModelStore, StoredModel};
