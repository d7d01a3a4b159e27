//! Pipeline configuration
//!
//! Every field defaults to the calibrated constants, and the struct is
//! `#[serde(default)]` at every level, so a JSON file only needs the values
//! it changes:
//!
//! ```json
//! {
//!   "classifier": { "max_epochs": 20 },
//!   "report": { "require_full_trailing": true },
//!   "corrupt_policy": "Retrain"
//! }
//! ```

use serde::{Deserialize, Serialize};

use healthguard_core::{ColumnMapping, FeatureConfig};

use crate::{
    classifier::ClassifierConfig, cluster::ClusterConfig, lifecycle::CorruptPolicy,
    report::ReportConfig,
};

/// Where inference takes its feature scaling from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScalingMode {
    /// Parameters stored with the classifier (fitted on the training batch)
    #[default]
    Persisted,
    /// Refit on each inference batch
    Batch,
}

/// Full pipeline settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Input column names
    pub columns: ColumnMapping,
    /// Window geometry
    pub features: FeatureConfig,
    /// K-means settings
    pub cluster: ClusterConfig,
    /// Network and training schedule
    pub classifier: ClassifierConfig,
    /// Trailing window and alarm thresholds
    pub report: ReportConfig,
    /// Feature scaling at inference
    pub scaling: ScalingMode,
    /// Handling of unreadable stored models during training
    pub corrupt_policy: CorruptPolicy,
}

impl PipelineConfig {
    /// Parse a (possibly partial) JSON document
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Override the classifier settings
    pub fn with_classifier(mut self, classifier: ClassifierConfig) -> Self {
        self.classifier = classifier;
        self
    }

    /// Override the report settings
    pub fn with_report(mut self, report: ReportConfig) -> Self {
        self.report = report;
        self
    }

    /// Override the inference scaling mode
    pub fn with_scaling(mut self, scaling: ScalingMode) -> Self {
        self.scaling = scaling;
        self
    }

    /// Override the corrupt-artifact policy
    pub fn with_corrupt_policy(mut self, policy: CorruptPolicy) -> Self {
        self.corrupt_policy = policy;
        self
    }
}
