//! Model lifecycle: load a stored model or train and persist a new one
//!
//! ```text
//! load(key)
//!   ├─ Loaded(m)       → m                       (new data ignored)
//!   ├─ NotFound        → train → save → m        (Trained)
//!   └─ Corrupt(why)
//!        ├─ Fail       → Err(ArtifactLoad)
//!        └─ Retrain    → train → save → m        (Retrained { why })
//! ```
//!
//! A model never changes after it is returned. A failed save is fatal: the
//! caller never gets a model that is not also in the store.

use std::fmt;

use serde::{Deserialize, Serialize};

use healthguard_core::{ScalerParams, Window};

use crate::{
    classifier::{ClassifierModel, SequenceClassifier},
    cluster::{Clusterer, ClustererModel},
    errors::{MLError, MLResult},
    store::{LoadOutcome, ModelKey, ModelStore, StoredModel},
};

/// What to do with an artifact that exists but cannot be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CorruptPolicy {
    /// Surface the problem as an error
    #[default]
    Fail,
    /// Log a warning, train a replacement and overwrite the artifact
    Retrain,
}

/// Where a returned model came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// Read from the store
    Loaded,
    /// Nothing was stored; trained on the supplied data
    Trained,
    /// The stored artifact was corrupt and has been replaced
    Retrained {
        /// Why the stored artifact was rejected
        reason: String,
    },
}

impl ModelSource {
    /// True for models trained during this call
    pub fn is_fresh(&self) -> bool {
        !matches!(self, ModelSource::Loaded)
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Loaded => f.write_str("loaded"),
            ModelSource::Trained => f.write_str("trained"),
            ModelSource::Retrained { reason } => write!(f, "retrained ({})", reason),
        }
    }
}

/// A model with its provenance
#[derive(Debug, Clone)]
pub struct Fitted<M> {
    /// The model
    pub model: M,
    /// How it was obtained
    pub source: ModelSource,
}

/// A model type with a fixed slot in the store
pub trait Artifact: Sized + Clone {
    /// Store slot
    const KEY: ModelKey;

    /// Wrap for storage
    fn into_stored(self) -> StoredModel;

    /// Unwrap from storage
    fn from_stored(stored: StoredModel) -> MLResult<Self>;
}

impl Artifact for ClustererModel {
    const KEY: ModelKey = ModelKey::Clusterer;

    fn into_stored(self) -> StoredModel {
        StoredModel::Clusterer(self)
    }

    fn from_stored(stored: StoredModel) -> MLResult<Self> {
        stored.into_clusterer(Self::KEY)
    }
}

impl Artifact for ClassifierModel {
    const KEY: ModelKey = ModelKey::Classifier;

    fn into_stored(self) -> StoredModel {
        StoredModel::Classifier(self)
    }

    fn from_stored(stored: StoredModel) -> MLResult<Self> {
        stored.into_classifier(Self::KEY)
    }
}

/// Load `M` from `store`, or train it with `train` and persist the result
pub fn fit_or_load<M, F>(
    store: &dyn ModelStore,
    policy: CorruptPolicy,
    train: F,
) -> MLResult<Fitted<M>>
where
    M: Artifact,
    F: FnOnce() -> MLResult<M>,
{
    let key = M::KEY;
    let source = match store.load(key) {
        LoadOutcome::Loaded(stored) => match M::from_stored(stored) {
            Ok(model) => {
                log::info!("Loaded {} from store", key);
                return Ok(Fitted {
                    model,
                    source: ModelSource::Loaded,
                });
            }
            Err(e) => corrupt(key, policy, e.to_string())?,
        },
        LoadOutcome::NotFound => {
            log::info!("No stored {}; training", key);
            ModelSource::Trained
        }
        LoadOutcome::Corrupt(reason) => corrupt(key, policy, reason)?,
    };

    let model = train()?;
    store.save(key, &model.clone().into_stored())?;
    log::info!("Persisted {} ({})", key, source);
    Ok(Fitted { model, source })
}

/// Load `M` without any training fallback
pub fn load_existing<M: Artifact>(store: &dyn ModelStore) -> MLResult<M> {
    let key = M::KEY;
    match store.load(key) {
        LoadOutcome::Loaded(stored) => M::from_stored(stored),
        LoadOutcome::NotFound => Err(MLError::ArtifactLoad {
            key: key.to_string(),
            reason: "not found".into(),
        }),
        LoadOutcome::Corrupt(reason) => Err(MLError::ArtifactLoad {
            key: key.to_string(),
            reason,
        }),
    }
}

fn corrupt(key: ModelKey, policy: CorruptPolicy, reason: String) -> MLResult<ModelSource> {
    match policy {
        CorruptPolicy::Fail => Err(MLError::ArtifactLoad {
            key: key.to_string(),
            reason,
        }),
        CorruptPolicy::Retrain => {
            log::warn!("Stored {} is corrupt ({}); retraining", key, reason);
            Ok(ModelSource::Retrained { reason })
        }
    }
}

impl Clusterer {
    /// Stored clusterer, or one fitted on `windows`
    pub fn fit_or_load(
        &self,
        store: &dyn ModelStore,
        policy: CorruptPolicy,
        windows: &[Window],
    ) -> MLResult<Fitted<ClustererModel>> {
        fit_or_load(store, policy, || self.fit(windows))
    }
}

impl SequenceClassifier {
    /// Stored classifier, or one trained on `windows` and `labels`
    pub fn fit_or_load(
        &self,
        store: &dyn ModelStore,
        policy: CorruptPolicy,
        windows: &[Window],
        labels: &[usize],
        scaler: &ScalerParams,
    ) -> MLResult<Fitted<ClassifierModel>> {
        fit_or_load(store, policy, || self.fit(windows, labels, scaler.clone()))
    }
}
