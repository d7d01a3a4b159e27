//! Model persistence
//!
//! ## Overview
//!
//! Trained models live behind the [`ModelStore`] trait, keyed by
//! [`ModelKey`]. Loading distinguishes three outcomes so callers can tell
//! "never trained" apart from "trained but unreadable":
//!
//! | Outcome            | Meaning                                   |
//! |--------------------|-------------------------------------------|
//! | `NotFound`         | No artifact under the key                 |
//! | `Loaded(model)`    | Artifact present, verified and decoded    |
//! | `Corrupt(reason)`  | Artifact present but unusable             |
//!
//! ## On-Disk Format
//!
//! [`FileModelStore`] writes two files per key:
//!
//! ```text
//! <dir>/<key>.json     {"format_version": 1, "kind": "clusterer", "payload": {...}}
//! <dir>/<key>.sha256   hex SHA-256 of the .json bytes
//! ```
//!
//! Both are written to a temporary sibling and renamed into place. A missing
//! checksum, a checksum mismatch, an unparseable envelope, an unknown format
//! version or a kind that does not match the key all load as `Corrupt`.

use std::{
    collections::HashMap,
    fmt, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::RwLock,
};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    classifier::ClassifierModel,
    cluster::ClustererModel,
    errors::{MLError, MLResult},
};

/// Envelope version written by this crate
pub const FORMAT_VERSION: u32 = 1;

/// Artifact slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKey {
    /// The k-means health-state clusterer
    Clusterer,
    /// The LSTM sequence classifier
    Classifier,
}

impl ModelKey {
    /// Stable storage name
    pub fn as_str(self) -> &'static str {
        match self {
            ModelKey::Clusterer => "clusterer",
            ModelKey::Classifier => "classifier",
        }
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any model the store can hold
#[derive(Debug, Clone, PartialEq)]
pub enum StoredModel {
    /// Fitted clusterer
    Clusterer(ClustererModel),
    /// Trained classifier
    Classifier(ClassifierModel),
}

impl StoredModel {
    /// Kind tag written into the envelope
    pub fn kind(&self) -> &'static str {
        match self {
            StoredModel::Clusterer(_) => ModelKey::Clusterer.as_str(),
            StoredModel::Classifier(_) => ModelKey::Classifier.as_str(),
        }
    }

    /// Unwrap a clusterer, or report what was found instead
    pub fn into_clusterer(self, key: ModelKey) -> MLResult<ClustererModel> {
        match self {
            StoredModel::Clusterer(model) => Ok(model),
            other => Err(MLError::ArtifactKind {
                key: key.to_string(),
                expected: ModelKey::Clusterer.as_str(),
                actual: other.kind(),
            }),
        }
    }

    /// Unwrap a classifier, or report what was found instead
    pub fn into_classifier(self, key: ModelKey) -> MLResult<ClassifierModel> {
        match self {
            StoredModel::Classifier(model) => Ok(model),
            other => Err(MLError::ArtifactKind {
                key: key.to_string(),
                expected: ModelKey::Classifier.as_str(),
                actual: other.kind(),
            }),
        }
    }
}

/// Result of a load attempt
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Nothing stored under the key
    NotFound,
    /// Verified and decoded
    Loaded(StoredModel),
    /// Present but unusable
    Corrupt(String),
}

/// Keyed artifact storage.
///
/// Implementations do no locking across processes; one writer per key is the
/// caller's responsibility.
pub trait ModelStore: Send + Sync {
    /// Persist `model` under `key`, replacing any previous artifact
    fn save(&self, key: ModelKey, model: &StoredModel) -> MLResult<()>;

    /// Fetch the artifact under `key`
    fn load(&self, key: ModelKey) -> LoadOutcome;
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    format_version: u32,
    kind: String,
    payload: serde_json::Value,
}

/// Serialize a model into envelope bytes
pub fn encode(model: &StoredModel) -> MLResult<Vec<u8>> {
    let payload = match model {
        StoredModel::Clusterer(m) => serde_json::to_value(m)?,
        StoredModel::Classifier(m) => serde_json::to_value(m)?,
    };
    let envelope = Envelope {
        format_version: FORMAT_VERSION,
        kind: model.kind().to_string(),
        payload,
    };
    Ok(serde_json::to_vec(&envelope)?)
}

/// Decode envelope bytes stored under `key`
pub fn decode(key: ModelKey, bytes: &[u8]) -> Result<StoredModel, String> {
    let envelope: Envelope =
        serde_json::from_slice(bytes).map_err(|e| format!("unreadable envelope: {}", e))?;

    if envelope.format_version != FORMAT_VERSION {
        return Err(format!(
            "format version {} (expected {})",
            envelope.format_version, FORMAT_VERSION
        ));
    }
    if envelope.kind != key.as_str() {
        return Err(format!("kind `{}` stored under key `{}`", envelope.kind, key));
    }

    let model = match key {
        ModelKey::Clusterer => {
            serde_json::from_value(envelope.payload).map(StoredModel::Clusterer)
        }
        ModelKey::Classifier => {
            serde_json::from_value(envelope.payload).map(StoredModel::Classifier)
        }
    };
    model.map_err(|e| format!("invalid payload: {}", e))
}

/// Hex SHA-256 digest
pub fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// In-process store, for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryModelStore {
    artifacts: RwLock<HashMap<ModelKey, Vec<u8>>>,
}

impl MemoryModelStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw bytes under `key`, bypassing encoding
    pub fn put_raw(&self, key: ModelKey, bytes: Vec<u8>) {
        if let Ok(mut artifacts) = self.artifacts.write() {
            artifacts.insert(key, bytes);
        }
    }

    /// True when something is stored under `key`
    pub fn contains(&self, key: ModelKey) -> bool {
        self.artifacts
            .read()
            .map(|a| a.contains_key(&key))
            .unwrap_or(false)
    }
}

impl ModelStore for MemoryModelStore {
    fn save(&self, key: ModelKey, model: &StoredModel) -> MLResult<()> {
        let bytes = encode(model)?;
        let mut artifacts = self.artifacts.write().map_err(|_| MLError::ArtifactSave {
            key: key.to_string(),
            reason: "store lock poisoned".into(),
        })?;
        artifacts.insert(key, bytes);
        Ok(())
    }

    fn load(&self, key: ModelKey) -> LoadOutcome {
        let artifacts = match self.artifacts.read() {
            Ok(a) => a,
            Err(_) => return LoadOutcome::Corrupt("store lock poisoned".into()),
        };
        match artifacts.get(&key) {
            None => LoadOutcome::NotFound,
            Some(bytes) => match decode(key, bytes) {
                Ok(model) => LoadOutcome::Loaded(model),
                Err(reason) => LoadOutcome::Corrupt(reason),
            },
        }
    }
}

/// Directory-backed store with checksum sidecars
#[derive(Debug, Clone)]
pub struct FileModelStore {
    dir: PathBuf,
}

impl FileModelStore {
    /// Store rooted at `dir`; the directory is created on first save
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the artifact for `key`
    pub fn artifact_path(&self, key: ModelKey) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Path of the checksum sidecar for `key`
    pub fn checksum_path(&self, key: ModelKey) -> PathBuf {
        self.dir.join(format!("{}.sha256", key))
    }

    fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)
    }
}

impl ModelStore for FileModelStore {
    fn save(&self, key: ModelKey, model: &StoredModel) -> MLResult<()> {
        let bytes = encode(model)?;
        let save_err = |e: std::io::Error| MLError::ArtifactSave {
            key: key.to_string(),
            reason: e.to_string(),
        };

        fs::create_dir_all(&self.dir).map_err(save_err)?;
        Self::write_atomic(&self.artifact_path(key), &bytes).map_err(save_err)?;
        Self::write_atomic(&self.checksum_path(key), checksum(&bytes).as_bytes())
            .map_err(save_err)?;

        log::info!(
            "Saved {} artifact to {} ({} bytes)",
            key,
            self.artifact_path(key).display(),
            bytes.len()
        );
        Ok(())
    }

    fn load(&self, key: ModelKey) -> LoadOutcome {
        let path = self.artifact_path(key);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return LoadOutcome::NotFound,
            Err(e) => return LoadOutcome::Corrupt(format!("read {}: {}", path.display(), e)),
        };

        let expected = match fs::read_to_string(self.checksum_path(key)) {
            Ok(s) => s.trim().to_string(),
            Err(e) => return LoadOutcome::Corrupt(format!("checksum sidecar: {}", e)),
        };
        let actual = checksum(&bytes);
        if expected != actual {
            return LoadOutcome::Corrupt(format!(
                "checksum mismatch (expected {}, found {})",
                expected, actual
            ));
        }

        match decode(key, &bytes) {
            Ok(model) => {
                log::debug!("Loaded {} artifact from {}", key, path.display());
                LoadOutcome::Loaded(model)
            }
            Err(reason) => LoadOutcome::Corrupt(reason),
        }
    }
}
