//! Model persistence across pipeline instances and corrupt artifact handling

mod common;

use std::fs;

use healthguard_core::{CoreError, RawTable};
use healthguard_ml::{
    CorruptPolicy, FileModelStore, HealthPipeline, MLError, ModelKey, ModelSource, PipelineError,
};
use tempfile::TempDir;

use common::{quick_config, Row, TelemetryBuilder};

#[test]
fn reloaded_models_predict_identically() {
    let dir = TempDir::new().unwrap();
    let table = TelemetryBuilder::new()
        .regimes(40)
        .push(Row::spike(), 2)
        .build();

    let first = HealthPipeline::new(quick_config(), FileModelStore::new(dir.path()));
    let trained = first.train(&table).unwrap();
    let before = first.infer(&table, &trained.models).unwrap();

    // A fresh process only sees the directory
    let second = HealthPipeline::new(quick_config(), FileModelStore::new(dir.path()));
    let loaded = second.load_models().unwrap();
    let after = second.infer(&table, &loaded).unwrap();

    assert_eq!(*loaded.clusterer, *trained.models.clusterer);
    assert_eq!(*loaded.classifier, *trained.models.classifier);
    assert_eq!(before, after);

    let store = second.store();
    assert!(store.artifact_path(ModelKey::Classifier).exists());
    assert!(store.checksum_path(ModelKey::Classifier).exists());
}

#[test]
fn corrupt_classifier_fails_by_default() {
    let dir = TempDir::new().unwrap();
    let table = TelemetryBuilder::new().regimes(30).build();
    let pipeline = HealthPipeline::new(quick_config(), FileModelStore::new(dir.path()));
    pipeline.train(&table).unwrap();

    let path = pipeline.store().artifact_path(ModelKey::Classifier);
    fs::write(&path, b"{\"format_version\":1,\"kind\":").unwrap();

    let err = pipeline.load_models().unwrap_err();
    assert!(matches!(
        err,
        PipelineError::ModelUnavailable {
            key: ModelKey::Classifier,
            ..
        }
    ));

    let err = pipeline.train(&table).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::ML(MLError::ArtifactLoad { ref key, .. }) if key == "classifier"
    ));
}

#[test]
fn corrupt_classifier_is_retrained_when_allowed() {
    let dir = TempDir::new().unwrap();
    let table = TelemetryBuilder::new().regimes(30).build();
    let config = quick_config().with_corrupt_policy(CorruptPolicy::Retrain);
    let pipeline = HealthPipeline::new(config, FileModelStore::new(dir.path()));
    let original = pipeline.train(&table).unwrap();

    let sidecar = pipeline.store().checksum_path(ModelKey::Classifier);
    fs::write(&sidecar, "0".repeat(64)).unwrap();

    let outcome = pipeline.train(&table).unwrap();
    assert_eq!(outcome.clusterer_source, ModelSource::Loaded);
    match &outcome.classifier_source {
        ModelSource::Retrained { reason } => assert!(reason.contains("checksum")),
        other => panic!("expected a retrain, got {}", other),
    }
    // Same data and seed, so the replacement matches the original
    assert_eq!(outcome.models.classifier, original.models.classifier);

    // The replacement is readable again
    assert!(pipeline.load_models().is_ok());
}

#[test]
fn missing_columns_are_named() {
    let mut table = RawTable::new(
        ["timestamp", "temp", "ay"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    );
    table.push_row(vec!["1710527400000", "20.0", "0.0"]);

    let dir = TempDir::new().unwrap();
    let pipeline = HealthPipeline::new(quick_config(), FileModelStore::new(dir.path()));
    let err = pipeline.train(&table).unwrap_err();

    match err {
        PipelineError::Core(CoreError::Schema { missing }) => {
            assert_eq!(missing, vec!["current", "ax", "az"]);
        }
        other => panic!("expected a schema error, got {}", other),
    }
    assert!(!pipeline.store().dir().join("clusterer.json").exists());
}
