//! Integration tests for the train → infer → report flow

mod common;

use std::thread;

use healthguard_ml::{
    Channel, HealthPipeline, MemoryModelStore, ModelSource, PipelineError, ReportOutcome,
    ScalingMode,
};

use common::{quick_config, Row, TelemetryBuilder};

#[test]
fn spike_trips_every_channel_alarm() {
    let table = TelemetryBuilder::new()
        .push(Row::calm(), 14)
        .push(Row::spike(), 1)
        .build();

    let pipeline = HealthPipeline::new(quick_config(), MemoryModelStore::new());
    let trained = pipeline.train(&table).unwrap();
    assert_eq!(trained.windows, 5);

    let outcome = pipeline.infer(&table, &trained.models).unwrap();
    let report = outcome.report().expect("report for 15 samples");

    assert!(report.channel(Channel::Temperature).alarm);
    assert!(report.channel(Channel::Current).alarm);
    assert!(report.channel(Channel::Vibration).alarm);
    assert_eq!(report.channel(Channel::Temperature).max, 35.0);
    assert_eq!(report.predictions_used, 5);
    assert_eq!(report.readings.len(), 10);
    assert_eq!(report.readings.last().map(|r| r.index), Some(14));
}

#[test]
fn current_exactly_at_threshold_alarms() {
    let at_limit = Row {
        current: 10.0,
        ..Row::calm()
    };
    let table = TelemetryBuilder::new()
        .push(Row::calm(), 14)
        .push(at_limit, 1)
        .build();

    let pipeline = HealthPipeline::new(quick_config(), MemoryModelStore::new());
    let trained = pipeline.train(&table).unwrap();
    let outcome = pipeline.infer(&table, &trained.models).unwrap();
    let report = outcome.report().unwrap();

    assert!(report.channel(Channel::Current).alarm);
    assert!(!report.channel(Channel::Temperature).alarm);
    assert!(!report.channel(Channel::Vibration).alarm);
}

#[test]
fn short_input_reports_insufficient_data() {
    let pipeline = HealthPipeline::new(quick_config(), MemoryModelStore::new());
    let trained = pipeline
        .train(&TelemetryBuilder::new().regimes(40).build())
        .unwrap();

    let short = TelemetryBuilder::new().push(Row::calm(), 10).build();
    let outcome = pipeline.infer(&short, &trained.models).unwrap();
    assert_eq!(
        outcome,
        ReportOutcome::InsufficientData {
            samples: 10,
            available: 0,
            required: 1
        }
    );
    assert!(outcome.to_string().contains("Insufficient data"));

    let err = pipeline.train(&short).unwrap_err();
    assert!(matches!(err, PipelineError::InsufficientData { .. }));
}

#[test]
fn training_is_reproducible() {
    let table = TelemetryBuilder::new().regimes(50).build();

    let a = HealthPipeline::new(quick_config(), MemoryModelStore::new())
        .train(&table)
        .unwrap();
    let b = HealthPipeline::new(quick_config(), MemoryModelStore::new())
        .train(&table)
        .unwrap();

    assert_eq!(a.models.clusterer, b.models.clusterer);
    assert_eq!(a.models.classifier, b.models.classifier);
    assert_eq!(a.label_counts, b.label_counts);
}

#[test]
fn second_training_run_loads_instead_of_retraining() {
    let pipeline = HealthPipeline::new(quick_config(), MemoryModelStore::new());
    let first = pipeline
        .train(&TelemetryBuilder::new().regimes(40).build())
        .unwrap();
    let second = pipeline
        .train(&TelemetryBuilder::new().regimes(80).build())
        .unwrap();

    assert_eq!(first.clusterer_source, ModelSource::Trained);
    assert_eq!(second.clusterer_source, ModelSource::Loaded);
    assert_eq!(second.classifier_source, ModelSource::Loaded);
    assert_eq!(first.models.classifier, second.models.classifier);
}

#[test]
fn concurrent_inference_agrees() {
    let table = TelemetryBuilder::new().regimes(60).build();
    let pipeline = HealthPipeline::new(quick_config(), MemoryModelStore::new());
    pipeline.train(&table).unwrap();
    let models = pipeline.load_models().unwrap();

    let baseline = pipeline.infer(&table, &models).unwrap();
    let outcomes: Vec<ReportOutcome> = thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| pipeline.infer(&table, &models).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(outcomes.iter().all(|o| *o == baseline));
}

#[test]
fn batch_scaling_is_selectable() {
    let table = TelemetryBuilder::new().regimes(45).build();
    let pipeline = HealthPipeline::new(
        quick_config().with_scaling(ScalingMode::Batch),
        MemoryModelStore::new(),
    );
    let trained = pipeline.train(&table).unwrap();

    let outcome = pipeline.infer(&table, &trained.models).unwrap();
    let report = outcome.report().unwrap();
    assert_eq!(report.predictions_used, 10);
}
