use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use healthguard_core::{
    time::from_epoch_millis, FeatureConfig, FeatureEngineer, ScalingSource, SensorSample, Window,
};
use healthguard_ml::{
    ClassifierConfig, ClassifierModel, ClusterConfig, Clusterer, SequenceClassifier,
};

const START_MS: i64 = 1_710_527_400_000;

fn windows(rows: usize) -> (Vec<Window>, healthguard_core::ScalerParams) {
    let samples: Vec<SensorSample> = (0..rows)
        .filter_map(|i| {
            let level = ((i / 9) % 3) as f32;
            from_epoch_millis(START_MS + i as i64 * 60_000).map(|ts| {
                SensorSample::new(ts, 20.0 + level * 5.0, 5.0 + level * 2.0, [0.01, 0.02, 0.05])
            })
        })
        .collect();
    let engineer = FeatureEngineer::new(FeatureConfig::default());
    let features = engineer.engineer(&samples, ScalingSource::FitBatch);
    (engineer.windows(&features.vectors), features.scaler)
}

fn trained(windows: &[Window], scaler: healthguard_core::ScalerParams) -> ClassifierModel {
    let labels: Vec<usize> = windows.iter().map(|w| (w.start / 9) % 3).collect();
    let config = ClassifierConfig::default().with_max_epochs(1);
    SequenceClassifier::new(config)
        .fit(windows, &labels, scaler)
        .expect("classifier trains")
}

/// Single-window latency at the default network size
fn bench_predict_single(c: &mut Criterion) {
    let (windows, scaler) = windows(60);
    let model = trained(&windows, scaler);
    let one = &windows[..1];

    c.bench_function("classifier_predict_single", |b| {
        b.iter(|| model.predict(black_box(one)));
    });
}

/// Batch prediction over growing inputs
fn bench_predict_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("classifier_predict_batch");
    let (train, scaler) = windows(60);
    let model = trained(&train, scaler);

    for rows in [50usize, 200, 1_000].iter() {
        let (batch, _) = windows(*rows);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &batch, |b, batch| {
            b.iter(|| model.predict_states(black_box(batch)));
        });
    }
    group.finish();
}

/// K-means fit with the full restart schedule
fn bench_cluster_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("cluster_fit");
    group.sample_size(10);

    for rows in [100usize, 500].iter() {
        let (batch, _) = windows(*rows);
        let clusterer = Clusterer::new(ClusterConfig::default());
        group.bench_with_input(BenchmarkId::from_parameter(rows), &batch, |b, batch| {
            b.iter(|| clusterer.fit(black_box(batch)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_predict_single, bench_predict_batch, bench_cluster_fit);
criterion_main!(benches);
