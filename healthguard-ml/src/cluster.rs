//! Health-State Clusterer
//!
//! ## Overview
//!
//! Unsupervised k-means over flattened windows. Each window of `L` feature
//! vectors becomes one point in `L × 5` dimensions; the three clusters found
//! there are the latent health regimes used as pseudo-labels for the
//! sequence classifier.
//!
//! ## Algorithm
//!
//! ```text
//! for run in 0..n_init:
//!     centroids ← k-means++(points)
//!     repeat up to max_iter:
//!         assign each point to its nearest centroid (ties → lowest id)
//!         recompute centroids; an emptied cluster takes the point
//!             farthest from its own centroid
//!         stop when Σ‖Δcentroid‖² ≤ tol
//! keep the run with the lowest inertia (first run wins ties)
//! ```
//!
//! All randomness flows from one seeded generator, so a fixed seed and a
//! fixed input always give the same model.

use ndarray::{Array2, ArrayView1};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use healthguard_core::{
    constants::{
        FEATURE_DIM, HEALTH_STATE_COUNT, KMEANS_MAX_ITER, KMEANS_N_INIT, KMEANS_TOLERANCE,
        RANDOM_SEED,
    },
    Window,
};

use crate::{
    errors::{MLError, MLResult},
    state::{HealthState, SeverityMapping, SeverityOrder},
};

/// K-means settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Independent initializations
    pub n_init: usize,
    /// Lloyd iterations per initialization
    pub max_iter: usize,
    /// Convergence threshold on squared centroid movement
    pub tolerance: f32,
    /// Seed for k-means++ draws
    pub seed: u64,
    /// How cluster ids become health states
    pub severity_order: SeverityOrder,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            n_init: KMEANS_N_INIT,
            max_iter: KMEANS_MAX_ITER,
            tolerance: KMEANS_TOLERANCE,
            seed: RANDOM_SEED,
            severity_order: SeverityOrder::default(),
        }
    }
}

/// Fits [`ClustererModel`]s
#[derive(Debug, Clone, Default)]
pub struct Clusterer {
    config: ClusterConfig,
}

/// Result of one k-means run
struct Run {
    centroids: Array2<f32>,
    inertia: f64,
    iterations: usize,
}

impl Clusterer {
    /// Clusterer with explicit settings
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    /// Settings in use
    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Fit three clusters on `windows`
    pub fn fit(&self, windows: &[Window]) -> MLResult<ClustererModel> {
        let k = HEALTH_STATE_COUNT;
        if windows.len() < k {
            return Err(MLError::InsufficientData {
                required: k,
                available: windows.len(),
            });
        }

        let window_len = windows[0].len();
        let points = flatten_windows(windows, window_len)?;
        let mut rng = StdRng::seed_from_u64(self.config.seed);

        let mut best: Option<Run> = None;
        for run_idx in 0..self.config.n_init.max(1) {
            let run = self.run_once(&points, k, &mut rng);
            log::trace!(
                "k-means run {} inertia={:.4} iterations={}",
                run_idx,
                run.inertia,
                run.iterations
            );
            if best.as_ref().map_or(true, |b| run.inertia < b.inertia) {
                best = Some(run);
            }
        }
        let best = best.ok_or(MLError::InsufficientData {
            required: k,
            available: windows.len(),
        })?;

        let mut norms = [0f32; HEALTH_STATE_COUNT];
        for (norm, row) in norms.iter_mut().zip(best.centroids.rows()) {
            *norm = row.dot(&row).sqrt();
        }
        let mapping = SeverityMapping::for_order(self.config.severity_order, &norms);
        if !mapping.is_identity() {
            log::warn!(
                "Cluster ids reordered by centroid magnitude: {:?}",
                mapping.states()
            );
        }

        log::info!(
            "Clusterer fitted on {} windows: inertia={:.4} iterations={}",
            windows.len(),
            best.inertia,
            best.iterations
        );

        Ok(ClustererModel {
            centroids: best.centroids,
            window_len,
            mapping,
            inertia: best.inertia,
        })
    }

    fn run_once(&self, points: &Array2<f32>, k: usize, rng: &mut StdRng) -> Run {
        let mut centroids = seed_plus_plus(points, k, rng);
        let mut labels = vec![0usize; points.nrows()];
        let mut iterations = 0;

        for _ in 0..self.config.max_iter {
            iterations += 1;
            assign(points, &centroids, &mut labels);
            let updated = recompute(points, &centroids, &labels, k);

            let shift: f32 = centroids
                .iter()
                .zip(updated.iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            centroids = updated;
            if shift <= self.config.tolerance {
                break;
            }
        }

        let inertia = assign(points, &centroids, &mut labels);
        Run {
            centroids,
            inertia,
            iterations,
        }
    }
}

/// Fitted clusterer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClustererModel {
    /// `k × (window_len · FEATURE_DIM)` centroids
    centroids: Array2<f32>,
    /// Window length the model was fitted on
    window_len: usize,
    /// Cluster id → health state
    mapping: SeverityMapping,
    /// Sum of squared distances of the training points
    inertia: f64,
}

impl ClustererModel {
    /// Nearest-centroid cluster id per window
    pub fn predict(&self, windows: &[Window]) -> MLResult<Vec<usize>> {
        let points = flatten_windows(windows, self.window_len)?;
        let mut labels = vec![0usize; points.nrows()];
        assign(&points, &self.centroids, &mut labels);
        Ok(labels)
    }

    /// Health state per window
    pub fn health_states(&self, windows: &[Window]) -> MLResult<Vec<HealthState>> {
        Ok(self
            .predict(windows)?
            .into_iter()
            .map(|c| self.mapping.state(c))
            .collect())
    }

    /// Health-state ids per window, used as classifier targets
    pub fn pseudo_labels(&self, windows: &[Window]) -> MLResult<Vec<usize>> {
        Ok(self
            .health_states(windows)?
            .into_iter()
            .map(HealthState::id)
            .collect())
    }

    /// Fitted centroids, one row per cluster
    pub fn centroids(&self) -> &Array2<f32> {
        &self.centroids
    }

    /// Cluster-to-state mapping fixed at fit time
    pub fn mapping(&self) -> &SeverityMapping {
        &self.mapping
    }

    /// Window length the model expects
    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// Training inertia
    pub fn inertia(&self) -> f64 {
        self.inertia
    }
}

/// Stack flattened windows into an `n × (len · FEATURE_DIM)` matrix
fn flatten_windows(windows: &[Window], window_len: usize) -> MLResult<Array2<f32>> {
    let dim = window_len * FEATURE_DIM;
    let mut flat = Vec::with_capacity(windows.len() * dim);
    for window in windows {
        if window.len() != window_len {
            return Err(MLError::ShapeMismatch {
                expected: format!("windows of {} steps", window_len),
                actual: format!("window of {} steps at sample {}", window.len(), window.start),
            });
        }
        flat.extend(window.flatten());
    }

    Array2::from_shape_vec((windows.len(), dim), flat).map_err(|e| MLError::ShapeMismatch {
        expected: format!("{} × {}", windows.len(), dim),
        actual: e.to_string(),
    })
}

fn squared_distance(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Index and squared distance of the nearest centroid; ties go to the lowest id
fn nearest(point: ArrayView1<'_, f32>, centroids: &Array2<f32>) -> (usize, f32) {
    let mut best = (0, f32::INFINITY);
    for (j, centroid) in centroids.rows().into_iter().enumerate() {
        let d = squared_distance(point, centroid);
        if d < best.1 {
            best = (j, d);
        }
    }
    best
}

/// Label every point; returns the inertia
fn assign(points: &Array2<f32>, centroids: &Array2<f32>, labels: &mut [usize]) -> f64 {
    let mut inertia = 0f64;
    for (label, point) in labels.iter_mut().zip(points.rows()) {
        let (j, d) = nearest(point, centroids);
        *label = j;
        inertia += d as f64;
    }
    inertia
}

fn recompute(
    points: &Array2<f32>,
    centroids: &Array2<f32>,
    labels: &[usize],
    k: usize,
) -> Array2<f32> {
    let mut sums = Array2::<f32>::zeros((k, points.ncols()));
    let mut counts = vec![0usize; k];
    for (point, &label) in points.rows().into_iter().zip(labels) {
        let mut row = sums.row_mut(label);
        row += &point;
        counts[label] += 1;
    }

    let mut taken = Vec::new();
    for j in 0..k {
        if counts[j] > 0 {
            let mut row = sums.row_mut(j);
            row /= counts[j] as f32;
            continue;
        }

        // Empty cluster: move it onto the worst-fitted point
        let mut far = (0usize, f32::NEG_INFINITY);
        for (i, point) in points.rows().into_iter().enumerate() {
            if taken.contains(&i) {
                continue;
            }
            let d = squared_distance(point, centroids.row(labels[i]));
            if d > far.1 {
                far = (i, d);
            }
        }
        taken.push(far.0);
        sums.row_mut(j).assign(&points.row(far.0));
        log::debug!("Reseeded empty cluster {} with point {}", j, far.0);
    }
    sums
}

/// k-means++ seeding
fn seed_plus_plus(points: &Array2<f32>, k: usize, rng: &mut StdRng) -> Array2<f32> {
    let n = points.nrows();
    let mut centroids = Array2::<f32>::zeros((k, points.ncols()));
    let first = rng.gen_range(0..n);
    centroids.row_mut(0).assign(&points.row(first));

    let mut closest: Vec<f64> = points
        .rows()
        .into_iter()
        .map(|p| squared_distance(p, centroids.row(0)) as f64)
        .collect();

    for c in 1..k {
        let total: f64 = closest.iter().sum();
        let pick = if total > 0.0 {
            let target = rng.gen::<f64>() * total;
            let mut acc = 0.0;
            let mut chosen = n - 1;
            for (i, &d) in closest.iter().enumerate() {
                acc += d;
                if acc > target {
                    chosen = i;
                    break;
                }
            }
            chosen
        } else {
            // Every point coincides with a centroid already
            rng.gen_range(0..n)
        };

        centroids.row_mut(c).assign(&points.row(pick));
        for (d, p) in closest.iter_mut().zip(points.rows()) {
            let candidate = squared_distance(p, centroids.row(c)) as f64;
            if candidate < *d {
                *d = candidate;
            }
        }
    }
    centroids
}

#[cfg(test)]
mod tests {
    use super::*;
    use healthguard_core::FeatureVector;

    fn window(start: usize, level: f32) -> Window {
        Window {
            start,
            vectors: vec![FeatureVector([level; FEATURE_DIM]); 2],
        }
    }

    /// Three tight groups around 0, 3 and 10
    fn grouped() -> Vec<Window> {
        let mut windows = Vec::new();
        for (g, level) in [0.0f32, 3.0, 10.0].iter().enumerate() {
            for i in 0..4 {
                windows.push(window(g * 4 + i, level + i as f32 * 0.01));
            }
        }
        windows
    }

    #[test]
    fn too_few_windows_is_insufficient() {
        let err = Clusterer::default().fit(&grouped()[..2]).unwrap_err();
        assert!(matches!(
            err,
            MLError::InsufficientData {
                required: 3,
                available: 2
            }
        ));
    }

    #[test]
    fn separates_obvious_groups() {
        let windows = grouped();
        let model = Clusterer::default().fit(&windows).unwrap();
        let labels = model.predict(&windows).unwrap();

        for group in labels.chunks(4) {
            assert!(group.iter().all(|&l| l == group[0]));
        }
        assert_ne!(labels[0], labels[4]);
        assert_ne!(labels[4], labels[8]);
        assert_ne!(labels[0], labels[8]);
    }

    #[test]
    fn magnitude_order_maps_far_group_to_alert() {
        let windows = grouped();
        let model = Clusterer::default().fit(&windows).unwrap();
        let states = model.health_states(&windows).unwrap();

        assert_eq!(states[0], HealthState::Normal);
        assert_eq!(states[4], HealthState::Moderate);
        assert_eq!(states[8], HealthState::Alert);
        assert_eq!(model.pseudo_labels(&windows).unwrap()[8], 2);
    }

    #[test]
    fn fit_is_deterministic_for_fixed_seed() {
        let windows = grouped();
        let a = Clusterer::default().fit(&windows).unwrap();
        let b = Clusterer::default().fit(&windows).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn identical_points_still_fit() {
        let windows: Vec<Window> = (0..5).map(|i| window(i, 1.0)).collect();
        let model = Clusterer::default().fit(&windows).unwrap();
        assert_eq!(model.predict(&windows).unwrap().len(), 5);
        assert!(model.inertia() < 1e-6);
    }

    #[test]
    fn wrong_window_length_is_rejected() {
        let model = Clusterer::default().fit(&grouped()).unwrap();
        let long = Window {
            start: 0,
            vectors: vec![FeatureVector::default(); 3],
        };
        assert!(matches!(
            model.predict(&[long]),
            Err(MLError::ShapeMismatch { .. })
        ));
    }
}
