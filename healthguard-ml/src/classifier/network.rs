//! Stacked recurrent network
//!
//! ```text
//! window (L × 5)
//!   └─ LSTM(first, every step) ─ dropout
//!        └─ LSTM(second, last step) ─ dropout
//!             └─ Dense(relu)
//!                  └─ Dense(3) ─ softmax
//! ```
//!
//! Dropout is inverted (survivors scaled by `1 / (1 − rate)`) and only
//! active in [`Network::accumulate`]; [`Network::forward`] is deterministic.

use ndarray::{Array1, ArrayViewD, ArrayViewMutD};
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};

use healthguard_core::constants::HEALTH_STATE_COUNT;

use super::{dense::Dense, lstm::Lstm, ClassifierConfig};

/// Smallest probability fed to the log in the loss
const PROB_FLOOR: f32 = 1e-7;

/// Network weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub(crate) first: Lstm,
    pub(crate) second: Lstm,
    pub(crate) hidden: Dense,
    pub(crate) output: Dense,
}

impl Network {
    /// Freshly initialized network for `input_dim` features per step
    pub fn new(input_dim: usize, config: &ClassifierConfig, rng: &mut StdRng) -> Self {
        let first = Lstm::new(input_dim, config.lstm_units_first, rng);
        let second = Lstm::new(config.lstm_units_first, config.lstm_units_second, rng);
        let hidden = Dense::new(config.lstm_units_second, config.dense_units, rng);
        let output = Dense::new(config.dense_units, HEALTH_STATE_COUNT, rng);
        Self {
            first,
            second,
            hidden,
            output,
        }
    }

    /// Same shapes, every parameter zero
    pub fn zeros_like(&self) -> Self {
        Self {
            first: self.first.zeros_like(),
            second: self.second.zeros_like(),
            hidden: self.hidden.zeros_like(),
            output: self.output.zeros_like(),
        }
    }

    /// Features per time step
    pub fn input_dim(&self) -> usize {
        self.first.input()
    }

    /// Class probabilities for one sequence
    pub fn forward(&self, xs: &[Array1<f32>]) -> [f32; HEALTH_STATE_COUNT] {
        let seq = self.first.forward(xs);
        let seq = self.second.forward(&seq);
        let last = seq
            .last()
            .cloned()
            .unwrap_or_else(|| Array1::zeros(self.second.hidden()));

        let activated = self.hidden.forward(&last).mapv(relu);
        softmax(&self.output.forward(&activated))
    }

    /// One training example: adds parameter gradients into `grads` and
    /// returns the cross-entropy loss (regularization excluded).
    pub(crate) fn accumulate(
        &self,
        xs: &[Array1<f32>],
        label: usize,
        dropout: f32,
        rng: &mut StdRng,
        grads: &mut Network,
    ) -> f32 {
        let (seq1, caches1) = self.first.forward_train(xs);
        let masks1: Vec<Array1<f32>> = seq1
            .iter()
            .map(|h| dropout_mask(h.len(), dropout, rng))
            .collect();
        let dropped1: Vec<Array1<f32>> = seq1.iter().zip(&masks1).map(|(h, m)| h * m).collect();

        let (seq2, caches2) = self.second.forward_train(&dropped1);
        let last = match seq2.last() {
            Some(h) => h,
            None => return 0.0,
        };
        let mask2 = dropout_mask(last.len(), dropout, rng);
        let dropped2 = last * &mask2;

        let pre = self.hidden.forward(&dropped2);
        let activated = pre.mapv(relu);
        let probs = softmax(&self.output.forward(&activated));
        let loss = -probs[label].max(PROB_FLOOR).ln();

        // softmax + cross-entropy: ∂L/∂logits = p − onehot
        let mut d_logits = Array1::from(probs.to_vec());
        d_logits[label] -= 1.0;

        let d_act = self
            .output
            .backward(&activated, &d_logits, &mut grads.output);
        let d_pre = d_act * &pre.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
        let d_last = self.hidden.backward(&dropped2, &d_pre, &mut grads.hidden) * &mask2;

        let mut dhs2 = vec![Array1::<f32>::zeros(self.second.hidden()); seq2.len()];
        if let Some(tail) = dhs2.last_mut() {
            *tail = d_last;
        }
        let dxs2 = self.second.backward(&caches2, &dhs2, &mut grads.second);

        let dhs1: Vec<Array1<f32>> = dxs2.into_iter().zip(&masks1).map(|(d, m)| d * m).collect();
        self.first.backward(&caches1, &dhs1, &mut grads.first);

        loss
    }

    /// `l2 · Σ w²` over every kernel
    pub fn l2_penalty(&self, l2: f32) -> f32 {
        l2 * (self.first.kernel_sq_norm()
            + self.second.kernel_sq_norm()
            + self.hidden.kernel_sq_norm()
            + self.output.kernel_sq_norm())
    }

    pub(crate) fn add_weight_decay(&self, grads: &mut Network, l2: f32) {
        self.first.add_weight_decay(&mut grads.first, l2);
        self.second.add_weight_decay(&mut grads.second, l2);
        self.hidden.add_weight_decay(&mut grads.hidden, l2);
        self.output.add_weight_decay(&mut grads.output, l2);
    }

    /// Every parameter tensor, in a fixed order
    pub(crate) fn tensors(&self) -> Vec<ArrayViewD<'_, f32>> {
        let mut all = self.first.tensors();
        all.extend(self.second.tensors());
        all.extend(self.hidden.tensors());
        all.extend(self.output.tensors());
        all
    }

    /// Mutable counterpart of [`Network::tensors`], same order
    pub(crate) fn tensors_mut(&mut self) -> Vec<ArrayViewMutD<'_, f32>> {
        let mut all = self.first.tensors_mut();
        all.extend(self.second.tensors_mut());
        all.extend(self.hidden.tensors_mut());
        all.extend(self.output.tensors_mut());
        all
    }

    /// Multiply every parameter by `factor`
    pub(crate) fn scale(&mut self, factor: f32) {
        for mut tensor in self.tensors_mut() {
            tensor *= factor;
        }
    }

    /// Total parameter count
    pub fn parameter_count(&self) -> usize {
        self.tensors().iter().map(|t| t.len()).sum()
    }
}

fn relu(v: f32) -> f32 {
    v.max(0.0)
}

/// Numerically stable softmax over the logits
fn softmax(logits: &Array1<f32>) -> [f32; HEALTH_STATE_COUNT] {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut out = [0f32; HEALTH_STATE_COUNT];
    let mut total = 0.0;
    for (o, &z) in out.iter_mut().zip(logits.iter()) {
        *o = (z - max).exp();
        total += *o;
    }
    for o in out.iter_mut() {
        *o /= total;
    }
    out
}

fn dropout_mask(len: usize, rate: f32, rng: &mut StdRng) -> Array1<f32> {
    if rate <= 0.0 {
        return Array1::ones(len);
    }
    let keep = 1.0 - rate;
    Array1::from_iter((0..len).map(|_| {
        if rng.gen::<f32>() < rate {
            0.0
        } else {
            1.0 / keep
        }
    }))
}
