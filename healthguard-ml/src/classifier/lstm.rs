//! LSTM layer with full backpropagation through time
//!
//! Gate layout inside the stacked pre-activation `z` (length `4H`):
//!
//! ```text
//! z = W·x_t + U·h_{t-1} + b
//!     [0 .. H)    input gate    i = σ(z)
//!     [H .. 2H)   forget gate   f = σ(z)
//!     [2H .. 3H)  candidate     g = tanh(z)
//!     [3H .. 4H)  output gate   o = σ(z)
//!
//! c_t = f ⊙ c_{t-1} + i ⊙ g
//! h_t = o ⊙ tanh(c_t)
//! ```

use ndarray::{linalg::general_mat_mul, s, Array1, Array2, ArrayViewD, ArrayViewMutD, Axis};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::{glorot_uniform, sigmoid};

/// One recurrent layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lstm {
    /// Input kernel, `4H × input`
    pub(crate) w: Array2<f32>,
    /// Recurrent kernel, `4H × H`
    pub(crate) u: Array2<f32>,
    /// Gate bias, `4H`
    pub(crate) b: Array1<f32>,
}

/// Activations kept for the backward pass
pub(crate) struct StepCache {
    x: Array1<f32>,
    h_prev: Array1<f32>,
    c_prev: Array1<f32>,
    i: Array1<f32>,
    f: Array1<f32>,
    g: Array1<f32>,
    o: Array1<f32>,
    c: Array1<f32>,
    tanh_c: Array1<f32>,
    h: Array1<f32>,
}

impl Lstm {
    /// Glorot-initialized layer; forget-gate bias starts at 1
    pub fn new(input: usize, hidden: usize, rng: &mut StdRng) -> Self {
        let mut b = Array1::zeros(4 * hidden);
        b.slice_mut(s![hidden..2 * hidden]).fill(1.0);

        Self {
            w: glorot_uniform(4 * hidden, input, rng),
            u: glorot_uniform(4 * hidden, hidden, rng),
            b,
        }
    }

    /// Layer with every parameter zeroed, same shapes
    pub fn zeros_like(&self) -> Self {
        Self {
            w: Array2::zeros(self.w.raw_dim()),
            u: Array2::zeros(self.u.raw_dim()),
            b: Array1::zeros(self.b.raw_dim()),
        }
    }

    /// Hidden units
    pub fn hidden(&self) -> usize {
        self.u.ncols()
    }

    /// Expected input width
    pub fn input(&self) -> usize {
        self.w.ncols()
    }

    /// Hidden state after every step
    pub fn forward(&self, xs: &[Array1<f32>]) -> Vec<Array1<f32>> {
        let hidden = self.hidden();
        let mut h = Array1::zeros(hidden);
        let mut c = Array1::zeros(hidden);
        let mut out = Vec::with_capacity(xs.len());

        for x in xs {
            let step = self.step(x, &h, &c);
            h = step.h;
            c = step.c;
            out.push(h.clone());
        }
        out
    }

    /// Forward pass keeping every step's activations
    pub(crate) fn forward_train(&self, xs: &[Array1<f32>]) -> (Vec<Array1<f32>>, Vec<StepCache>) {
        let hidden = self.hidden();
        let mut caches: Vec<StepCache> = Vec::with_capacity(xs.len());

        for x in xs {
            let step = match caches.last() {
                Some(prev) => self.step(x, &prev.h, &prev.c),
                None => self.step(x, &Array1::zeros(hidden), &Array1::zeros(hidden)),
            };
            caches.push(step);
        }

        let outputs = caches.iter().map(|c| c.h.clone()).collect();
        (outputs, caches)
    }

    fn step(&self, x: &Array1<f32>, h_prev: &Array1<f32>, c_prev: &Array1<f32>) -> StepCache {
        let n = self.hidden();
        let z = self.w.dot(x) + self.u.dot(h_prev) + &self.b;

        let i = z.slice(s![0..n]).mapv(sigmoid);
        let f = z.slice(s![n..2 * n]).mapv(sigmoid);
        let g = z.slice(s![2 * n..3 * n]).mapv(f32::tanh);
        let o = z.slice(s![3 * n..4 * n]).mapv(sigmoid);

        let c = &f * c_prev + &i * &g;
        let tanh_c = c.mapv(f32::tanh);
        let h = &o * &tanh_c;

        StepCache {
            x: x.clone(),
            h_prev: h_prev.clone(),
            c_prev: c_prev.clone(),
            i,
            f,
            g,
            o,
            c,
            tanh_c,
            h,
        }
    }

    /// Backpropagate `dhs` (loss gradient w.r.t. each emitted hidden state).
    ///
    /// Parameter gradients are added into `grads`; returns the gradient
    /// w.r.t. each input step.
    pub(crate) fn backward(
        &self,
        caches: &[StepCache],
        dhs: &[Array1<f32>],
        grads: &mut Lstm,
    ) -> Vec<Array1<f32>> {
        let n = self.hidden();
        let mut dh_next = Array1::<f32>::zeros(n);
        let mut dc_next = Array1::<f32>::zeros(n);
        let mut dxs = vec![Array1::<f32>::zeros(self.input()); caches.len()];

        for t in (0..caches.len()).rev() {
            let cache = &caches[t];
            let dh = &dhs[t] + &dh_next;

            let d_o = &dh * &cache.tanh_c;
            let dc = &dc_next + &(&dh * &cache.o * &cache.tanh_c.mapv(|v| 1.0 - v * v));
            let d_i = &dc * &cache.g;
            let d_f = &dc * &cache.c_prev;
            let d_g = &dc * &cache.i;

            let mut dz = Array1::<f32>::zeros(4 * n);
            dz.slice_mut(s![0..n])
                .assign(&(d_i * &cache.i.mapv(|v| v * (1.0 - v))));
            dz.slice_mut(s![n..2 * n])
                .assign(&(d_f * &cache.f.mapv(|v| v * (1.0 - v))));
            dz.slice_mut(s![2 * n..3 * n])
                .assign(&(d_g * &cache.g.mapv(|v| 1.0 - v * v)));
            dz.slice_mut(s![3 * n..4 * n])
                .assign(&(d_o * &cache.o.mapv(|v| v * (1.0 - v))));

            let dz_col = dz.view().insert_axis(Axis(1));
            general_mat_mul(
                1.0,
                &dz_col,
                &cache.x.view().insert_axis(Axis(0)),
                1.0,
                &mut grads.w,
            );
            general_mat_mul(
                1.0,
                &dz_col,
                &cache.h_prev.view().insert_axis(Axis(0)),
                1.0,
                &mut grads.u,
            );
            grads.b += &dz;

            dxs[t] = self.w.t().dot(&dz);
            dh_next = self.u.t().dot(&dz);
            dc_next = dc * &cache.f;
        }
        dxs
    }

    pub(crate) fn tensors(&self) -> Vec<ArrayViewD<'_, f32>> {
        vec![
            self.w.view().into_dyn(),
            self.u.view().into_dyn(),
            self.b.view().into_dyn(),
        ]
    }

    pub(crate) fn tensors_mut(&mut self) -> Vec<ArrayViewMutD<'_, f32>> {
        vec![
            self.w.view_mut().into_dyn(),
            self.u.view_mut().into_dyn(),
            self.b.view_mut().into_dyn(),
        ]
    }

    /// Sum of squared kernel weights (bias excluded)
    pub(crate) fn kernel_sq_norm(&self) -> f32 {
        self.w.iter().chain(self.u.iter()).map(|v| v * v).sum()
    }

    /// Add `2·l2·W` to the kernel gradients
    pub(crate) fn add_weight_decay(&self, grads: &mut Lstm, l2: f32) {
        grads.w.scaled_add(2.0 * l2, &self.w);
        grads.u.scaled_add(2.0 * l2, &self.u);
    }
}
