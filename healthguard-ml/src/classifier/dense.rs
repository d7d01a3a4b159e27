//! Fully connected layer

use ndarray::{linalg::general_mat_mul, Array1, Array2, ArrayViewD, ArrayViewMutD, Axis};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::glorot_uniform;

/// `y = W·x + b`; activations are applied by the network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dense {
    /// Kernel, `output × input`
    pub(crate) w: Array2<f32>,
    /// Bias, `output`
    pub(crate) b: Array1<f32>,
}

impl Dense {
    /// Glorot-initialized layer with zero bias
    pub fn new(input: usize, output: usize, rng: &mut StdRng) -> Self {
        Self {
            w: glorot_uniform(output, input, rng),
            b: Array1::zeros(output),
        }
    }

    /// Zeroed copy
    pub fn zeros_like(&self) -> Self {
        Self {
            w: Array2::zeros(self.w.raw_dim()),
            b: Array1::zeros(self.b.raw_dim()),
        }
    }

    /// Affine transform of one input
    pub fn forward(&self, x: &Array1<f32>) -> Array1<f32> {
        self.w.dot(x) + &self.b
    }

    /// Accumulate parameter gradients; returns `∂L/∂x`
    pub(crate) fn backward(
        &self,
        x: &Array1<f32>,
        dy: &Array1<f32>,
        grads: &mut Dense,
    ) -> Array1<f32> {
        general_mat_mul(
            1.0,
            &dy.view().insert_axis(Axis(1)),
            &x.view().insert_axis(Axis(0)),
            1.0,
            &mut grads.w,
        );
        grads.b += dy;
        self.w.t().dot(dy)
    }

    pub(crate) fn tensors(&self) -> Vec<ArrayViewD<'_, f32>> {
        vec![self.w.view().into_dyn(), self.b.view().into_dyn()]
    }

    pub(crate) fn tensors_mut(&mut self) -> Vec<ArrayViewMutD<'_, f32>> {
        vec![self.w.view_mut().into_dyn(), self.b.view_mut().into_dyn()]
    }

    pub(crate) fn kernel_sq_norm(&self) -> f32 {
        self.w.iter().map(|v| v * v).sum()
    }

    pub(crate) fn add_weight_decay(&self, grads: &mut Dense, l2: f32) {
        grads.w.scaled_add(2.0 * l2, &self.w);
    }
}
