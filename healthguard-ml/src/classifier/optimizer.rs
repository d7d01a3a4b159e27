//! Adam optimizer over a [`Network`]'s parameter tensors

use ndarray::Zip;

use super::network::Network;

/// Adam state: first and second moment per parameter
pub(crate) struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    steps: i32,
    m: Network,
    v: Network,
}

impl Adam {
    pub(crate) fn new(
        template: &Network,
        learning_rate: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
    ) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            steps: 0,
            m: template.zeros_like(),
            v: template.zeros_like(),
        }
    }

    pub(crate) fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    pub(crate) fn set_learning_rate(&mut self, learning_rate: f32) {
        self.learning_rate = learning_rate;
    }

    /// Apply one bias-corrected update
    pub(crate) fn step(&mut self, params: &mut Network, grads: &Network) {
        self.steps = self.steps.saturating_add(1);
        let (b1, b2, eps) = (self.beta1, self.beta2, self.epsilon);
        let lr_t = self.learning_rate * (1.0 - b2.powi(self.steps)).sqrt()
            / (1.0 - b1.powi(self.steps));

        let tensors = params
            .tensors_mut()
            .into_iter()
            .zip(grads.tensors())
            .zip(self.m.tensors_mut())
            .zip(self.v.tensors_mut());

        for (((p, g), m), v) in tensors {
            Zip::from(p)
                .and(g)
                .and(m)
                .and(v)
                .for_each(|p, &g, m, v| {
                    *m = b1 * *m + (1.0 - b1) * g;
                    *v = b2 * *v + (1.0 - b2) * g * g;
                    *p -= lr_t * *m / (v.sqrt() + eps);
                });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifierConfig;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn first_step_moves_each_weight_by_learning_rate() {
        let config = ClassifierConfig {
            lstm_units_first: 2,
            lstm_units_second: 2,
            dense_units: 2,
            ..ClassifierConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        let mut net = Network::new(3, &config, &mut rng);
        let before = net.clone();

        let mut grads = net.zeros_like();
        grads.output.b.fill(0.5);
        grads.hidden.w.fill(-2.0);

        let mut adam = Adam::new(&net, 0.01, 0.9, 0.999, 1e-7);
        adam.step(&mut net, &grads);

        for (after, start) in net.output.b.iter().zip(before.output.b.iter()) {
            assert!((start - after - 0.01).abs() < 1e-4);
        }
        for (after, start) in net.hidden.w.iter().zip(before.hidden.w.iter()) {
            assert!((after - start - 0.01).abs() < 1e-4);
        }
        // Zero gradient leaves the weight untouched
        assert_eq!(net.first.w, before.first.w);
    }
}
