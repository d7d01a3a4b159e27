//! Mini-batch training loop
//!
//! ## Schedule
//!
//! ```text
//! shuffle(seed) → [ validation | training ]
//! per epoch:
//!     shuffle training, step Adam per mini-batch
//!     monitored = validation loss (training loss when no validation set)
//!     improved?  keep weights as best, reset both counters
//!     otherwise: plateau counter hits patience → halve LR (floored)
//!                stop counter hits patience    → stop
//! restore best weights
//! ```
//!
//! Reported losses include the L2 penalty.

use ndarray::Array1;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{network::Network, optimizer::Adam, ClassifierConfig};

/// Loss figures for one epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number
    pub epoch: usize,
    /// Mean training loss (with dropout active)
    pub train_loss: f32,
    /// Mean validation loss, if a validation set exists
    pub val_loss: Option<f32>,
    /// Learning rate used during the epoch
    pub learning_rate: f32,
}

/// Which loss drove early stopping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitoredLoss {
    /// Held-out windows
    Validation,
    /// Too few windows to hold any out
    Training,
}

/// Outcome of a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    /// Epochs actually run
    pub epochs_run: usize,
    /// Epoch whose weights were kept
    pub best_epoch: usize,
    /// Monitored loss at `best_epoch`
    pub best_loss: f32,
    /// Learning rate when training ended
    pub final_learning_rate: f32,
    /// Loss that was monitored
    pub monitored: MonitoredLoss,
    /// Windows used for gradient steps
    pub train_windows: usize,
    /// Windows held out
    pub val_windows: usize,
    /// Per-epoch history
    pub history: Vec<EpochStats>,
}

impl TrainingSummary {
    /// True when training ended before the epoch limit
    pub fn stopped_early(&self, max_epochs: usize) -> bool {
        self.epochs_run < max_epochs
    }
}

/// One sequence and its target class
pub(crate) struct Example {
    pub(crate) steps: Vec<Array1<f32>>,
    pub(crate) label: usize,
}

/// Number of held-out examples for `n` examples
pub(crate) fn validation_count(n: usize, split: f32) -> usize {
    if n <= 1 || split <= 0.0 {
        return 0;
    }
    let raw = (split * n as f32).ceil() as usize;
    raw.min(n - 1)
}

/// Train `network` in place and restore its best weights
pub(crate) fn train(
    network: &mut Network,
    examples: &[Example],
    config: &ClassifierConfig,
) -> TrainingSummary {
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut order: Vec<usize> = (0..examples.len()).collect();
    order.shuffle(&mut rng);
    let val_count = validation_count(examples.len(), config.validation_split);
    let (val_idx, train_idx) = order.split_at(val_count);
    let mut train_idx = train_idx.to_vec();

    let monitored = if val_idx.is_empty() {
        MonitoredLoss::Training
    } else {
        MonitoredLoss::Validation
    };
    log::info!(
        "Training classifier: {} windows ({} held out), {} parameters",
        examples.len(),
        val_count,
        network.parameter_count()
    );

    let mut adam = Adam::new(
        network,
        config.learning_rate,
        config.adam_beta1,
        config.adam_beta2,
        config.adam_epsilon,
    );
    let batch_size = config.batch_size.max(1);

    let mut best = network.clone();
    let mut best_loss = f32::INFINITY;
    let mut best_epoch = 0;
    let mut stall = 0;
    let mut plateau = 0;
    let mut history = Vec::new();

    for epoch in 1..=config.max_epochs {
        train_idx.shuffle(&mut rng);
        let lr = adam.learning_rate();

        let mut loss_sum = 0f64;
        for batch in train_idx.chunks(batch_size) {
            let mut grads = network.zeros_like();
            for &i in batch {
                let example = &examples[i];
                loss_sum += network.accumulate(
                    &example.steps,
                    example.label,
                    config.dropout,
                    &mut rng,
                    &mut grads,
                ) as f64;
            }
            grads.scale(1.0 / batch.len() as f32);
            network.add_weight_decay(&mut grads, config.l2);
            adam.step(network, &grads);
        }

        let penalty = network.l2_penalty(config.l2);
        let train_loss = (loss_sum / train_idx.len().max(1) as f64) as f32 + penalty;
        let val_loss = if val_idx.is_empty() {
            None
        } else {
            Some(evaluate(network, examples, val_idx) + penalty)
        };
        let current = val_loss.unwrap_or(train_loss);

        log::debug!(
            "epoch {:>3}: loss={:.5} val_loss={} lr={:.2e}",
            epoch,
            train_loss,
            val_loss.map_or_else(|| "-".to_string(), |v| format!("{:.5}", v)),
            lr
        );
        history.push(EpochStats {
            epoch,
            train_loss,
            val_loss,
            learning_rate: lr,
        });

        if current < best_loss {
            best_loss = current;
            best_epoch = epoch;
            best = network.clone();
            stall = 0;
            plateau = 0;
            continue;
        }

        stall += 1;
        plateau += 1;
        if plateau >= config.lr_plateau_patience {
            let reduced = (lr * config.lr_plateau_factor).max(config.min_learning_rate);
            if reduced < lr {
                log::debug!("Reducing learning rate {:.2e} → {:.2e}", lr, reduced);
                adam.set_learning_rate(reduced);
            }
            plateau = 0;
        }
        if stall >= config.early_stopping_patience {
            log::info!(
                "Early stopping at epoch {} (best epoch {})",
                epoch,
                best_epoch
            );
            break;
        }
    }

    if best_epoch > 0 {
        *network = best;
    }

    let summary = TrainingSummary {
        epochs_run: history.len(),
        best_epoch,
        best_loss,
        final_learning_rate: adam.learning_rate(),
        monitored,
        train_windows: train_idx.len(),
        val_windows: val_count,
        history,
    };
    log::info!(
        "Classifier trained: {} epochs, best {:?} loss {:.5} at epoch {}",
        summary.epochs_run,
        summary.monitored,
        summary.best_loss,
        summary.best_epoch
    );
    summary
}

/// Mean cross-entropy without dropout
fn evaluate(network: &Network, examples: &[Example], indices: &[usize]) -> f32 {
    let total: f64 = indices
        .iter()
        .map(|&i| {
            let example = &examples[i];
            let probs = network.forward(&example.steps);
            -(probs[example.label].max(1e-7).ln()) as f64
        })
        .sum();
    (total / indices.len().max(1) as f64) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_count_rounds_up_and_keeps_one_for_training() {
        assert_eq!(validation_count(0, 0.2), 0);
        assert_eq!(validation_count(1, 0.2), 0);
        assert_eq!(validation_count(2, 0.2), 1);
        assert_eq!(validation_count(5, 0.2), 1);
        assert_eq!(validation_count(6, 0.2), 2);
        assert_eq!(validation_count(100, 0.2), 20);
        assert_eq!(validation_count(3, 0.99), 2);
        assert_eq!(validation_count(10, 0.0), 0);
    }

    #[test]
    fn early_stop_detection() {
        let summary = TrainingSummary {
            epochs_run: 7,
            best_epoch: 2,
            best_loss: 0.3,
            final_learning_rate: 5e-4,
            monitored: MonitoredLoss::Validation,
            train_windows: 8,
            val_windows: 2,
            history: Vec::new(),
        };
        assert!(summary.stopped_early(50));
        assert!(!summary.stopped_early(7));
    }
}
