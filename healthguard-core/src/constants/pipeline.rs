//! Pipeline geometry and training parameters

// ===== WINDOWING =====

/// Number of consecutive samples in one window.
///
/// A window of 10 readings is the unit the sequence classifier consumes.
pub const SEQUENCE_LENGTH: usize = 10;

/// Dimension of one engineered feature vector.
///
/// `[temp_z, current_z, hour_z, day_z, vibration_norm]`
pub const FEATURE_DIM: usize = 5;

/// Divisor turning the UTC hour (0..=23) into a linear fraction.
pub const HOURS_PER_DAY: f32 = 24.0;

/// Divisor turning the day of month (1..=31) into a linear fraction.
pub const DAYS_PER_MONTH: f32 = 31.0;

// ===== CLUSTERING =====

/// Number of latent health states.
pub const HEALTH_STATE_COUNT: usize = 3;

/// Independent k-means initializations; the lowest-inertia run wins.
pub const KMEANS_N_INIT: usize = 10;

/// Lloyd iterations per initialization.
pub const KMEANS_MAX_ITER: usize = 300;

/// Convergence tolerance on total centroid movement (squared).
pub const KMEANS_TOLERANCE: f32 = 1e-4;

// ===== CLASSIFIER =====

/// Units of the first (sequence-returning) LSTM layer.
pub const LSTM_UNITS_FIRST: usize = 64;

/// Units of the second (last-state) LSTM layer.
pub const LSTM_UNITS_SECOND: usize = 32;

/// Units of the ReLU dense layer before the softmax head.
pub const DENSE_UNITS: usize = 16;

/// Dropout rate after each LSTM layer (training only).
pub const DROPOUT_RATE: f32 = 0.2;

/// L2 penalty on every kernel.
pub const L2_PENALTY: f32 = 1e-3;

/// Initial Adam learning rate.
pub const LEARNING_RATE: f32 = 1e-3;

/// Adam first-moment decay.
pub const ADAM_BETA1: f32 = 0.9;

/// Adam second-moment decay.
pub const ADAM_BETA2: f32 = 0.999;

/// Adam denominator fuzz.
pub const ADAM_EPSILON: f32 = 1e-7;

// ===== TRAINING =====

/// Seed for every random draw (initialization, shuffles, dropout).
pub const RANDOM_SEED: u64 = 42;

/// Share of windows held out for validation.
pub const VALIDATION_SPLIT: f32 = 0.2;

/// Upper bound on training epochs.
pub const MAX_EPOCHS: usize = 50;

/// Mini-batch size.
pub const BATCH_SIZE: usize = 32;

/// Epochs without validation improvement before training stops.
pub const EARLY_STOPPING_PATIENCE: usize = 5;

/// Epochs without improvement before the learning rate is cut.
pub const LR_PLATEAU_PATIENCE: usize = 3;

/// Multiplier applied to the learning rate on a plateau.
pub const LR_PLATEAU_FACTOR: f32 = 0.5;

/// Learning-rate floor.
pub const MIN_LEARNING_RATE: f32 = 1e-5;

// ===== INFERENCE =====

/// Number of trailing predictions and readings considered by a report.
pub const TRAILING_WINDOW: usize = 10;
