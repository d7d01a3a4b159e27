//! Constants for HealthGuard
//!
//! Fixed values the pipeline was calibrated with. Every configuration struct
//! defaults to these, so a run without a config file reproduces the reference
//! behavior exactly.
//!
//! ## Organization
//!
//! - **Pipeline**: window geometry, clustering and training parameters
//! - **Thresholds**: per-channel alarm limits for the trailing readings
//!
//! Names carry units where a unit exists.

/// Window geometry, model sizes and training parameters.
pub mod pipeline;

/// Alarm thresholds for raw sensor channels.
pub mod thresholds;

pub use pipeline::*;
pub use thresholds::*;
