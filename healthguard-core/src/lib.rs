//! Core telemetry handling for HealthGuard
//!
//! Turns raw machine telemetry (temperature, current, tri-axis acceleration,
//! millisecond timestamps) into the fixed-length feature windows consumed by
//! the health-state models in `healthguard-ml`.
//!
//! Stages, leaf first:
//! - [`source`]: collaborator interface for tabular input (CSV or in-memory)
//! - [`cleaner`]: unit stripping, numeric parsing, row dropping, time ordering
//! - [`features`]: derived features, batch scaling, sliding windows
//!
//! ```no_run
//! use healthguard_core::{Cleaner, CsvSource, FeatureEngineer, ScalingSource, TableSource};
//!
//! # fn main() -> Result<(), healthguard_core::CoreError> {
//! let table = CsvSource::from_path("telemetry.csv").load_table()?;
//! let cleaned = Cleaner::default().clean(&table)?;
//!
//! let engineer = FeatureEngineer::default();
//! let features = engineer.engineer(&cleaned.samples, ScalingSource::FitBatch);
//! let windows = engineer.windows(&features.vectors);
//!
//! // Short inputs yield no windows rather than an error
//! println!("{} windows", windows.len());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cleaner;
pub mod constants;
pub mod errors;
pub mod features;
pub mod sample;
pub mod source;
pub mod time;

// Public API
pub use cleaner::{CleanTable, Cleaner, CleaningStats, ColumnMapping};
pub use errors::{CoreError, CoreResult, ParseError};
pub use features::{
    build_windows, mean_over_windows, FeatureConfig, FeatureEngineer, FeatureKind, FeatureSet,
    FeatureVector, ScalerParams, ScalingSource, Window,
};
pub use sample::SensorSample;
pub use source::{CsvSource, RawTable, TableSource};

/// Crate version, reported by the CLI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
