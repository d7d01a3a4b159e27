//! Error Types for Telemetry Ingestion
//!
//! ## Error Categories
//!
//! Errors fall into two severities:
//!
//! ### Row-scoped (recoverable)
//! - [`ParseError`]: a single field could not be turned into a number or a
//!   timestamp. The cleaner drops the row, counts it, and keeps going.
//!
//! ### Run-scoped (fatal)
//! - [`CoreError::Schema`]: a required column is absent from the table header
//! - [`CoreError::Io`] / [`CoreError::Csv`]: the source could not be read
//! - [`CoreError::InsufficientData`]: not enough cleaned samples to build a
//!   single window
//!
//! ## Handling Strategy
//!
//! ```rust
//! use healthguard_core::{Cleaner, CoreError, RawTable};
//!
//! let table = RawTable::new(vec!["timestamp".into(), "temp".into()]);
//! match Cleaner::default().clean(&table) {
//!     Ok(_) => unreachable!(),
//!     Err(CoreError::Schema { missing }) => {
//!         // Fix the export job upstream - nothing usable in this file
//!         assert!(missing.contains(&"current".to_string()));
//!     }
//!     Err(_) => {
//!         // I/O trouble - retry or abort the run
//!     }
//! }
//! ```

use thiserror::Error;

/// Result type for ingestion and feature operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Field-level parse failure. Never fatal: the owning row is dropped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Field absent or blank after sanitizing
    #[error("Field `{field}` is empty")]
    Empty {
        /// Logical field name (e.g. `temp`)
        field: &'static str,
    },

    /// Field has characters left over but they do not form a number
    #[error("Field `{field}` is not numeric: {raw:?}")]
    NotNumeric {
        /// Logical field name
        field: &'static str,
        /// Raw cell contents before sanitizing
        raw: String,
    },

    /// Parsed to NaN or infinity
    #[error("Field `{field}` is not finite")]
    NotFinite {
        /// Logical field name
        field: &'static str,
    },

    /// Millisecond value outside the representable calendar range
    #[error("Timestamp {millis} ms is out of range")]
    TimestampOutOfRange {
        /// Offending epoch milliseconds
        millis: i64,
    },
}

/// Fatal ingestion errors
#[derive(Error, Debug)]
pub enum CoreError {
    /// Required columns are missing from the header
    #[error("Schema error: missing required column(s) {}", .missing.join(", "))]
    Schema {
        /// Every required column that could not be found
        missing: Vec<String>,
    },

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV structure (not a single bad cell)
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Fewer cleaned samples than needed for one window
    #[error("Insufficient data: need {required} samples, have {available}")]
    InsufficientData {
        /// Minimum sample count (`window length + 1`)
        required: usize,
        /// Samples that survived cleaning
        available: usize,
    },
}
