//! Telemetry cleaning
//!
//! Exports from field gateways are messy: values arrive with unit suffixes
//! (`24.1°C`, `6.2 A`), stray whitespace, blanks, and the occasional
//! garbage cell. Cleaning turns a [`RawTable`] into time-ordered
//! [`SensorSample`]s:
//!
//! 1. Resolve the six required columns, failing fast with
//!    [`CoreError::Schema`] if any is absent
//! 2. Sanitize every sensor cell down to number-forming characters
//!    (digits, `.`, sign, exponent) and parse it
//! 3. Drop any row with a missing or unparseable field
//! 4. Stably sort the survivors by timestamp
//!
//! A bad cell only ever costs its own row.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    errors::{CoreError, CoreResult, ParseError},
    sample::SensorSample,
    source::RawTable,
    time::{self, Timestamp},
};

/// Strip everything that cannot be part of a decimal number.
///
/// Keeps ASCII digits, `.`, `+`, `-`, `e` and `E`. Applying it twice gives
/// the same string as applying it once.
pub fn sanitize_numeric(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | 'e' | 'E'))
        .collect()
}

/// Sanitize and parse one sensor cell
pub fn parse_field(field: &'static str, raw: &str) -> Result<f32, ParseError> {
    let cleaned = sanitize_numeric(raw);
    if cleaned.is_empty() {
        return Err(ParseError::Empty { field });
    }

    let value: f32 = cleaned.parse().map_err(|_| ParseError::NotNumeric {
        field,
        raw: raw.to_string(),
    })?;

    if !value.is_finite() {
        return Err(ParseError::NotFinite { field });
    }
    Ok(value)
}

/// Sanitize and parse an epoch-millisecond cell into a UTC timestamp.
///
/// Integer spellings are exact; float spellings (`1.7105274e12`) are
/// truncated toward zero.
pub fn parse_timestamp(field: &'static str, raw: &str) -> Result<Timestamp, ParseError> {
    let cleaned = sanitize_numeric(raw);
    if cleaned.is_empty() {
        return Err(ParseError::Empty { field });
    }

    let millis = match cleaned.parse::<i64>() {
        Ok(millis) => millis,
        Err(_) => {
            let value: f64 = cleaned.parse().map_err(|_| ParseError::NotNumeric {
                field,
                raw: raw.to_string(),
            })?;
            if !value.is_finite() || value.abs() >= i64::MAX as f64 {
                return Err(ParseError::NotFinite { field });
            }
            value.trunc() as i64
        }
    };

    time::from_epoch_millis(millis).ok_or(ParseError::TimestampOutOfRange { millis })
}

/// Header names of the required columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    /// Epoch milliseconds
    pub timestamp: String,
    /// Temperature
    pub temp: String,
    /// Current
    pub current: String,
    /// Acceleration x
    pub ax: String,
    /// Acceleration y
    pub ay: String,
    /// Acceleration z
    pub az: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            timestamp: "timestamp".to_string(),
            temp: "temp".to_string(),
            current: "current".to_string(),
            ax: "ax".to_string(),
            ay: "ay".to_string(),
            az: "az".to_string(),
        }
    }
}

impl ColumnMapping {
    /// Logical name / header name pairs, in sample field order
    fn required(&self) -> [(&'static str, &str); 6] {
        [
            ("timestamp", self.timestamp.as_str()),
            ("temp", self.temp.as_str()),
            ("current", self.current.as_str()),
            ("ax", self.ax.as_str()),
            ("ay", self.ay.as_str()),
            ("az", self.az.as_str()),
        ]
    }
}

/// Counters collected while cleaning
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleaningStats {
    /// Data rows in the raw table
    pub rows_read: usize,
    /// Rows that became samples
    pub rows_kept: usize,
    /// Rows dropped for a missing or unparseable field
    pub rows_dropped: usize,
    /// First failing field of each dropped row
    pub dropped_by_field: BTreeMap<&'static str, usize>,
}

/// Cleaned, time-ordered telemetry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanTable {
    /// Samples sorted by timestamp (stable for equal timestamps)
    pub samples: Vec<SensorSample>,
    /// What happened during cleaning
    pub stats: CleaningStats,
}

impl CleanTable {
    /// Number of cleaned samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when nothing survived cleaning
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The last `k` samples (fewer when the table is shorter)
    pub fn tail(&self, k: usize) -> &[SensorSample] {
        let start = self.samples.len().saturating_sub(k);
        &self.samples[start..]
    }

    /// Fail with [`CoreError::InsufficientData`] unless at least one window
    /// of `window_len` can be built
    pub fn ensure_windowable(&self, window_len: usize) -> CoreResult<()> {
        let required = window_len + 1;
        if self.samples.len() < required {
            return Err(CoreError::InsufficientData {
                required,
                available: self.samples.len(),
            });
        }
        Ok(())
    }
}

/// Row cleaner
#[derive(Debug, Clone, Default)]
pub struct Cleaner {
    columns: ColumnMapping,
}

impl Cleaner {
    /// Cleaner with custom header names
    pub fn new(columns: ColumnMapping) -> Self {
        Self { columns }
    }

    /// Header names this cleaner looks for
    pub fn columns(&self) -> &ColumnMapping {
        &self.columns
    }

    /// Clean a raw table
    pub fn clean(&self, table: &RawTable) -> CoreResult<CleanTable> {
        let indices = self.resolve_columns(table)?;

        let mut stats = CleaningStats {
            rows_read: table.len(),
            ..CleaningStats::default()
        };
        let mut samples = Vec::with_capacity(table.len());

        for (row_number, row) in table.rows.iter().enumerate() {
            match Self::parse_row(row, &indices) {
                Ok(sample) => samples.push(sample),
                Err(err) => {
                    log::trace!("Dropping row {}: {}", row_number, err);
                    stats.rows_dropped += 1;
                    *stats.dropped_by_field.entry(err_field(&err)).or_insert(0) += 1;
                }
            }
        }

        // sort_by_key is stable: equal timestamps keep file order
        samples.sort_by_key(|s| s.timestamp);
        stats.rows_kept = samples.len();

        if stats.rows_dropped > 0 {
            log::warn!(
                "Dropped {} of {} rows with missing or unparseable fields ({:?})",
                stats.rows_dropped,
                stats.rows_read,
                stats.dropped_by_field
            );
        }
        log::info!("Cleaned {} samples", stats.rows_kept);

        Ok(CleanTable { samples, stats })
    }

    fn resolve_columns(&self, table: &RawTable) -> CoreResult<[usize; 6]> {
        let mut indices = [0usize; 6];
        let mut missing = Vec::new();

        for (slot, (_, header)) in indices.iter_mut().zip(self.columns.required()) {
            match table.column_index(header) {
                Some(index) => *slot = index,
                None => missing.push(header.to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(CoreError::Schema { missing });
        }
        Ok(indices)
    }

    fn parse_row(row: &[String], indices: &[usize; 6]) -> Result<SensorSample, ParseError> {
        let cell = |i: usize| row.get(indices[i]).map(String::as_str).unwrap_or("");

        let timestamp = parse_timestamp("timestamp", cell(0))?;
        let temp = parse_field("temp", cell(1))?;
        let current = parse_field("current", cell(2))?;
        let ax = parse_field("ax", cell(3))?;
        let ay = parse_field("ay", cell(4))?;
        let az = parse_field("az", cell(5))?;

        Ok(SensorSample::new(timestamp, temp, current, [ax, ay, az]))
    }
}

fn err_field(err: &ParseError) -> &'static str {
    match err {
        ParseError::Empty { field }
        | ParseError::NotNumeric { field, .. }
        | ParseError::NotFinite { field } => *field,
        ParseError::TimestampOutOfRange { .. } => "timestamp",
    }
}
