//! Tabular telemetry sources
//!
//! The pipeline only needs a header row and string cells; how they are
//! produced is the collaborator's business. Two sources ship with the crate:
//!
//! 1. **CSV**: [`CsvSource`] reads a delimited file with a header line
//! 2. **Memory**: [`RawTable`] itself, built row by row (tests, embedding)
//!
//! ## CSV Format
//! ```csv
//! timestamp,temp,current,ax,ay,az
//! 1710527400000,24.1°C,6.2A,0.01,0.02,0.98
//! ```
//!
//! Cells are kept verbatim (including unit suffixes); the [`Cleaner`]
//! decides what is numeric. Rows may be shorter than the header: the missing
//! cells count as empty fields and the row is dropped during cleaning.
//!
//! [`Cleaner`]: crate::cleaner::Cleaner

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::errors::CoreResult;

/// Anything that can hand over a header plus string rows
pub trait TableSource {
    /// Read the whole table
    fn load_table(&self) -> CoreResult<RawTable>;
}

/// Header plus raw string cells, exactly as read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    /// Column names in file order
    pub headers: Vec<String>,
    /// Data rows; may be ragged
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Create an empty table with the given header
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Builder-style row append
    pub fn with_row<I, S>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push_row(cells);
        self
    }

    /// Append a row
    pub fn push_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    /// Locate a column, ignoring surrounding whitespace and ASCII case
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.trim();
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(wanted))
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when there are no data rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Parse CSV text from any reader; the first record is the header
    pub fn from_csv_reader<R: Read>(reader: R, delimiter: u8) -> CoreResult<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader
            .headers()?
            .iter()
            .map(str::to_string)
            .collect();

        let mut table = Self::new(headers);
        for record in csv_reader.records() {
            let record = record?;
            table.push_row(record.iter());
        }

        log::debug!(
            "Read {} rows across {} columns",
            table.len(),
            table.headers.len()
        );
        Ok(table)
    }
}

impl TableSource for RawTable {
    fn load_table(&self) -> CoreResult<RawTable> {
        Ok(self.clone())
    }
}

/// CSV file source
///
/// ```rust,no_run
/// use healthguard_core::{CsvSource, TableSource};
///
/// let table = CsvSource::from_path("telemetry.csv")
///     .with_delimiter(b';')
///     .load_table()?;
/// # Ok::<(), healthguard_core::CoreError>(())
/// ```
#[derive(Debug, Clone)]
pub struct CsvSource {
    /// File to read
    path: PathBuf,
    /// Field delimiter
    delimiter: u8,
}

impl CsvSource {
    /// Comma-separated file at `path`
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            delimiter: b',',
        }
    }

    /// Use a different field delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Path this source reads from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TableSource for CsvSource {
    fn load_table(&self) -> CoreResult<RawTable> {
        log::info!("Loading telemetry from {}", self.path.display());
        let file = File::open(&self.path)?;
        RawTable::from_csv_reader(file, self.delimiter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn column_lookup_ignores_case_and_padding() {
        let table = RawTable::new(vec![" Timestamp ".into(), "TEMP".into()]);
        assert_eq!(table.column_index("timestamp"), Some(0));
        assert_eq!(table.column_index("temp"), Some(1));
        assert_eq!(table.column_index("current"), None);
    }

    #[test]
    fn reads_ragged_csv() {
        let data = "timestamp,temp,current\n1000,20.5,4\n2000,21\n";
        let table = RawTable::from_csv_reader(data.as_bytes(), b',').unwrap();

        assert_eq!(table.headers, vec!["timestamp", "temp", "current"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[1], vec!["2000", "21"]);
    }

    #[test]
    fn csv_source_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timestamp;temp").unwrap();
        writeln!(file, "1000;20.5 °C").unwrap();

        let table = CsvSource::from_path(file.path())
            .with_delimiter(b';')
            .load_table()
            .unwrap();
        assert_eq!(table.rows, vec![vec!["1000".to_string(), "20.5 °C".to_string()]]);
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = CsvSource::from_path("/definitely/not/here.csv").load_table();
        assert!(matches!(result, Err(crate::CoreError::Io(_))));
    }
}
