//! Bulk loading of delimited datasets into a tblload store.
//!
//! The first line of a dataset declares the schema as `name:TYPE` items. Every
//! later line is one row: it is encoded into a binary record, inserted into the
//! primary [`Table`](tblload_table::Table), and its designated column's value
//! is inserted as a fixed-width key into a freshly built
//! [`IndexFile`](tblload_index::IndexFile).

use std::path::{Path, PathBuf};
use std::str::FromStr;

use tblload_index::{KeyType, index_artifact_name};
use tblload_result::{Error, Result};
use tblload_types::{Column, DEFAULT_RECORD_CAPACITY, Schema, Value, encode_fixed_field};

pub mod csv_ingest;
pub use csv_ingest::{
    EntrySink, LoadEvent, LoadSummary, RecordSink, RowCounts, load_csv, load_csv_with_progress,
    load_rows,
};

pub mod reader;
pub use reader::{DEFAULT_MAX_LINE_LEN, RawLine, RowReader, parse_schema, split_line};

pub mod verify;
pub use verify::{VerifyReport, verify_load};

/// Default dataset file name.
pub const DEFAULT_DATASET_PATH: &str = "data.csv";
/// Default primary store file name.
pub const DEFAULT_DB_PATH: &str = "data.db";
/// Default indexed column.
pub const DEFAULT_INDEX_COLUMN: &str = "population";
/// Rows between [`LoadEvent::Progress`] notifications.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 10_000;

/// Which column the secondary index is built over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexColumn {
    Name(String),
    /// Zero-based column position.
    Position(usize),
}

impl IndexColumn {
    /// Resolve against `schema` once, before any row is loaded.
    pub fn resolve(&self, schema: &Schema) -> Result<ResolvedIndexColumn> {
        let position = match self {
            IndexColumn::Name(name) => schema.position_of(name).ok_or_else(|| {
                Error::InvalidArgumentError(format!("index column '{name}' is not in the schema"))
            })?,
            IndexColumn::Position(pos) => {
                if *pos >= schema.num_columns() {
                    return Err(Error::InvalidArgumentError(format!(
                        "index column position {pos} is out of range for {} columns",
                        schema.num_columns()
                    )));
                }
                *pos
            }
        };
        let column = schema
            .column(position)
            .ok_or_else(|| Error::Internal(format!("column {position} vanished")))?
            .clone();
        let key_type = KeyType::try_from(column.column_type()).map_err(|_| {
            Error::InvalidArgumentError(format!(
                "index column '{}' is {}; only INT and LONG columns can be indexed",
                column.name(),
                column.column_type()
            ))
        })?;
        let attribute = u32::try_from(position).map_err(|_| {
            Error::InvalidArgumentError(format!("index column position {position} is too large"))
        })?;
        Ok(ResolvedIndexColumn {
            position,
            attribute,
            column,
            key_type,
        })
    }
}

impl Default for IndexColumn {
    fn default() -> Self {
        IndexColumn::Name(DEFAULT_INDEX_COLUMN.to_string())
    }
}

/// All-digit text selects a position; anything else is a column name.
impl FromStr for IndexColumn {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidArgumentError(
                "index column must not be empty".into(),
            ));
        }
        if s.bytes().all(|b| b.is_ascii_digit()) {
            let pos = s.parse::<usize>().map_err(|e| {
                Error::InvalidArgumentError(format!("index column position '{s}': {e}"))
            })?;
            return Ok(IndexColumn::Position(pos));
        }
        Ok(IndexColumn::Name(s.to_string()))
    }
}

/// The indexed column after resolution against a schema.
///
/// The same value names the index artifact, is recorded as the index
/// attribute, and derives every row's key, so the three cannot drift apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIndexColumn {
    pub position: usize,
    pub attribute: u32,
    pub column: Column,
    pub key_type: KeyType,
}

impl ResolvedIndexColumn {
    pub fn name(&self) -> &str {
        self.column.name()
    }

    /// Path of this column's index artifact next to `store`.
    pub fn artifact_name(&self, store: &Path) -> PathBuf {
        index_artifact_name(store, self.attribute)
    }

    /// Fixed-width key for a row's raw field text.
    pub fn key_from_field(&self, raw: &str) -> Result<Vec<u8>> {
        encode_fixed_field(&self.column, raw)
    }

    /// Fixed-width key for a decoded record value.
    pub fn key_from_value(&self, value: &Value) -> Result<Vec<u8>> {
        match (self.key_type, value) {
            (KeyType::Int, Value::Int(v)) => Ok(v.to_be_bytes().to_vec()),
            (KeyType::Long, Value::Long(v)) => Ok(v.to_be_bytes().to_vec()),
            (key_type, other) => Err(Error::Corrupt(format!(
                "column '{}' holds {:?} where a {key_type} key was expected",
                self.name(),
                other
            ))),
        }
    }
}

/// What to do with a row that fails to tokenize or encode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowErrorPolicy {
    /// Stop the load at the first bad row.
    #[default]
    Abort,
    /// Log and count the row, then continue.
    Skip,
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub dataset_path: PathBuf,
    pub db_path: PathBuf,
    pub index_column: IndexColumn,
    pub delimiter: char,
    pub max_line_len: usize,
    pub record_capacity: usize,
    pub on_row_error: RowErrorPolicy,
    /// Rows between progress events. Zero disables them.
    pub progress_interval: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            index_column: IndexColumn::default(),
            delimiter: ',',
            max_line_len: DEFAULT_MAX_LINE_LEN,
            record_capacity: DEFAULT_RECORD_CAPACITY,
            on_row_error: RowErrorPolicy::Abort,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl LoadOptions {
    pub fn with_dataset_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.dataset_path = path.into();
        self
    }

    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    pub fn with_index_column(mut self, column: IndexColumn) -> Self {
        self.index_column = column;
        self
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len;
        self
    }

    pub fn with_record_capacity(mut self, capacity: usize) -> Self {
        self.record_capacity = capacity;
        self
    }

    pub fn with_row_error_policy(mut self, policy: RowErrorPolicy) -> Self {
        self.on_row_error = policy;
        self
    }

    pub fn with_progress_interval(mut self, rows: usize) -> Self {
        self.progress_interval = rows;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if matches!(self.delimiter, '\n' | '\r') {
            return Err(Error::InvalidArgumentError(
                "delimiter cannot be a line terminator".into(),
            ));
        }
        if self.max_line_len == 0 {
            return Err(Error::InvalidArgumentError(
                "max line length must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cities() -> Schema {
        parse_schema("name:VARCHAR,age:INT,population:LONG", ',').unwrap()
    }

    #[test]
    fn resolve_by_name_and_position_agree() {
        let schema = cities();
        let by_name = IndexColumn::Name("population".into()).resolve(&schema).unwrap();
        let by_pos = IndexColumn::Position(2).resolve(&schema).unwrap();
        assert_eq!(by_name, by_pos);
        assert_eq!(by_name.attribute, 2);
        assert_eq!(by_name.key_type, KeyType::Long);
        assert_eq!(
            by_name.artifact_name(Path::new("data.db")),
            PathBuf::from("data.db.2")
        );
        assert_eq!(by_name.key_from_field("30000").unwrap(), 30000i64.to_be_bytes());
    }

    #[test]
    fn resolve_rejects_bad_columns() {
        let schema = cities();
        for column in [
            IndexColumn::Name("name".into()),
            IndexColumn::Name("missing".into()),
            IndexColumn::Position(3),
        ] {
            assert!(matches!(
                column.resolve(&schema),
                Err(Error::InvalidArgumentError(_))
            ));
        }
    }

    #[test]
    fn index_column_from_str() {
        assert_eq!("2".parse::<IndexColumn>().unwrap(), IndexColumn::Position(2));
        assert_eq!(
            " age ".parse::<IndexColumn>().unwrap(),
            IndexColumn::Name("age".into())
        );
        assert!("".parse::<IndexColumn>().is_err());
    }

    #[test]
    fn key_from_value_checks_the_variant() {
        let resolved = IndexColumn::Name("age".into()).resolve(&cities()).unwrap();
        assert_eq!(
            resolved.key_from_value(&Value::Int(200)).unwrap(),
            200i32.to_be_bytes()
        );
        assert!(resolved.key_from_value(&Value::Long(200)).is_err());
    }
}
