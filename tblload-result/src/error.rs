use std::path::PathBuf;
use std::{fmt, io};
use thiserror::Error;

/// Unified error type for all tblload operations.
///
/// Each variant names one failure class of a bulk load. Row-level variants
/// (see [`Error::is_row_level`]) describe a single bad input row and may be
/// skipped by the loader; everything else ends the load.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error that has not been attributed to a specific collaborator.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The dataset file is missing, cannot be opened, is not valid UTF-8, or
    /// has no header line.
    #[error("dataset {path:?} is unreadable: {reason}")]
    DatasetUnreadable { path: PathBuf, reason: String },

    /// A data row's field count disagrees with the header-derived column count.
    ///
    /// Raised before any store is touched, so a rejected row never leaves
    /// partial state behind.
    #[error("line {line}: expected {expected} fields, found {found}")]
    SchemaMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// The header declares a column type outside the supported set.
    #[error("column '{column}' has unknown type '{type_name}'")]
    UnknownColumnType { column: String, type_name: String },

    /// Encoding a field would exceed the record buffer capacity.
    #[error(
        "encoding column '{column}' needs {needed} bytes but only {remaining} remain in the record buffer"
    )]
    EncodingOverflow {
        column: String,
        needed: usize,
        remaining: usize,
    },

    /// A textual field could not be converted to its declared type.
    #[error("column '{column}': invalid value '{value}': {reason}")]
    InvalidFieldValue {
        column: String,
        value: String,
        reason: String,
    },

    /// A dataset line exceeds the configured maximum length.
    #[error("line {line} exceeds the maximum line length of {limit} bytes")]
    LineTooLong { line: usize, limit: usize },

    /// The primary record store failed to open, insert, remove, or close.
    #[error("storage failure: {0}")]
    StorageFailure(String),

    /// The secondary index failed to be created, opened, written, or closed.
    #[error("index failure: {0}")]
    IndexFailure(String),

    /// Invalid configuration or API argument.
    #[error("Invalid argument: {0}")]
    InvalidArgumentError(String),

    /// Persisted bytes do not decode under the expected layout.
    #[error("corrupt data: {0}")]
    Corrupt(String),

    /// Internal error indicating a bug or unexpected state.
    #[error("An internal operation failed: {0}")]
    Internal(String),
}

impl Error {
    /// True for errors that concern one input row only.
    ///
    /// The loader may discard such a row and continue. All other errors leave
    /// the dataset, the primary store, or the index in a state where carrying
    /// on is not meaningful.
    pub fn is_row_level(&self) -> bool {
        matches!(
            self,
            Error::SchemaMismatch { .. }
                | Error::EncodingOverflow { .. }
                | Error::InvalidFieldValue { .. }
                | Error::LineTooLong { .. }
        )
    }

    /// Wrap any displayable error as a [`Error::StorageFailure`].
    ///
    /// ```
    /// use tblload_result::Error;
    ///
    /// let err = Error::storage("page 7 missing");
    /// assert!(matches!(err, Error::StorageFailure(msg) if msg == "page 7 missing"));
    /// ```
    #[inline]
    pub fn storage<E: fmt::Display>(err: E) -> Self {
        Error::StorageFailure(err.to_string())
    }

    /// Wrap any displayable error as an [`Error::IndexFailure`].
    #[inline]
    pub fn index<E: fmt::Display>(err: E) -> Self {
        Error::IndexFailure(err.to_string())
    }

    /// Build a [`Error::DatasetUnreadable`] for `path`.
    #[inline]
    pub fn dataset_unreadable(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        Error::DatasetUnreadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_level_classification() {
        let row = Error::SchemaMismatch {
            line: 3,
            expected: 3,
            found: 2,
        };
        assert!(row.is_row_level());
        assert!(
            Error::LineTooLong {
                line: 9,
                limit: 16
            }
            .is_row_level()
        );

        assert!(!Error::storage("disk full").is_row_level());
        assert!(!Error::index("insert rejected").is_row_level());
        assert!(
            !Error::UnknownColumnType {
                column: "x".into(),
                type_name: "float".into()
            }
            .is_row_level()
        );
    }

    #[test]
    fn messages_name_the_failure() {
        let err = Error::SchemaMismatch {
            line: 4,
            expected: 3,
            found: 2,
        };
        assert_eq!(err.to_string(), "line 4: expected 3 fields, found 2");

        let err = Error::dataset_unreadable("data.csv", "missing header line");
        assert!(err.to_string().contains("missing header line"));
    }
}
