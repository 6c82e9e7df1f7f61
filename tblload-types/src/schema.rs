//! Column schema derived from a dataset header line.
//!
//! Header grammar: `name:TYPE` items separated by the dataset delimiter, e.g.
//! `name:VARCHAR,age:INT,population:LONG`. Type names are case-insensitive and
//! whitespace around names and types is ignored.

use std::fmt;
use std::str::FromStr;

use tblload_result::{Error, Result};

/// Declared type of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// Variable-length UTF-8 text, length-prefixed on disk.
    Varchar,
    /// 32-bit signed integer, 4 bytes big-endian.
    Int,
    /// 64-bit signed integer, 8 bytes big-endian.
    Long,
}

impl ColumnType {
    /// Canonical (upper-case) name used when rendering a header.
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Varchar => "VARCHAR",
            ColumnType::Int => "INT",
            ColumnType::Long => "LONG",
        }
    }
}

impl FromStr for ColumnType {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("varchar") {
            Ok(ColumnType::Varchar)
        } else if s.eq_ignore_ascii_case("int") {
            Ok(ColumnType::Int)
        } else if s.eq_ignore_ascii_case("long") {
            Ok(ColumnType::Long)
        } else {
            Err(())
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }
}

/// Ordered, immutable list of typed columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Build a schema, rejecting empty column lists, empty names and
    /// duplicate names.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if columns.is_empty() {
            return Err(Error::InvalidArgumentError(
                "schema must declare at least one column".into(),
            ));
        }
        for (idx, column) in columns.iter().enumerate() {
            if column.name.is_empty() {
                return Err(Error::InvalidArgumentError(format!(
                    "column {idx} has an empty name"
                )));
            }
            if columns[..idx].iter().any(|c| c.name == column.name) {
                return Err(Error::InvalidArgumentError(format!(
                    "duplicate column name '{}'",
                    column.name
                )));
            }
        }
        Ok(Self { columns })
    }

    /// Parse a header line into a schema.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownColumnType`] when a type name is not VARCHAR/INT/LONG.
    /// - [`Error::InvalidArgumentError`] when an item lacks the `name:TYPE`
    ///   shape, a name is empty, or a name repeats.
    pub fn parse_header(header: &str, delimiter: char) -> Result<Self> {
        let header = header.trim_end_matches(['\r', '\n']);
        let mut columns = Vec::new();
        for (idx, item) in header.split(delimiter).enumerate() {
            let (name, type_name) = item.split_once(':').ok_or_else(|| {
                Error::InvalidArgumentError(format!(
                    "header item {idx} ('{item}') is not of the form name:TYPE"
                ))
            })?;
            let name = name.trim();
            let type_name = type_name.trim();
            let column_type =
                type_name
                    .parse::<ColumnType>()
                    .map_err(|_| Error::UnknownColumnType {
                        column: name.to_string(),
                        type_name: type_name.to_string(),
                    })?;
            columns.push(Column::new(name, column_type));
        }
        Self::new(columns)
    }

    /// Render the schema back into the header grammar.
    pub fn to_header(&self, delimiter: char) -> String {
        let mut out = String::new();
        for (idx, column) in self.columns.iter().enumerate() {
            if idx > 0 {
                out.push(delimiter);
            }
            out.push_str(&column.name);
            out.push(':');
            out.push_str(column.column_type.name());
        }
        out
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[inline]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, position: usize) -> Option<&Column> {
        self.columns.get(position)
    }

    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_case_and_whitespace() {
        let schema = Schema::parse_header(" name : varchar,age:INT , population:Long\n", ',')
            .expect("parse");
        assert_eq!(schema.num_columns(), 3);
        assert_eq!(schema.column(0).unwrap().name(), "name");
        assert_eq!(schema.column(0).unwrap().column_type(), ColumnType::Varchar);
        assert_eq!(schema.column(1).unwrap().column_type(), ColumnType::Int);
        assert_eq!(schema.column(2).unwrap().column_type(), ColumnType::Long);
        assert_eq!(schema.position_of("population"), Some(2));
        assert_eq!(
            schema.to_header(','),
            "name:VARCHAR,age:INT,population:LONG"
        );
    }

    #[test]
    fn unknown_type_is_reported_with_column() {
        let err = Schema::parse_header("a:INT,b:FLOAT", ',').unwrap_err();
        match err {
            Error::UnknownColumnType { column, type_name } => {
                assert_eq!(column, "b");
                assert_eq!(type_name, "FLOAT");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn malformed_items_are_rejected() {
        assert!(matches!(
            Schema::parse_header("a:INT,b", ','),
            Err(Error::InvalidArgumentError(_))
        ));
        assert!(matches!(
            Schema::parse_header("a:INT,a:LONG", ','),
            Err(Error::InvalidArgumentError(_))
        ));
        assert!(matches!(
            Schema::parse_header(":INT", ','),
            Err(Error::InvalidArgumentError(_))
        ));
    }

    #[test]
    fn alternate_delimiter() {
        let schema = Schema::parse_header("k:LONG|v:VARCHAR", '|').unwrap();
        assert_eq!(schema.num_columns(), 2);
        assert_eq!(schema.to_header('|'), "k:LONG|v:VARCHAR");
    }
}
