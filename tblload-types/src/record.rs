//! Schema-driven record encoding.
//!
//! A record is the concatenation of its field encodings in schema order (see
//! [`crate::codec`]). No field boundaries are stored outside the fields
//! themselves, so [`decode_record`] walks the schema left to right and must
//! consume the input exactly.

use tblload_result::{Error, Result};

use crate::codec::{BeI32, BeI64, Codec, LenPrefixedStr};
use crate::schema::{Column, ColumnType, Schema};

/// Default record buffer capacity: the usable payload of one storage page.
pub const DEFAULT_RECORD_CAPACITY: usize = 4000;

/// Upper bound on any record buffer so every VARCHAR that fits also fits the
/// 2-byte length prefix.
pub const MAX_RECORD_CAPACITY: usize = u16::MAX as usize;

/// Bounded, reusable destination for one encoded record.
#[derive(Debug, Clone)]
pub struct RecordBuffer {
    bytes: Vec<u8>,
    capacity: usize,
}

impl RecordBuffer {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 || capacity > MAX_RECORD_CAPACITY {
            return Err(Error::InvalidArgumentError(format!(
                "record capacity must be between 1 and {MAX_RECORD_CAPACITY}, got {capacity}"
            )));
        }
        Ok(Self {
            bytes: Vec::with_capacity(capacity),
            capacity,
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.bytes.len()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Append one field with codec `C`, failing with
    /// [`Error::EncodingOverflow`] instead of truncating.
    pub fn append<C: Codec>(&mut self, column: &str, value: C::Borrowed<'_>) -> Result<usize> {
        let needed = C::encoded_len(value);
        let remaining = self.remaining();
        if needed > remaining {
            return Err(Error::EncodingOverflow {
                column: column.to_string(),
                needed,
                remaining,
            });
        }
        let start = self.bytes.len();
        self.bytes.resize(start + needed, 0);
        C::encode_at(&mut self.bytes[start..], value)
    }
}

impl Default for RecordBuffer {
    fn default() -> Self {
        Self {
            bytes: Vec::with_capacity(DEFAULT_RECORD_CAPACITY),
            capacity: DEFAULT_RECORD_CAPACITY,
        }
    }
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Varchar(String),
    Int(i32),
    Long(i64),
}

impl Value {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Varchar(_) => ColumnType::Varchar,
            Value::Int(_) => ColumnType::Int,
            Value::Long(_) => ColumnType::Long,
        }
    }
}

fn invalid_integer(column: &Column, raw: &str, err: std::num::ParseIntError) -> Error {
    Error::InvalidFieldValue {
        column: column.name().to_string(),
        value: raw.to_string(),
        reason: err.to_string(),
    }
}

fn parse_int(column: &Column, raw: &str) -> Result<i32> {
    raw.trim()
        .parse::<i32>()
        .map_err(|err| invalid_integer(column, raw, err))
}

fn parse_long(column: &Column, raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|err| invalid_integer(column, raw, err))
}

/// Encode `fields` into `buffer` according to `schema`.
///
/// The buffer is cleared first; on success it holds exactly the returned
/// number of bytes, written from offset 0.
///
/// # Errors
///
/// - [`Error::SchemaMismatch`] (with `line` 0) when the field count differs
///   from the column count. Loaders check arity with the real line number
///   before calling this.
/// - [`Error::InvalidFieldValue`] when an INT/LONG field does not parse.
/// - [`Error::EncodingOverflow`] when a field does not fit the remaining
///   capacity.
pub fn encode_record<S: AsRef<str>>(
    schema: &Schema,
    fields: &[S],
    buffer: &mut RecordBuffer,
) -> Result<usize> {
    if fields.len() != schema.num_columns() {
        return Err(Error::SchemaMismatch {
            line: 0,
            expected: schema.num_columns(),
            found: fields.len(),
        });
    }

    buffer.clear();
    let mut total = 0usize;
    for (column, raw) in schema.columns().iter().zip(fields) {
        let raw = raw.as_ref();
        total += match column.column_type() {
            ColumnType::Varchar => buffer.append::<LenPrefixedStr>(column.name(), raw)?,
            ColumnType::Int => buffer.append::<BeI32>(column.name(), parse_int(column, raw)?)?,
            ColumnType::Long => buffer.append::<BeI64>(column.name(), parse_long(column, raw)?)?,
        };
    }
    debug_assert_eq!(total, buffer.len());
    Ok(total)
}

/// Encode a single INT or LONG field as a fixed-width key.
///
/// The bytes match the column's encoding inside a record.
///
/// # Errors
///
/// [`Error::InvalidArgumentError`] for VARCHAR columns, which have no
/// fixed-width form, and [`Error::InvalidFieldValue`] for unparsable text.
pub fn encode_fixed_field(column: &Column, raw: &str) -> Result<Vec<u8>> {
    match column.column_type() {
        ColumnType::Int => Ok(parse_int(column, raw)?.to_be_bytes().to_vec()),
        ColumnType::Long => Ok(parse_long(column, raw)?.to_be_bytes().to_vec()),
        ColumnType::Varchar => Err(Error::InvalidArgumentError(format!(
            "column '{}' is VARCHAR and has no fixed-width key encoding",
            column.name()
        ))),
    }
}

/// Decode a record by replaying `schema` over `bytes`.
///
/// # Errors
///
/// [`Error::Corrupt`] when a field is truncated or bytes remain after the
/// last column.
pub fn decode_record(schema: &Schema, bytes: &[u8]) -> Result<Vec<Value>> {
    let mut values = Vec::with_capacity(schema.num_columns());
    let mut pos = 0usize;
    for column in schema.columns() {
        let rest = &bytes[pos..];
        let (value, used) = match column.column_type() {
            ColumnType::Varchar => {
                let (v, n) = LenPrefixedStr::decode(rest)?;
                (Value::Varchar(v), n)
            }
            ColumnType::Int => {
                let (v, n) = BeI32::decode(rest)?;
                (Value::Int(v), n)
            }
            ColumnType::Long => {
                let (v, n) = BeI64::decode(rest)?;
                (Value::Long(v), n)
            }
        };
        values.push(value);
        pos += used;
    }
    if pos != bytes.len() {
        return Err(Error::Corrupt(format!(
            "record has {} trailing bytes after {} columns",
            bytes.len() - pos,
            schema.num_columns()
        )));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn city_schema() -> Schema {
        Schema::parse_header("name:VARCHAR,age:INT,population:LONG", ',').unwrap()
    }

    #[test]
    fn springfield_layout() {
        let schema = city_schema();
        let mut buf = RecordBuffer::default();
        let n = encode_record(&schema, &["Springfield", "12", "30000"], &mut buf).unwrap();

        let mut expected = vec![0u8, 11];
        expected.extend_from_slice(b"Springfield");
        expected.extend_from_slice(&12i32.to_be_bytes());
        expected.extend_from_slice(&30_000i64.to_be_bytes());

        assert_eq!(n, 2 + 11 + 4 + 8);
        assert_eq!(buf.as_bytes(), expected.as_slice());
    }

    #[test]
    fn roundtrip_including_empty_and_extremes() {
        let schema = city_schema();
        let mut buf = RecordBuffer::default();
        let rows: [[&str; 3]; 3] = [
            ["", "0", "0"],
            ["Ünïcödé town", "-2147483648", "-9223372036854775808"],
            ["x", "2147483647", "9223372036854775807"],
        ];
        for row in rows {
            encode_record(&schema, &row, &mut buf).unwrap();
            let values = decode_record(&schema, buf.as_bytes()).unwrap();
            assert_eq!(values[0], Value::Varchar(row[0].to_string()));
            assert_eq!(values[1], Value::Int(row[1].parse().unwrap()));
            assert_eq!(values[2], Value::Long(row[2].parse().unwrap()));
        }
    }

    #[test]
    fn length_accounting_exhausts_bytes() {
        let schema = city_schema();
        let mut buf = RecordBuffer::default();
        let n = encode_record(&schema, &["abcd", "1", "2"], &mut buf).unwrap();
        assert_eq!(n, (2 + 4) + 4 + 8);

        // One stray byte past the last column is detected.
        let mut padded = buf.as_bytes().to_vec();
        padded.push(0);
        assert!(matches!(
            decode_record(&schema, &padded),
            Err(Error::Corrupt(_))
        ));
        assert!(matches!(
            decode_record(&schema, &buf.as_bytes()[..n - 1]),
            Err(Error::Corrupt(_))
        ));
    }

    #[test]
    fn overflow_is_an_error_not_a_truncation() {
        let schema = city_schema();
        let mut buf = RecordBuffer::new(32).unwrap();
        let long_name = "y".repeat(40);
        let err = encode_record(&schema, &[long_name.as_str(), "1", "2"], &mut buf).unwrap_err();
        match err {
            Error::EncodingOverflow {
                column,
                needed,
                remaining,
            } => {
                assert_eq!(column, "name");
                assert_eq!(needed, 42);
                assert_eq!(remaining, 32);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // Fits the string, but the trailing LONG no longer does.
        let name = "z".repeat(20);
        let err = encode_record(&schema, &[name.as_str(), "1", "2"], &mut buf).unwrap_err();
        assert!(matches!(err, Error::EncodingOverflow { ref column, .. } if column == "population"));
    }

    #[test]
    fn arity_and_value_errors() {
        let schema = city_schema();
        let mut buf = RecordBuffer::default();
        assert!(matches!(
            encode_record(&schema, &["a", "1"], &mut buf),
            Err(Error::SchemaMismatch {
                expected: 3,
                found: 2,
                ..
            })
        ));
        assert!(matches!(
            encode_record(&schema, &["a", "twelve", "1"], &mut buf),
            Err(Error::InvalidFieldValue { ref column, .. }) if column == "age"
        ));
        // INT range is enforced rather than wrapped.
        assert!(encode_record(&schema, &["a", "2147483648", "1"], &mut buf).is_err());
    }

    #[test]
    fn fixed_field_matches_record_bytes() {
        let schema = city_schema();
        let pop = schema.column(2).unwrap();
        assert_eq!(
            encode_fixed_field(pop, " 30000 ").unwrap(),
            30_000i64.to_be_bytes().to_vec()
        );
        let age = schema.column(1).unwrap();
        assert_eq!(encode_fixed_field(age, "12").unwrap(), vec![0, 0, 0, 12]);
        assert!(encode_fixed_field(schema.column(0).unwrap(), "x").is_err());
    }

    #[test]
    fn capacity_bounds() {
        assert!(RecordBuffer::new(0).is_err());
        assert!(RecordBuffer::new(MAX_RECORD_CAPACITY + 1).is_err());
        assert_eq!(RecordBuffer::new(16).unwrap().remaining(), 16);
    }
}
