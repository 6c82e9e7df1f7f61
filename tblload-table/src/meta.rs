//! Root page of a primary store.
//!
//! ```text
//! bytes 0..4   : MAGIC = b"TBL1"
//! bytes 4..12  : live record count (u64 BE)
//! bytes 12..20 : first data page key (u64 BE, 0 = none)
//! bytes 20..28 : last data page key (u64 BE, 0 = none)
//! bytes 28..30 : column count (u16 BE)
//! then per column: [type tag: u8][name: VARCHAR encoding]
//! ```

use tblload_result::{Error, Result};
use tblload_storage::PhysicalKey;
use tblload_types::codec::{Codec, LenPrefixedStr};
use tblload_types::{Column, ColumnType, Schema};

use crate::page::NO_PAGE;

const MAGIC: [u8; 4] = *b"TBL1";
const FIXED_LEN: usize = 30;

const TAG_VARCHAR: u8 = b'v';
const TAG_INT: u8 = b'i';
const TAG_LONG: u8 = b'l';

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TableMeta {
    pub(crate) record_count: u64,
    pub(crate) first_page: PhysicalKey,
    pub(crate) last_page: PhysicalKey,
    pub(crate) schema: Schema,
}

impl TableMeta {
    pub(crate) fn empty(schema: Schema) -> Self {
        Self {
            record_count: 0,
            first_page: NO_PAGE,
            last_page: NO_PAGE,
            schema,
        }
    }

    pub(crate) fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(FIXED_LEN + 16 * self.schema.num_columns());
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&self.record_count.to_be_bytes());
        out.extend_from_slice(&self.first_page.to_be_bytes());
        out.extend_from_slice(&self.last_page.to_be_bytes());
        let count = u16::try_from(self.schema.num_columns())
            .map_err(|_| Error::StorageFailure("schema has too many columns".into()))?;
        out.extend_from_slice(&count.to_be_bytes());
        for column in self.schema.columns() {
            out.push(match column.column_type() {
                ColumnType::Varchar => TAG_VARCHAR,
                ColumnType::Int => TAG_INT,
                ColumnType::Long => TAG_LONG,
            });
            let start = out.len();
            out.resize(start + LenPrefixedStr::encoded_len(column.name()), 0);
            LenPrefixedStr::encode_at(&mut out[start..], column.name())?;
        }
        Ok(out)
    }

    pub(crate) fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < FIXED_LEN || bytes[..4] != MAGIC {
            return Err(Error::Corrupt("primary store root page has no TBL1 header".into()));
        }
        let u64_at = |pos: usize| {
            let mut b = [0u8; 8];
            b.copy_from_slice(&bytes[pos..pos + 8]);
            u64::from_be_bytes(b)
        };
        let record_count = u64_at(4);
        let first_page = u64_at(12);
        let last_page = u64_at(20);
        let count = u16::from_be_bytes([bytes[28], bytes[29]]) as usize;

        let mut columns = Vec::with_capacity(count);
        let mut pos = FIXED_LEN;
        for _ in 0..count {
            let tag = *bytes
                .get(pos)
                .ok_or_else(|| Error::Corrupt("root page column list is truncated".into()))?;
            let column_type = match tag {
                TAG_VARCHAR => ColumnType::Varchar,
                TAG_INT => ColumnType::Int,
                TAG_LONG => ColumnType::Long,
                other => {
                    return Err(Error::Corrupt(format!(
                        "root page has unknown column tag {other:#04x}"
                    )));
                }
            };
            let (name, used) = LenPrefixedStr::decode(&bytes[pos + 1..])?;
            columns.push(Column::new(name, column_type));
            pos += 1 + used;
        }
        if pos != bytes.len() {
            return Err(Error::Corrupt("root page has trailing bytes".into()));
        }
        Ok(Self {
            record_count,
            first_page,
            last_page,
            schema: Schema::new(columns)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_roundtrip() {
        let schema = Schema::parse_header("name:VARCHAR,age:INT,population:LONG", ',').unwrap();
        let meta = TableMeta {
            record_count: 17,
            first_page: 1,
            last_page: 5,
            schema,
        };
        let bytes = meta.encode().unwrap();
        assert_eq!(&bytes[..4], b"TBL1");
        assert_eq!(TableMeta::decode(&bytes).unwrap(), meta);
    }

    #[test]
    fn foreign_root_page_is_corrupt() {
        assert!(matches!(
            TableMeta::decode(b"IDX1 not a table root page at all"),
            Err(Error::Corrupt(_))
        ));
    }
}
