//! Fixed-width index keys.

use std::fmt;

use tblload_result::{Error, Result};
use tblload_types::ColumnType;
use tblload_types::codec::{BeI32, BeI64, Codec, FixedSizeCodec};

/// Width class of the keys an index stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// 4-byte big-endian i32.
    Int,
    /// 8-byte big-endian i64.
    Long,
}

impl KeyType {
    pub fn key_len(self) -> usize {
        match self {
            KeyType::Int => BeI32::ENCODED_SIZE,
            KeyType::Long => BeI64::ENCODED_SIZE,
        }
    }

    /// One-byte tag persisted in the index meta page.
    pub fn tag(self) -> u8 {
        match self {
            KeyType::Int => b'i',
            KeyType::Long => b'l',
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'i' => Some(KeyType::Int),
            b'l' => Some(KeyType::Long),
            _ => None,
        }
    }
}

impl TryFrom<ColumnType> for KeyType {
    type Error = Error;

    fn try_from(column_type: ColumnType) -> Result<Self> {
        match column_type {
            ColumnType::Int => Ok(KeyType::Int),
            ColumnType::Long => Ok(KeyType::Long),
            ColumnType::Varchar => Err(Error::InvalidArgumentError(
                "VARCHAR columns cannot be indexed".into(),
            )),
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeyType::Int => "int",
            KeyType::Long => "long",
        })
    }
}

/// A decoded index key. Keys of one index always share a [`KeyType`], so the
/// derived ordering is plain numeric order within an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexKey {
    Int(i32),
    Long(i64),
}

impl IndexKey {
    pub fn key_type(&self) -> KeyType {
        match self {
            IndexKey::Int(_) => KeyType::Int,
            IndexKey::Long(_) => KeyType::Long,
        }
    }

    /// Decode exactly `key_type.key_len()` bytes.
    pub fn decode(key_type: KeyType, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != key_type.key_len() {
            return Err(Error::IndexFailure(format!(
                "{key_type} key must be {} bytes, got {}",
                key_type.key_len(),
                bytes.len()
            )));
        }
        Ok(match key_type {
            KeyType::Int => IndexKey::Int(BeI32::decode(bytes)?.0),
            KeyType::Long => IndexKey::Long(BeI64::decode(bytes)?.0),
        })
    }

    pub fn encode_into(&self, out: &mut Vec<u8>) {
        match *self {
            IndexKey::Int(v) => out.extend_from_slice(&v.to_be_bytes()),
            IndexKey::Long(v) => out.extend_from_slice(&v.to_be_bytes()),
        }
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKey::Int(v) => write!(f, "{v}"),
            IndexKey::Long(v) => write!(f, "{v}"),
        }
    }
}
