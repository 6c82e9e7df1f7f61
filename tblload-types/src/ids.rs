//! Identifiers shared across tblload crates.

use std::fmt;

use tblload_result::{Error, Result};

/// Opaque locator of a record inside the primary store.
///
/// Only the primary store interprets `page` and `slot`. The loader passes the
/// value through to the secondary index untouched, and the index persists it
/// in its fixed [`RecordId::ENCODED_SIZE`]-byte wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    pub page: u64,
    pub slot: u16,
}

impl RecordId {
    pub const ENCODED_SIZE: usize = 10;

    #[inline]
    pub const fn new(page: u64, slot: u16) -> Self {
        Self { page, slot }
    }

    /// Append the wire form (page BE, slot BE) to `out`.
    #[inline]
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.page.to_be_bytes());
        out.extend_from_slice(&self.slot.to_be_bytes());
    }

    pub fn decode(src: &[u8]) -> Result<Self> {
        let bytes = src
            .get(..Self::ENCODED_SIZE)
            .ok_or_else(|| Error::Corrupt(format!("record id needs 10 bytes, have {}", src.len())))?;
        let mut page = [0u8; 8];
        page.copy_from_slice(&bytes[..8]);
        let mut slot = [0u8; 2];
        slot.copy_from_slice(&bytes[8..]);
        Ok(Self {
            page: u64::from_be_bytes(page),
            slot: u16::from_be_bytes(slot),
        })
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.page, self.slot)
    }
}
