//! On-page layout of an index artifact.
//!
//! ```text
//! meta (key 0): [MAGIC "IDX1"][key tag u8][key_len u8][attribute u32 BE]
//!               [entry_count u64 BE][leaf_count u64 BE]
//! leaf (1..=n): [entry_count u16 BE]([key: key_len bytes][rid: 10 bytes])*
//! ```
//!
//! Leaves are contiguous at keys `1..=leaf_count` and hold entries in
//! ascending `(key, rid)` order across the whole run.

use tblload_result::{Error, Result};
use tblload_types::RecordId;

use crate::key::{IndexKey, KeyType};

const MAGIC: [u8; 4] = *b"IDX1";
pub(crate) const META_LEN: usize = 26;
const LEAF_HEADER: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IndexMeta {
    pub(crate) key_type: KeyType,
    pub(crate) attribute: u32,
    pub(crate) entry_count: u64,
    pub(crate) leaf_count: u64,
}

impl IndexMeta {
    pub(crate) fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(META_LEN);
        out.extend_from_slice(&MAGIC);
        out.push(self.key_type.tag());
        out.push(self.key_type.key_len() as u8);
        out.extend_from_slice(&self.attribute.to_be_bytes());
        out.extend_from_slice(&self.entry_count.to_be_bytes());
        out.extend_from_slice(&self.leaf_count.to_be_bytes());
        out
    }

    pub(crate) fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != META_LEN || bytes[..4] != MAGIC {
            return Err(Error::Corrupt("index meta page has no IDX1 header".into()));
        }
        let key_type = KeyType::from_tag(bytes[4]).ok_or_else(|| {
            Error::Corrupt(format!("index meta page has unknown key tag {:#04x}", bytes[4]))
        })?;
        if bytes[5] as usize != key_type.key_len() {
            return Err(Error::Corrupt(format!(
                "index meta page declares {}-byte {key_type} keys",
                bytes[5]
            )));
        }
        let mut attr = [0u8; 4];
        attr.copy_from_slice(&bytes[6..10]);
        let mut entries = [0u8; 8];
        entries.copy_from_slice(&bytes[10..18]);
        let mut leaves = [0u8; 8];
        leaves.copy_from_slice(&bytes[18..26]);
        Ok(Self {
            key_type,
            attribute: u32::from_be_bytes(attr),
            entry_count: u64::from_be_bytes(entries),
            leaf_count: u64::from_be_bytes(leaves),
        })
    }
}

/// How many entries of `key_type` fit in one leaf of `page_capacity` bytes.
pub(crate) fn entries_per_leaf(key_type: KeyType, page_capacity: usize) -> usize {
    let per = key_type.key_len() + RecordId::ENCODED_SIZE;
    (page_capacity.saturating_sub(LEAF_HEADER) / per).min(u16::MAX as usize)
}

pub(crate) fn encode_leaf(entries: &[(IndexKey, RecordId)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(entries.len() as u16).to_be_bytes());
    for (key, rid) in entries {
        key.encode_into(&mut out);
        rid.encode_into(&mut out);
    }
    out
}

pub(crate) fn decode_leaf(key_type: KeyType, bytes: &[u8]) -> Result<Vec<(IndexKey, RecordId)>> {
    if bytes.len() < LEAF_HEADER {
        return Err(Error::Corrupt("index leaf is truncated".into()));
    }
    let count = u16::from_be_bytes([bytes[0], bytes[1]]) as usize;
    let key_len = key_type.key_len();
    let per = key_len + RecordId::ENCODED_SIZE;
    if bytes.len() != LEAF_HEADER + count * per {
        return Err(Error::Corrupt(format!(
            "index leaf claims {count} entries in {} bytes",
            bytes.len()
        )));
    }
    bytes[LEAF_HEADER..]
        .chunks_exact(per)
        .map(|chunk| {
            let key = IndexKey::decode(key_type, &chunk[..key_len])?;
            let rid = RecordId::decode(&chunk[key_len..])?;
            Ok((key, rid))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_layout() {
        let meta = IndexMeta {
            key_type: KeyType::Long,
            attribute: 2,
            entry_count: 3,
            leaf_count: 1,
        };
        let bytes = meta.encode();
        assert_eq!(bytes.len(), META_LEN);
        assert_eq!(&bytes[..6], b"IDX1l\x08");
        assert_eq!(IndexMeta::decode(&bytes).unwrap(), meta);

        let mut bad = bytes.clone();
        bad[5] = 4;
        assert!(IndexMeta::decode(&bad).is_err());
    }

    #[test]
    fn leaf_capacity() {
        // (4096 - 2) / (8 + 10)
        assert_eq!(entries_per_leaf(KeyType::Long, 4096), 227);
        assert_eq!(entries_per_leaf(KeyType::Int, 16), 1);
    }

    #[test]
    fn leaf_decode_rejects_short_payload() {
        let entries = vec![(IndexKey::Int(5), RecordId::new(1, 0))];
        let mut bytes = encode_leaf(&entries);
        assert_eq!(decode_leaf(KeyType::Int, &bytes).unwrap(), entries);
        bytes.pop();
        assert!(decode_leaf(KeyType::Int, &bytes).is_err());
    }
}
