//! Slotted heap page used for primary-store records.
//!
//! ```text
//! [next_page: u64 BE][slot_count: u16 BE]
//! [live: u8][len: u16 BE][record bytes] * slot_count
//! ```
//!
//! Slots are append-only. Removing a record clears its `live` flag but keeps
//! the slot, so every [`RecordId`](tblload_types::RecordId) handed out stays
//! stable for the life of the page.

use tblload_result::{Error, Result};
use tblload_storage::PhysicalKey;

pub(crate) const PAGE_HEADER_SIZE: usize = 10;
pub(crate) const SLOT_HEADER_SIZE: usize = 3;

/// Sentinel for "no next page".
pub(crate) const NO_PAGE: PhysicalKey = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Slot {
    live: bool,
    bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DataPage {
    next: PhysicalKey,
    slots: Vec<Slot>,
    encoded_len: usize,
}

impl DataPage {
    pub(crate) fn new() -> Self {
        Self {
            next: NO_PAGE,
            slots: Vec::new(),
            encoded_len: PAGE_HEADER_SIZE,
        }
    }

    /// Largest record a page of `capacity` bytes can hold on its own.
    pub(crate) fn max_record_len(capacity: usize) -> usize {
        capacity.saturating_sub(PAGE_HEADER_SIZE + SLOT_HEADER_SIZE)
    }

    pub(crate) fn next(&self) -> PhysicalKey {
        self.next
    }

    pub(crate) fn set_next(&mut self, next: PhysicalKey) {
        self.next = next;
    }

    pub(crate) fn fits(&self, record_len: usize, capacity: usize) -> bool {
        self.slots.len() < u16::MAX as usize
            && self.encoded_len + SLOT_HEADER_SIZE + record_len <= capacity
    }

    /// Append a record and return its slot number. Callers check [`fits`]
    /// first.
    ///
    /// [`fits`]: DataPage::fits
    pub(crate) fn push(&mut self, record: &[u8]) -> u16 {
        let slot = self.slots.len() as u16;
        self.slots.push(Slot {
            live: true,
            bytes: record.to_vec(),
        });
        self.encoded_len += SLOT_HEADER_SIZE + record.len();
        slot
    }

    pub(crate) fn get(&self, slot: u16) -> Option<&[u8]> {
        self.slots
            .get(slot as usize)
            .filter(|s| s.live)
            .map(|s| s.bytes.as_slice())
    }

    /// Clear the live flag of `slot`. Returns whether a live record was removed.
    pub(crate) fn kill(&mut self, slot: u16) -> bool {
        match self.slots.get_mut(slot as usize) {
            Some(s) if s.live => {
                s.live = false;
                true
            }
            _ => false,
        }
    }

    /// Live records in slot order.
    pub(crate) fn live(&self) -> impl Iterator<Item = (u16, &[u8])> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.live)
            .map(|(i, s)| (i as u16, s.bytes.as_slice()))
    }

    pub(crate) fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len);
        out.extend_from_slice(&self.next.to_be_bytes());
        out.extend_from_slice(&(self.slots.len() as u16).to_be_bytes());
        for slot in &self.slots {
            out.push(u8::from(slot.live));
            out.extend_from_slice(&(slot.bytes.len() as u16).to_be_bytes());
            out.extend_from_slice(&slot.bytes);
        }
        debug_assert_eq!(out.len(), self.encoded_len);
        out
    }

    pub(crate) fn decode(key: PhysicalKey, bytes: &[u8]) -> Result<Self> {
        let corrupt = |what: &str| Error::Corrupt(format!("data page {key}: {what}"));
        if bytes.len() < PAGE_HEADER_SIZE {
            return Err(corrupt("truncated header"));
        }
        let mut next = [0u8; 8];
        next.copy_from_slice(&bytes[..8]);
        let count = u16::from_be_bytes([bytes[8], bytes[9]]) as usize;

        let mut slots = Vec::with_capacity(count);
        let mut pos = PAGE_HEADER_SIZE;
        for _ in 0..count {
            let header = bytes
                .get(pos..pos + SLOT_HEADER_SIZE)
                .ok_or_else(|| corrupt("truncated slot header"))?;
            let live = match header[0] {
                0 => false,
                1 => true,
                _ => return Err(corrupt("invalid live flag")),
            };
            let len = u16::from_be_bytes([header[1], header[2]]) as usize;
            pos += SLOT_HEADER_SIZE;
            let body = bytes
                .get(pos..pos + len)
                .ok_or_else(|| corrupt("truncated record"))?;
            slots.push(Slot {
                live,
                bytes: body.to_vec(),
            });
            pos += len;
        }
        if pos != bytes.len() {
            return Err(corrupt("trailing bytes"));
        }
        Ok(Self {
            next: u64::from_be_bytes(next),
            slots,
            encoded_len: pos,
        })
    }
}
