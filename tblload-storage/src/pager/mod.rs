//! Minimal pager trait plus in-memory and SIMD R Drive implementations.
//!
//! Blobs are cheap to clone (`Arc<[u8]>` in memory, `EntryHandle` on disk),
//! so cached pages can be shared without copying.

use crate::types::PhysicalKey;
use tblload_result::Result;

pub mod simd_r_drive_pager;
pub use simd_r_drive_pager::*;

pub mod mem_pager;
pub use mem_pager::*;

#[derive(Clone, Debug)]
pub enum BatchPut {
    Raw { key: PhysicalKey, bytes: Vec<u8> },
}

#[derive(Clone, Debug)]
pub enum BatchGet {
    Raw { key: PhysicalKey },
}

#[derive(Clone, Debug)]
pub enum GetResult<B> {
    Raw { key: PhysicalKey, bytes: B },
    Missing { key: PhysicalKey },
}

pub trait Pager: Send + Sync + 'static {
    type Blob: AsRef<[u8]> + Clone + Send + Sync + 'static;

    /// Allocate `n` new physical keys. Never returns the root key.
    fn alloc_many(&self, n: usize) -> Result<Vec<PhysicalKey>>;

    /// Batch get blobs; returns one `GetResult` per request in order.
    fn batch_get(&self, gets: &[BatchGet]) -> Result<Vec<GetResult<Self::Blob>>>;

    /// Batch put blobs at fixed keys. Payloads larger than
    /// [`Pager::page_capacity`] are rejected, and persistent pagers also
    /// reject empty payloads.
    fn batch_put(&self, puts: &[BatchPut]) -> Result<()>;

    /// Batch free physical keys. Unknown keys are ignored.
    fn free_many(&self, keys: &[PhysicalKey]) -> Result<()>;

    /// Largest payload one page accepts.
    fn page_capacity(&self) -> usize;

    /// Make previous writes durable. No-op for ephemeral pagers.
    fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Convenience single-key read.
    fn get_one(&self, key: PhysicalKey) -> Result<Option<Self::Blob>> {
        let mut got = self.batch_get(&[BatchGet::Raw { key }])?;
        Ok(match got.pop() {
            Some(GetResult::Raw { bytes, .. }) => Some(bytes),
            _ => None,
        })
    }

    /// Convenience single-key write.
    fn put_one(&self, key: PhysicalKey, bytes: Vec<u8>) -> Result<()> {
        self.batch_put(&[BatchPut::Raw { key, bytes }])
    }
}
