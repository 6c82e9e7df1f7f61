//! Pager backed by `simd_r_drive::DataStore`.
//!
//! - Zero-copy reads: returns `EntryHandle` blobs.
//! - Persistent backing file via SIMD R Drive; page keys are stored as
//!   prehashed keys, so a key is its own address.
//! - Key allocator is initialized by scanning existing entries once on open.
//! - Payloads are capped at [`PAGE_CAPACITY`] before they reach the
//!   datastore, which itself has no notion of a page.

use super::{BatchGet, BatchPut, GetResult, Pager};
use crate::constants::{PAGE_CAPACITY, ROOT_PAGE_PKEY};
use crate::types::PhysicalKey;

use simd_r_drive::{
    DataStore,
    traits::{DataStoreReader, DataStoreWriter},
};
use simd_r_drive_entry_handle::EntryHandle;
use tblload_result::{Error, Result};

use std::fmt;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

pub struct SimdRDrivePager {
    ds: DataStore,
    path: PathBuf,
    next_key: AtomicU64,
}

impl fmt::Debug for SimdRDrivePager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let next = self.next_key.load(Ordering::Relaxed);
        f.debug_struct("SimdRDrivePager")
            .field("path", &self.path)
            .field("next_key", &next)
            .finish()
    }
}

impl SimdRDrivePager {
    /// Open (or create) a SIMD R Drive datastore at `path` and seed
    /// the allocator by scanning existing entries.
    pub fn open(path: &Path) -> Result<Self> {
        let ds = DataStore::open(path)
            .map_err(|e| Error::Io(io::Error::other(format!("open DataStore failed: {e}"))))?;

        // Start after the largest live key, and never hand out the root key.
        let mut max_key = ROOT_PAGE_PKEY;
        for eh in ds.iter_entries() {
            let k = eh.key_hash();
            if k > max_key {
                max_key = k;
            }
        }

        Ok(Self {
            ds,
            path: path.to_path_buf(),
            next_key: AtomicU64::new(max_key.saturating_add(1)),
        })
    }

    /// Open a datastore that must already exist.
    pub fn open_existing(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::Io(io::Error::new(
                ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )));
        }
        Self::open(path)
    }

    /// Create a new, empty datastore. Fails if `path` already exists.
    pub fn create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Err(Error::Io(io::Error::new(
                ErrorKind::AlreadyExists,
                format!("{} already exists", path.display()),
            )));
        }
        tracing::debug!(path = %path.display(), "creating page datastore");
        Self::open(path)
    }
}

impl Pager for SimdRDrivePager {
    type Blob = EntryHandle;

    fn alloc_many(&self, n: usize) -> Result<Vec<PhysicalKey>> {
        let n = u64::try_from(n)
            .map_err(|_| Error::Internal("alloc_many: n does not fit in u64".into()))?;

        let start = self
            .next_key
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cur| {
                cur.checked_add(n)
            })
            .map_err(|_| Error::Internal("physical key space overflow".into()))?;

        Ok((start..start + n).collect())
    }

    fn batch_put(&self, puts: &[BatchPut]) -> Result<()> {
        let mut entries: Vec<(u64, &[u8])> = Vec::with_capacity(puts.len());
        let mut max_key = None;
        for p in puts {
            match p {
                BatchPut::Raw { key, bytes } => {
                    if bytes.is_empty() {
                        return Err(Error::Internal("empty payload not allowed".into()));
                    }
                    if bytes.len() > PAGE_CAPACITY {
                        return Err(Error::InvalidArgumentError(format!(
                            "page {key}: payload of {} bytes exceeds page capacity {PAGE_CAPACITY}",
                            bytes.len()
                        )));
                    }
                    entries.push((*key, bytes.as_slice()));
                    max_key = max_key.max(Some(*key));
                }
            }
        }
        if entries.is_empty() {
            return Ok(());
        }

        self.ds
            .batch_write_with_key_hashes(entries, false)
            .map_err(|e| Error::Io(io::Error::other(format!("DataStore write failed: {e}"))))?;

        // Keys written directly (the root, index leaves) must never be
        // handed out by the allocator afterwards.
        if let Some(max) = max_key {
            self.next_key
                .fetch_max(max.saturating_add(1), Ordering::Relaxed);
        }
        Ok(())
    }

    fn batch_get(&self, gets: &[BatchGet]) -> Result<Vec<GetResult<Self::Blob>>> {
        let mut out = Vec::with_capacity(gets.len());
        for g in gets {
            match *g {
                BatchGet::Raw { key } => {
                    match self.ds.read_with_key_hash(key).map_err(|e| {
                        Error::Io(io::Error::other(format!("DataStore read failed: {e}")))
                    })? {
                        Some(h) => out.push(GetResult::Raw { key, bytes: h }),
                        None => out.push(GetResult::Missing { key }),
                    }
                }
            }
        }
        Ok(out)
    }

    fn free_many(&self, keys: &[PhysicalKey]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        self.ds
            .batch_delete_key_hashes(keys)
            .map_err(|e| Error::Io(io::Error::other(format!("DataStore delete failed: {e}"))))?;
        Ok(())
    }

    fn page_capacity(&self) -> usize {
        PAGE_CAPACITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn bytes(blob: Option<EntryHandle>) -> Option<Vec<u8>> {
        blob.map(|h| AsRef::<[u8]>::as_ref(&h).to_vec())
    }

    #[test]
    fn oversized_and_empty_payloads_are_rejected() {
        let tmp = TempDir::new().expect("tempdir");
        let pager = SimdRDrivePager::create(&tmp.path().join("big.db")).expect("create");

        let err = pager.put_one(1, vec![7u8; PAGE_CAPACITY + 1]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgumentError(_)));
        let err = pager.put_one(1, Vec::new()).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
        assert!(pager.get_one(1).unwrap().is_none());

        pager.put_one(1, vec![7u8; PAGE_CAPACITY]).unwrap();
        assert_eq!(bytes(pager.get_one(1).unwrap()).map(|b| b.len()), Some(PAGE_CAPACITY));
    }

    #[test]
    fn create_refuses_existing_file_and_open_existing_refuses_missing() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("once.db");
        assert!(SimdRDrivePager::open_existing(&path).is_err());
        assert!(!path.exists());

        drop(SimdRDrivePager::create(&path).expect("create"));
        assert!(SimdRDrivePager::create(&path).is_err());
        assert!(SimdRDrivePager::open_existing(&path).is_ok());
    }

    #[test]
    fn directly_written_keys_are_never_allocated() {
        let tmp = TempDir::new().expect("tempdir");
        let pager = SimdRDrivePager::create(&tmp.path().join("sparse.db")).expect("create");

        pager.put_one(ROOT_PAGE_PKEY, b"root".to_vec()).unwrap();
        pager.put_one(3, b"three".to_vec()).unwrap();

        assert!(pager.get_one(2).unwrap().is_none());
        assert_eq!(bytes(pager.get_one(3).unwrap()), Some(b"three".to_vec()));
        assert_eq!(pager.alloc_many(1).unwrap(), vec![4]);
    }

    #[test]
    fn freed_pages_stay_missing_after_reopen() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("freed.db");
        {
            let pager = SimdRDrivePager::create(&path).expect("create");
            pager.put_one(1, b"keep".to_vec()).unwrap();
            pager.put_one(2, b"drop".to_vec()).unwrap();
            pager.free_many(&[2]).unwrap();
        }
        let pager = SimdRDrivePager::open_existing(&path).expect("reopen");
        assert!(pager.get_one(2).unwrap().is_none());
        assert_eq!(bytes(pager.get_one(1).unwrap()), Some(b"keep".to_vec()));
    }
}
