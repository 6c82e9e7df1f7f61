use super::*;
use crate::constants::{PAGE_CAPACITY, ROOT_PAGE_PKEY};
use crate::types::PhysicalKey;
use rustc_hash::FxHashMap;
use std::sync::{
    Arc, RwLock,
    atomic::{AtomicU64, Ordering},
};
use tblload_result::Error;

/// In-memory pager used for tests and dry runs.
#[allow(clippy::module_name_repetitions)]
pub struct MemPager {
    next_key: AtomicU64,
    page_capacity: usize,
    blobs: RwLock<FxHashMap<PhysicalKey, Arc<[u8]>>>,
}

impl Default for MemPager {
    fn default() -> Self {
        Self::new()
    }
}

impl MemPager {
    pub fn new() -> Self {
        Self::with_page_capacity(PAGE_CAPACITY)
    }

    /// Create a pager whose pages hold at most `page_capacity` bytes.
    pub fn with_page_capacity(page_capacity: usize) -> Self {
        Self {
            next_key: AtomicU64::new(ROOT_PAGE_PKEY + 1),
            page_capacity,
            blobs: RwLock::new(FxHashMap::default()),
        }
    }

    /// Number of live pages (for tests/tools).
    pub fn len(&self) -> usize {
        self.blobs.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> Error {
    Error::Internal("MemPager blobs lock poisoned".into())
}

impl Pager for MemPager {
    type Blob = Arc<[u8]>;

    fn alloc_many(&self, n: usize) -> Result<Vec<PhysicalKey>> {
        let n_u64 = n as u64;
        let start = self
            .next_key
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cur| {
                cur.checked_add(n_u64)
            })
            .map_err(|_| Error::Internal("physical key space overflow".to_string()))?;
        Ok((start..start + n_u64).collect())
    }

    fn batch_put(&self, puts: &[BatchPut]) -> Result<()> {
        let mut map = self.blobs.write().map_err(|_| poisoned())?;
        for p in puts {
            match p {
                BatchPut::Raw { key, bytes } => {
                    if bytes.len() > self.page_capacity {
                        return Err(Error::InvalidArgumentError(format!(
                            "page {key}: payload of {} bytes exceeds page capacity {}",
                            bytes.len(),
                            self.page_capacity
                        )));
                    }
                    map.insert(*key, Arc::from(bytes.as_slice()));
                    self.next_key
                        .fetch_max(key.saturating_add(1), Ordering::Relaxed);
                }
            }
        }
        Ok(())
    }

    fn batch_get(&self, gets: &[BatchGet]) -> Result<Vec<GetResult<Self::Blob>>> {
        let map = self.blobs.read().map_err(|_| poisoned())?;
        let mut out = Vec::with_capacity(gets.len());
        for g in gets {
            match *g {
                BatchGet::Raw { key } => {
                    if let Some(b) = map.get(&key) {
                        out.push(GetResult::Raw {
                            key,
                            bytes: Arc::clone(b),
                        });
                    } else {
                        out.push(GetResult::Missing { key });
                    }
                }
            }
        }
        Ok(out)
    }

    fn free_many(&self, keys: &[PhysicalKey]) -> Result<()> {
        let mut map = self.blobs.write().map_err(|_| poisoned())?;
        for &k in keys {
            map.remove(&k);
        }
        Ok(())
    }

    fn page_capacity(&self) -> usize {
        self.page_capacity
    }
}
