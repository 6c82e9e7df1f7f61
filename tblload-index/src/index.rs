use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tblload_result::{Error, Result};
use tblload_storage::constants::ROOT_PAGE_PKEY;
use tblload_storage::{BatchPut, Pager, PhysicalKey, SimdRDrivePager};
use tblload_types::RecordId;

use crate::key::{IndexKey, KeyType};
use crate::page::{IndexMeta, decode_leaf, encode_leaf, entries_per_leaf};

/// File name of the index built over column `attribute` of `store`:
/// `"{store}.{attribute}"`.
///
/// ```
/// use std::path::Path;
/// use tblload_index::index_artifact_name;
///
/// assert_eq!(
///     index_artifact_name(Path::new("data.db"), 2),
///     Path::new("data.db.2")
/// );
/// ```
pub fn index_artifact_name(store: &Path, attribute: u32) -> PathBuf {
    let mut name = store.as_os_str().to_owned();
    name.push(format!(".{attribute}"));
    PathBuf::from(name)
}

/// Create an empty index for column `attribute` of `store`.
///
/// Fails with [`Error::IndexFailure`] if the artifact already exists. Returns
/// the artifact path.
pub fn create_index(store: &Path, attribute: u32, key_type: KeyType) -> Result<PathBuf> {
    let path = index_artifact_name(store, attribute);
    let pager = SimdRDrivePager::create(&path)
        .map_err(|e| Error::IndexFailure(format!("create {}: {e}", path.display())))?;
    IndexFile::create_with_pager(Arc::new(pager), attribute, key_type)?.close()?;
    tracing::debug!(
        target: "tblload-index",
        path = %path.display(),
        attribute,
        %key_type,
        "created index"
    );
    Ok(path)
}

/// Remove the index artifact `name`. Returns whether anything was removed;
/// a missing artifact is not an error.
pub fn destroy_index(name: &Path) -> Result<bool> {
    match fs::remove_file(name) {
        Ok(()) => {
            tracing::debug!(target: "tblload-index", path = %name.display(), "destroyed index");
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::IndexFailure(format!(
            "destroy {}: {e}",
            name.display()
        ))),
    }
}

/// Secondary index mapping fixed-width keys to record ids.
///
/// Entries are held in memory in `(key, rid)` order and written back as a
/// run of sorted leaves on [`IndexFile::flush`], [`IndexFile::close`], or
/// drop. Duplicate keys are allowed; each `(key, rid)` pair is stored once.
pub struct IndexFile<P: Pager = SimdRDrivePager> {
    pager: Arc<P>,
    meta: IndexMeta,
    entries: BTreeSet<(IndexKey, RecordId)>,
    dirty: bool,
    closed: bool,
}

impl IndexFile<SimdRDrivePager> {
    /// Open the index artifact `name` created by [`create_index`].
    pub fn open(name: &Path) -> Result<Self> {
        let pager = SimdRDrivePager::open_existing(name)
            .map_err(|e| Error::IndexFailure(format!("open {}: {e}", name.display())))?;
        Self::with_pager(Arc::new(pager))
    }
}

impl<P: Pager> IndexFile<P> {
    /// Initialize an empty index on `pager`. The pager must not already hold
    /// an index.
    pub fn create_with_pager(pager: Arc<P>, attribute: u32, key_type: KeyType) -> Result<Self> {
        if pager.get_one(ROOT_PAGE_PKEY).map_err(Error::index)?.is_some() {
            return Err(Error::IndexFailure("index already exists".into()));
        }
        if entries_per_leaf(key_type, pager.page_capacity()) == 0 {
            return Err(Error::IndexFailure(format!(
                "pages of {} bytes cannot hold a single {key_type} entry",
                pager.page_capacity()
            )));
        }
        let meta = IndexMeta {
            key_type,
            attribute,
            entry_count: 0,
            leaf_count: 0,
        };
        pager.put_one(ROOT_PAGE_PKEY, meta.encode()).map_err(Error::index)?;
        Ok(Self {
            pager,
            meta,
            entries: BTreeSet::new(),
            dirty: false,
            closed: false,
        })
    }

    /// Load an existing index from `pager`.
    pub fn with_pager(pager: Arc<P>) -> Result<Self> {
        let root = pager
            .get_one(ROOT_PAGE_PKEY)
            .map_err(Error::index)?
            .ok_or_else(|| Error::IndexFailure("pager holds no index meta page".into()))?;
        let meta = IndexMeta::decode(root.as_ref())?;

        let keys: Vec<PhysicalKey> = (1..=meta.leaf_count).collect();
        let mut entries = BTreeSet::new();
        for (key, blob) in keys.iter().zip(batch_read(pager.as_ref(), &keys)?) {
            let blob = blob.ok_or_else(|| Error::Corrupt(format!("index leaf {key} is missing")))?;
            entries.extend(decode_leaf(meta.key_type, blob.as_ref())?);
        }
        if entries.len() as u64 != meta.entry_count {
            return Err(Error::Corrupt(format!(
                "index meta records {} entries but leaves hold {}",
                meta.entry_count,
                entries.len()
            )));
        }
        Ok(Self {
            pager,
            meta,
            entries,
            dirty: false,
            closed: false,
        })
    }

    pub fn key_type(&self) -> KeyType {
        self.meta.key_type
    }

    /// Column position this index was built over.
    pub fn attribute(&self) -> u32 {
        self.meta.attribute
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add `(key, rid)`. `key_bytes` must be the big-endian encoding of a key
    /// of this index's type.
    pub fn insert_entry(&mut self, key_type: KeyType, key_bytes: &[u8], rid: RecordId) -> Result<()> {
        if key_type != self.meta.key_type {
            return Err(Error::IndexFailure(format!(
                "index holds {} keys, got a {key_type} key",
                self.meta.key_type
            )));
        }
        let key = IndexKey::decode(key_type, key_bytes)?;
        if self.entries.insert((key, rid)) {
            self.dirty = true;
        }
        Ok(())
    }

    /// All entries in ascending `(key, rid)` order.
    pub fn entries(&self) -> impl Iterator<Item = (IndexKey, RecordId)> + '_ {
        self.entries.iter().copied()
    }

    /// Record ids stored under `key`, in ascending order.
    pub fn lookup(&self, key: IndexKey) -> Vec<RecordId> {
        let lo = (key, RecordId::new(0, 0));
        let hi = (key, RecordId::new(u64::MAX, u16::MAX));
        self.entries.range(lo..=hi).map(|(_, rid)| *rid).collect()
    }

    /// Write dirty entries back as sorted leaves and sync the pager.
    pub fn flush(&mut self) -> Result<()> {
        if self.dirty {
            self.write_leaves()?;
            self.dirty = false;
        }
        self.pager.flush().map_err(Error::index)
    }

    /// Flush and release the index, surfacing any write error.
    pub fn close(mut self) -> Result<()> {
        let res = self.flush();
        self.closed = true;
        res
    }

    fn write_leaves(&mut self) -> Result<()> {
        let per_leaf = entries_per_leaf(self.meta.key_type, self.pager.page_capacity());
        if per_leaf == 0 {
            return Err(Error::IndexFailure("index page capacity is too small".into()));
        }
        let sorted: Vec<(IndexKey, RecordId)> = self.entries.iter().copied().collect();
        let mut puts: Vec<BatchPut> = sorted
            .chunks(per_leaf)
            .zip(1u64..)
            .map(|(chunk, key)| BatchPut::Raw {
                key,
                bytes: encode_leaf(chunk),
            })
            .collect();

        let old_leaves = self.meta.leaf_count;
        let new_leaves = puts.len() as u64;
        self.meta.entry_count = sorted.len() as u64;
        self.meta.leaf_count = new_leaves;
        puts.push(BatchPut::Raw {
            key: ROOT_PAGE_PKEY,
            bytes: self.meta.encode(),
        });
        self.pager.batch_put(&puts).map_err(Error::index)?;

        if old_leaves > new_leaves {
            let stale: Vec<PhysicalKey> = (new_leaves + 1..=old_leaves).collect();
            self.pager.free_many(&stale).map_err(Error::index)?;
        }
        tracing::trace!(
            target: "tblload-index",
            entries = self.meta.entry_count,
            leaves = new_leaves,
            "wrote index leaves"
        );
        Ok(())
    }
}

fn batch_read<P: Pager>(pager: &P, keys: &[PhysicalKey]) -> Result<Vec<Option<P::Blob>>> {
    use tblload_storage::{BatchGet, GetResult};

    let gets: Vec<BatchGet> = keys.iter().map(|&key| BatchGet::Raw { key }).collect();
    Ok(pager
        .batch_get(&gets)
        .map_err(Error::index)?
        .into_iter()
        .map(|res| match res {
            GetResult::Raw { bytes, .. } => Some(bytes),
            GetResult::Missing { .. } => None,
        })
        .collect())
}

impl<P: Pager> Drop for IndexFile<P> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.flush() {
            tracing::warn!(
                target: "tblload-index",
                error = %e,
                "failed to flush index on drop"
            );
        }
    }
}
