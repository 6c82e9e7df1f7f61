#![forbid(unsafe_code)]

use std::path::Path;
use std::sync::Arc;

use tblload_result::{Error, Result};
use tblload_storage::constants::ROOT_PAGE_PKEY;
use tblload_storage::{Pager, PhysicalKey, SimdRDrivePager};
use tblload_types::{RecordId, Schema};

use crate::meta::TableMeta;
use crate::page::{DataPage, NO_PAGE};

/// Heap store of encoded records, keyed by [`RecordId`].
///
/// Records are appended to a chain of slotted pages that starts at
/// `first_page` and is linked through each page's `next` field. The root page
/// (key 0) holds the schema and the chain bounds. Data pages are written
/// through on every mutation; the root page is written on [`Table::flush`],
/// [`Table::close`], or drop.
pub struct Table<P: Pager = SimdRDrivePager> {
    pager: Arc<P>,
    meta: TableMeta,
    /// Cached copy of the last page in the chain, the only page inserts touch.
    tail: Option<(PhysicalKey, DataPage)>,
    meta_dirty: bool,
    closed: bool,
}

impl Table<SimdRDrivePager> {
    /// Open the store at `path`, creating it when missing and
    /// `create_if_missing` is set.
    ///
    /// An existing store must have been created with an identical schema.
    pub fn open(path: &Path, schema: Schema, create_if_missing: bool) -> Result<Self> {
        if !path.exists() && !create_if_missing {
            return Err(Error::StorageFailure(format!(
                "primary store {} does not exist",
                path.display()
            )));
        }
        let pager = SimdRDrivePager::open(path)
            .map_err(|e| Error::StorageFailure(format!("{}: {e}", path.display())))?;

        tracing::debug!(
            target: "tblload-table",
            path = %path.display(),
            "opening primary store"
        );
        Self::with_pager(Arc::new(pager), schema, create_if_missing)
    }

    /// Open an existing store and adopt the schema persisted in its root page.
    pub fn open_existing(path: &Path) -> Result<Self> {
        let pager = SimdRDrivePager::open_existing(path)
            .map_err(|e| Error::StorageFailure(format!("{}: {e}", path.display())))?;
        let meta = read_meta(&pager)?.ok_or_else(|| {
            Error::StorageFailure(format!("{} has no primary store root page", path.display()))
        })?;
        Ok(Self::from_meta(Arc::new(pager), meta))
    }
}

impl<P: Pager> Table<P> {
    /// Open a store on an arbitrary pager.
    pub fn with_pager(pager: Arc<P>, schema: Schema, create_if_missing: bool) -> Result<Self> {
        match read_meta(pager.as_ref())? {
            Some(meta) => {
                if meta.schema != schema {
                    return Err(Error::StorageFailure(format!(
                        "schema mismatch: store has [{}], dataset has [{}]",
                        meta.schema.to_header(','),
                        schema.to_header(',')
                    )));
                }
                Ok(Self::from_meta(pager, meta))
            }
            None if create_if_missing => {
                let mut table = Self::from_meta(pager, TableMeta::empty(schema));
                table.meta_dirty = true;
                table.write_meta()?;
                Ok(table)
            }
            None => Err(Error::StorageFailure(
                "pager holds no primary store root page".into(),
            )),
        }
    }

    fn from_meta(pager: Arc<P>, meta: TableMeta) -> Self {
        Self {
            pager,
            meta,
            tail: None,
            meta_dirty: false,
            closed: false,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.meta.schema
    }

    /// Number of live records.
    pub fn record_count(&self) -> u64 {
        self.meta.record_count
    }

    /// Largest record this store accepts.
    pub fn max_record_len(&self) -> usize {
        DataPage::max_record_len(self.pager.page_capacity()).min(u16::MAX as usize)
    }

    /// Append `record` and return its locator.
    pub fn insert(&mut self, record: &[u8]) -> Result<RecordId> {
        let limit = self.max_record_len();
        if record.len() > limit {
            return Err(Error::StorageFailure(format!(
                "record of {} bytes exceeds the page limit of {limit}",
                record.len()
            )));
        }
        let capacity = self.pager.page_capacity();

        self.load_tail()?;
        let reuse_tail = matches!(&self.tail, Some((_, page)) if page.fits(record.len(), capacity));
        if !reuse_tail {
            self.start_page()?;
        }

        let (key, page) = self
            .tail
            .as_mut()
            .ok_or_else(|| Error::Internal("primary store has no tail page".into()))?;
        let slot = page.push(record);
        let key = *key;
        self.pager
            .put_one(key, page.encode())
            .map_err(Error::storage)?;

        self.meta.record_count += 1;
        self.meta_dirty = true;
        Ok(RecordId::new(key, slot))
    }

    /// Fetch the bytes stored under `rid`, or `None` if there is no live
    /// record there.
    pub fn get(&self, rid: RecordId) -> Result<Option<Vec<u8>>> {
        if let Some((key, page)) = &self.tail {
            if *key == rid.page {
                return Ok(page.get(rid.slot).map(<[u8]>::to_vec));
            }
        }
        Ok(self
            .read_page(rid.page)?
            .and_then(|page| page.get(rid.slot).map(<[u8]>::to_vec)))
    }

    /// Delete the record under `rid`. Returns whether a live record was
    /// removed.
    pub fn remove(&mut self, rid: RecordId) -> Result<bool> {
        let cached = matches!(&self.tail, Some((key, _)) if *key == rid.page);
        let mut owned;
        let page = if cached {
            match self.tail.as_mut() {
                Some((_, page)) => page,
                None => return Ok(false),
            }
        } else {
            owned = match self.read_page(rid.page)? {
                Some(page) => page,
                None => return Ok(false),
            };
            &mut owned
        };

        if !page.kill(rid.slot) {
            return Ok(false);
        }
        self.pager
            .put_one(rid.page, page.encode())
            .map_err(Error::storage)?;
        self.meta.record_count = self.meta.record_count.saturating_sub(1);
        self.meta_dirty = true;
        Ok(true)
    }

    /// All live records in insertion order.
    pub fn scan(&self) -> Result<Vec<(RecordId, Vec<u8>)>> {
        let mut out = Vec::with_capacity(self.meta.record_count as usize);
        let mut key = self.meta.first_page;
        while key != NO_PAGE {
            let page = self.read_page(key)?.ok_or_else(|| {
                Error::Corrupt(format!("page chain references missing page {key}"))
            })?;
            out.extend(
                page.live()
                    .map(|(slot, bytes)| (RecordId::new(key, slot), bytes.to_vec())),
            );
            key = page.next();
        }
        Ok(out)
    }

    /// Persist the root page and make all writes durable.
    pub fn flush(&mut self) -> Result<()> {
        self.write_meta()?;
        self.pager.flush().map_err(Error::storage)
    }

    /// Flush and release the store, surfacing any write error.
    pub fn close(mut self) -> Result<()> {
        let res = self.flush();
        self.closed = true;
        tracing::debug!(
            target: "tblload-table",
            records = self.meta.record_count,
            "closed primary store"
        );
        res
    }

    fn load_tail(&mut self) -> Result<()> {
        let last = self.meta.last_page;
        if last == NO_PAGE || matches!(&self.tail, Some((key, _)) if *key == last) {
            return Ok(());
        }
        let page = self
            .read_page(last)?
            .ok_or_else(|| Error::Corrupt(format!("last data page {last} is missing")))?;
        self.tail = Some((last, page));
        Ok(())
    }

    /// Allocate a fresh page and link it after the current tail.
    fn start_page(&mut self) -> Result<()> {
        let key = self
            .pager
            .alloc_many(1)
            .map_err(Error::storage)?
            .pop()
            .ok_or_else(|| Error::StorageFailure("pager allocated no page".into()))?;

        if let Some((prev_key, prev)) = self.tail.as_mut() {
            prev.set_next(key);
            self.pager
                .put_one(*prev_key, prev.encode())
                .map_err(Error::storage)?;
        }
        if self.meta.first_page == NO_PAGE {
            self.meta.first_page = key;
        }
        self.meta.last_page = key;
        self.meta_dirty = true;
        self.tail = Some((key, DataPage::new()));
        tracing::trace!(target: "tblload-table", page = key, "started data page");
        Ok(())
    }

    fn read_page(&self, key: PhysicalKey) -> Result<Option<DataPage>> {
        if key == ROOT_PAGE_PKEY {
            return Ok(None);
        }
        match self.pager.get_one(key).map_err(Error::storage)? {
            Some(blob) => DataPage::decode(key, blob.as_ref()).map(Some),
            None => Ok(None),
        }
    }

    fn write_meta(&mut self) -> Result<()> {
        if !self.meta_dirty {
            return Ok(());
        }
        let bytes = self.meta.encode()?;
        self.pager
            .put_one(ROOT_PAGE_PKEY, bytes)
            .map_err(Error::storage)?;
        self.meta_dirty = false;
        Ok(())
    }
}

fn read_meta<P: Pager>(pager: &P) -> Result<Option<TableMeta>> {
    match pager.get_one(ROOT_PAGE_PKEY).map_err(Error::storage)? {
        Some(blob) => TableMeta::decode(blob.as_ref()).map(Some),
        None => Ok(None),
    }
}

impl<P: Pager> Drop for Table<P> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.flush() {
            tracing::warn!(
                target: "tblload-table",
                error = %e,
                "failed to flush primary store on drop"
            );
        }
    }
}
