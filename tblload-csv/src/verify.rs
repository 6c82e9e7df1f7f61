use std::path::Path;

use tblload_index::{IndexFile, IndexKey};
use tblload_result::{Error, Result};
use tblload_table::Table;
use tblload_types::{Value, decode_record};

use crate::IndexColumn;

/// Outcome of cross-checking a primary store against its index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Live records in the primary store.
    pub records: u64,
    /// Entries in the index.
    pub entries: u64,
    /// Entries whose record id resolves to no live record.
    pub dangling: u64,
    /// Entries whose record holds a different value than the key.
    pub mismatched: u64,
}

impl VerifyReport {
    pub fn is_consistent(&self) -> bool {
        self.records == self.entries && self.dangling == 0 && self.mismatched == 0
    }
}

/// Check that the index for `index_column` matches the store at `db_path`
/// one to one.
///
/// The schema is read from the store itself, so no dataset is needed.
pub fn verify_load(db_path: &Path, index_column: &IndexColumn) -> Result<VerifyReport> {
    let table = Table::open_existing(db_path)?;
    let resolved = index_column.resolve(table.schema())?;
    let index_path = resolved.artifact_name(db_path);
    let index = IndexFile::open(&index_path)?;
    if index.key_type() != resolved.key_type || index.attribute() != resolved.attribute {
        return Err(Error::IndexFailure(format!(
            "{} was built over attribute {} ({}), expected {} ({})",
            index_path.display(),
            index.attribute(),
            index.key_type(),
            resolved.attribute,
            resolved.key_type
        )));
    }

    let mut report = VerifyReport {
        records: table.record_count(),
        entries: index.len() as u64,
        ..VerifyReport::default()
    };
    for (key, rid) in index.entries() {
        let Some(bytes) = table.get(rid)? else {
            tracing::warn!(target: "tblload-loader", %rid, %key, "index entry has no record");
            report.dangling += 1;
            continue;
        };
        let values = decode_record(table.schema(), &bytes)?;
        let stored = match values.get(resolved.position) {
            Some(Value::Int(v)) => Some(IndexKey::Int(*v)),
            Some(Value::Long(v)) => Some(IndexKey::Long(*v)),
            _ => None,
        };
        if stored != Some(key) {
            tracing::warn!(target: "tblload-loader", %rid, %key, "index key disagrees with record");
            report.mismatched += 1;
        }
    }

    tracing::info!(
        target: "tblload-loader",
        records = report.records,
        entries = report.entries,
        dangling = report.dangling,
        mismatched = report.mismatched,
        "verified index"
    );
    Ok(report)
}
