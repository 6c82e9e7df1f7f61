use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tblload_index::{IndexFile, KeyType, create_index, destroy_index};
use tblload_result::{Error, Result};
use tblload_storage::Pager;
use tblload_table::Table;
use tblload_types::{RecordBuffer, RecordId, Schema, decode_record, encode_record};

use crate::reader::{RawLine, RowReader, parse_schema, split_line};
use crate::{LoadOptions, ResolvedIndexColumn, RowErrorPolicy};

/// Destination for encoded records.
pub trait RecordSink {
    fn insert(&mut self, record: &[u8]) -> Result<RecordId>;

    /// Undo an insert. Returns whether a record was removed.
    fn remove(&mut self, rid: RecordId) -> Result<bool>;
}

/// Destination for `(key, rid)` index entries.
pub trait EntrySink {
    fn insert_entry(&mut self, key_type: KeyType, key: &[u8], rid: RecordId) -> Result<()>;
}

impl<P: Pager> RecordSink for Table<P> {
    fn insert(&mut self, record: &[u8]) -> Result<RecordId> {
        Table::insert(self, record)
    }

    fn remove(&mut self, rid: RecordId) -> Result<bool> {
        Table::remove(self, rid)
    }
}

impl<P: Pager> EntrySink for IndexFile<P> {
    fn insert_entry(&mut self, key_type: KeyType, key: &[u8], rid: RecordId) -> Result<()> {
        IndexFile::insert_entry(self, key_type, key, rid)
    }
}

/// Status updates emitted while a dataset loads.
#[derive(Debug, Clone)]
pub enum LoadEvent {
    Begin {
        dataset: PathBuf,
    },
    Progress {
        rows: u64,
        elapsed: Duration,
        since_last: Duration,
    },
    Complete {
        rows: u64,
        skipped: u64,
        elapsed: Duration,
    },
}

/// Row accounting for one pass over a dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowCounts {
    pub loaded: u64,
    pub skipped: u64,
}

#[derive(Debug, Clone)]
pub struct LoadSummary {
    pub schema: Schema,
    pub index_column: ResolvedIndexColumn,
    pub rows_loaded: u64,
    pub rows_skipped: u64,
    /// Records already in the store before this load and indexed again.
    pub rows_reindexed: u64,
    pub index_entries: u64,
    pub index_path: PathBuf,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadState {
    Init,
    SchemaDerived,
    PrimaryStoreOpen,
    IndexCreated,
    Loading,
    Closed,
}

fn enter(state: LoadState) {
    tracing::debug!(target: "tblload-loader", ?state, "load state");
}

/// Load `options.dataset_path` into `options.db_path`.
pub fn load_csv(options: &LoadOptions) -> Result<LoadSummary> {
    load_csv_with_progress(options, |_| {})
}

/// Load a dataset while reporting [`LoadEvent`]s to `on_progress`.
///
/// The primary store is opened or created and appended to. The record
/// buffer never grows past the largest record one store page holds, so an
/// oversized row fails to encode instead of failing in the store. The index
/// artifact for the chosen column is destroyed and rebuilt, first from any
/// records already in the store and then row by row as the dataset loads.
pub fn load_csv_with_progress<F>(options: &LoadOptions, mut on_progress: F) -> Result<LoadSummary>
where
    F: FnMut(LoadEvent),
{
    options.validate()?;
    let started = Instant::now();
    enter(LoadState::Init);

    let dataset = &options.dataset_path;
    let file = File::open(dataset).map_err(|e| Error::dataset_unreadable(dataset, e))?;
    let mut reader =
        RowReader::new(BufReader::new(file), options.max_line_len).with_source(dataset);
    let header = reader.read_header().map_err(|e| match e {
        Error::LineTooLong { .. } => Error::dataset_unreadable(dataset, e),
        other => other,
    })?;
    let schema = parse_schema(&header, options.delimiter)?;
    enter(LoadState::SchemaDerived);
    tracing::info!(
        target: "tblload-loader",
        dataset = %dataset.display(),
        columns = schema.num_columns(),
        header = %schema.to_header(options.delimiter),
        "derived schema"
    );

    let index_column = options.index_column.resolve(&schema)?;
    let mut table = Table::open(&options.db_path, schema.clone(), true)?;
    enter(LoadState::PrimaryStoreOpen);

    // A record must fit one store page, so that is the real buffer capacity.
    let page_limit = table.max_record_len();
    let capped;
    let options = if options.record_capacity > page_limit {
        tracing::info!(
            target: "tblload-loader",
            requested = options.record_capacity,
            limit = page_limit,
            "record capacity capped at the store page limit"
        );
        capped = options.clone().with_record_capacity(page_limit);
        &capped
    } else {
        options
    };

    let index_path = index_column.artifact_name(&options.db_path);
    destroy_index(&index_path)?;
    create_index(&options.db_path, index_column.attribute, index_column.key_type)?;
    let mut index = IndexFile::open(&index_path)?;
    enter(LoadState::IndexCreated);

    let rows_reindexed = reindex_existing(&table, &index_column, &mut index)?;
    if rows_reindexed > 0 {
        tracing::info!(
            target: "tblload-loader",
            rows = rows_reindexed,
            "indexed records already in the store"
        );
    }

    on_progress(LoadEvent::Begin {
        dataset: dataset.clone(),
    });
    enter(LoadState::Loading);
    let counts = load_rows(
        &mut reader,
        &schema,
        &index_column,
        &mut table,
        &mut index,
        options,
        &mut on_progress,
    )?;

    let index_entries = index.len() as u64;
    index.close()?;
    table.close()?;
    enter(LoadState::Closed);

    let elapsed = started.elapsed();
    on_progress(LoadEvent::Complete {
        rows: counts.loaded,
        skipped: counts.skipped,
        elapsed,
    });
    tracing::info!(
        target: "tblload-loader",
        rows = counts.loaded,
        skipped = counts.skipped,
        index_entries,
        elapsed_ms = elapsed.as_millis() as u64,
        "load complete"
    );

    Ok(LoadSummary {
        schema,
        index_column,
        rows_loaded: counts.loaded,
        rows_skipped: counts.skipped,
        rows_reindexed,
        index_entries,
        index_path,
        elapsed,
    })
}

/// Index every record already present in `table`.
fn reindex_existing<P: Pager, E: EntrySink>(
    table: &Table<P>,
    index_column: &ResolvedIndexColumn,
    index: &mut E,
) -> Result<u64> {
    if table.record_count() == 0 {
        return Ok(0);
    }
    let mut n = 0u64;
    for (rid, bytes) in table.scan()? {
        let values = decode_record(table.schema(), &bytes)?;
        let value = values.get(index_column.position).ok_or_else(|| {
            Error::Corrupt(format!("record {rid} is missing column {}", index_column.position))
        })?;
        let key = index_column.key_from_value(value)?;
        index.insert_entry(index_column.key_type, &key, rid)?;
        n += 1;
    }
    Ok(n)
}

/// Load every remaining line of `reader` into `store` and `index`.
///
/// Each row is tokenized, checked against the schema, encoded, and keyed
/// before either sink is touched. If the index rejects an entry, the record
/// just inserted into `store` is removed again before the error is returned,
/// so the sinks never disagree about a row.
pub fn load_rows<R, S, E, F>(
    reader: &mut RowReader<R>,
    schema: &Schema,
    index_column: &ResolvedIndexColumn,
    store: &mut S,
    index: &mut E,
    options: &LoadOptions,
    on_progress: &mut F,
) -> Result<RowCounts>
where
    R: BufRead,
    S: RecordSink,
    E: EntrySink,
    F: FnMut(LoadEvent),
{
    let mut buffer = RecordBuffer::new(options.record_capacity)?;
    let mut counts = RowCounts::default();
    let started = Instant::now();
    let mut last_report = started;

    while let Some(line) = reader.next_line() {
        let outcome = line.and_then(|line| {
            load_one(&line, schema, index_column, &mut buffer, store, index, options.delimiter)
        });
        match outcome {
            Ok(()) => counts.loaded += 1,
            Err(e) if e.is_row_level() && options.on_row_error == RowErrorPolicy::Skip => {
                tracing::warn!(
                    target: "tblload-loader",
                    line = reader.line_number(),
                    error = %e,
                    "skipping row"
                );
                counts.skipped += 1;
                continue;
            }
            Err(e) => {
                tracing::error!(
                    target: "tblload-loader",
                    line = reader.line_number(),
                    error = %e,
                    "load aborted"
                );
                return Err(e);
            }
        }

        if options.progress_interval > 0 && counts.loaded % options.progress_interval as u64 == 0 {
            let now = Instant::now();
            on_progress(LoadEvent::Progress {
                rows: counts.loaded,
                elapsed: now.duration_since(started),
                since_last: now.duration_since(last_report),
            });
            last_report = now;
        }
    }
    Ok(counts)
}

fn load_one<S: RecordSink, E: EntrySink>(
    line: &RawLine,
    schema: &Schema,
    index_column: &ResolvedIndexColumn,
    buffer: &mut RecordBuffer,
    store: &mut S,
    index: &mut E,
    delimiter: char,
) -> Result<()> {
    let fields = split_line(&line.text, delimiter);
    if fields.len() != schema.num_columns() {
        return Err(Error::SchemaMismatch {
            line: line.number,
            expected: schema.num_columns(),
            found: fields.len(),
        });
    }

    buffer.clear();
    encode_record(schema, &fields, buffer)?;
    let key = index_column.key_from_field(fields[index_column.position])?;

    let rid = store.insert(buffer.as_bytes())?;
    if let Err(e) = index.insert_entry(index_column.key_type, &key, rid) {
        match store.remove(rid) {
            Ok(_) => tracing::debug!(
                target: "tblload-loader",
                line = line.number,
                %rid,
                "rolled back record after index failure"
            ),
            Err(undo) => tracing::error!(
                target: "tblload-loader",
                line = line.number,
                %rid,
                error = %undo,
                "rollback of record failed"
            ),
        }
        return Err(e);
    }
    tracing::trace!(target: "tblload-loader", line = line.number, %rid, "row loaded");
    Ok(())
}
