use std::env;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use tblload_csv::{
    DEFAULT_DATASET_PATH, DEFAULT_DB_PATH, DEFAULT_INDEX_COLUMN, DEFAULT_MAX_LINE_LEN,
    DEFAULT_PROGRESS_INTERVAL, IndexColumn, LoadEvent, LoadOptions, LoadSummary, RowErrorPolicy,
    load_csv_with_progress, verify_load,
};
use tblload_result::{Error, Result};
use tblload_types::DEFAULT_RECORD_CAPACITY;

const SKIP_BAD_ROWS_ENV: &str = "TBLLOAD_SKIP_BAD_ROWS";

fn main() {
    // Initialize tracing subscriber to respect RUST_LOG environment variable
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(err) = run() {
        tracing::error!(target: "tblload-loader", error = %err, "tblload failed");
        eprintln!("error: {err}");
        process::exit(1);
    }
}

#[derive(Parser)]
#[command(
    name = "tblload",
    version,
    about = "Bulk-load a typed delimited dataset into a paged record store with one secondary index",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    /// Without a subcommand, `tblload` loads with these options.
    #[command(flatten)]
    load: LoadArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Load a dataset into the store and rebuild the index.
    Load(LoadArgs),
    /// Check that the index and the store agree one to one.
    Verify(VerifyArgs),
}

#[derive(Args, Clone)]
struct LoadArgs {
    /// Dataset whose first line declares `name:TYPE` columns.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_DATASET_PATH)]
    dataset: PathBuf,
    /// Primary store file; the index is written next to it.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_DB_PATH)]
    db: PathBuf,
    /// Column to index, by name or zero-based position.
    #[arg(long = "index-column", value_name = "COLUMN", default_value = DEFAULT_INDEX_COLUMN, value_parser = parse_index_column)]
    index_column: IndexColumn,
    #[arg(long, default_value_t = ',')]
    delimiter: char,
    /// Longest accepted line in bytes, terminator excluded.
    #[arg(long = "max-line-len", value_name = "BYTES", default_value_t = DEFAULT_MAX_LINE_LEN)]
    max_line_len: usize,
    /// Byte capacity of one encoded record.
    #[arg(long = "record-capacity", value_name = "BYTES", default_value_t = DEFAULT_RECORD_CAPACITY)]
    record_capacity: usize,
    /// Skip rows that fail to parse or encode (or set TBLLOAD_SKIP_BAD_ROWS=1).
    #[arg(long = "skip-bad-rows")]
    skip_bad_rows: bool,
    /// Rows between progress lines; 0 disables them.
    #[arg(long = "progress-every", value_name = "ROWS", default_value_t = DEFAULT_PROGRESS_INTERVAL)]
    progress_every: usize,
}

#[derive(Args, Clone)]
struct VerifyArgs {
    #[arg(long, value_name = "PATH", default_value = DEFAULT_DB_PATH)]
    db: PathBuf,
    #[arg(long = "index-column", value_name = "COLUMN", default_value = DEFAULT_INDEX_COLUMN, value_parser = parse_index_column)]
    index_column: IndexColumn,
}

fn parse_index_column(value: &str) -> std::result::Result<IndexColumn, String> {
    value.parse::<IndexColumn>().map_err(|err| err.to_string())
}

fn skip_requested(cli_flag: bool) -> bool {
    if cli_flag {
        return true;
    }
    match env::var(SKIP_BAD_ROWS_ENV) {
        Ok(value) => {
            let normalized = value.trim().to_ascii_lowercase();
            !matches!(normalized.as_str(), "" | "0" | "false" | "off")
        }
        Err(env::VarError::NotPresent) => false,
        Err(env::VarError::NotUnicode(_)) => {
            tracing::warn!(
                target: "tblload-loader",
                "{SKIP_BAD_ROWS_ENV} is not valid UTF-8; ignoring it"
            );
            false
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Some(Command::Load(args)) => run_load(args),
        Some(Command::Verify(args)) => run_verify(args),
        None => run_load(cli.load),
    }
}

fn run_load(args: LoadArgs) -> Result<()> {
    let policy = if skip_requested(args.skip_bad_rows) {
        RowErrorPolicy::Skip
    } else {
        RowErrorPolicy::Abort
    };
    let options = LoadOptions::default()
        .with_dataset_path(args.dataset)
        .with_db_path(args.db)
        .with_index_column(args.index_column)
        .with_delimiter(args.delimiter)
        .with_max_line_len(args.max_line_len)
        .with_record_capacity(args.record_capacity)
        .with_row_error_policy(policy)
        .with_progress_interval(args.progress_every);

    let summary = load_csv_with_progress(&options, |event| match event {
        LoadEvent::Begin { dataset } => {
            println!("  -> Loading {}...", dataset.display());
        }
        LoadEvent::Progress {
            rows,
            elapsed,
            since_last,
        } => {
            println!(
                "     {rows} rows loaded... (+{:.2}s, total {:.2}s)",
                since_last.as_secs_f64(),
                elapsed.as_secs_f64()
            );
        }
        LoadEvent::Complete {
            rows,
            skipped,
            elapsed,
        } => {
            println!(
                "     finished ({rows} rows, {skipped} skipped) in {:.2}s",
                elapsed.as_secs_f64()
            );
        }
    })?;
    print_load_summary(&summary, &options);
    Ok(())
}

fn print_load_summary(summary: &LoadSummary, options: &LoadOptions) {
    println!("\nLoaded {}:", options.dataset_path.display());
    println!("  schema        {}", summary.schema.to_header(options.delimiter));
    println!("  store         {}", options.db_path.display());
    println!(
        "  index         {} (column '{}', {} keys)",
        summary.index_path.display(),
        summary.index_column.name(),
        summary.index_column.key_type
    );
    println!("  rows loaded   {}", summary.rows_loaded);
    if summary.rows_skipped > 0 {
        println!("  rows skipped  {}", summary.rows_skipped);
    }
    if summary.rows_reindexed > 0 {
        println!("  reindexed     {}", summary.rows_reindexed);
    }
    println!("  index entries {}", summary.index_entries);
    println!("  elapsed       {:.2}s", summary.elapsed.as_secs_f64());
}

fn run_verify(args: VerifyArgs) -> Result<()> {
    let report = verify_load(&args.db, &args.index_column)?;
    println!(
        "records {} | entries {} | dangling {} | mismatched {}",
        report.records, report.entries, report.dangling, report.mismatched
    );
    if !report.is_consistent() {
        return Err(Error::IndexFailure(format!(
            "{} does not match its index",
            args.db.display()
        )));
    }
    println!("consistent");
    Ok(())
}
