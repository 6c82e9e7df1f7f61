//! Shared helpers for tblload test binaries.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;

static INIT: Once = Once::new();

/// Header plus one row from the classic city dataset.
pub const SPRINGFIELD_CSV: &str = "name:VARCHAR,age:INT,population:LONG\nSpringfield,200,30000\n";

/// Initialize tracing for test binaries. Safe to call multiple times.
pub fn init_tracing_for_tests() {
    INIT.call_once(|| {
        use tracing_subscriber::filter::EnvFilter;
        use tracing_subscriber::fmt;
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        // A second subscriber from another harness in the same process is fine.
        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Write `contents` to `dir/name` and return the full path.
pub fn write_dataset(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write dataset fixture");
    path
}

/// Build a dataset with the city header and `rows` generated data lines.
///
/// Row `i` is `city{i},{i % 120},{i * 1000}` so populations are unique and
/// ascending.
pub fn city_dataset(rows: usize) -> String {
    let mut out = String::from("name:VARCHAR,age:INT,population:LONG\n");
    for i in 0..rows {
        out.push_str(&format!("city{i},{},{}\n", i % 120, i as u64 * 1000));
    }
    out
}
