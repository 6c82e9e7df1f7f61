//! Secondary index artifacts for tblload.
//!
//! An index lives in its own page file named after the primary store and the
//! indexed column position (see [`index_artifact_name`]). It maps fixed-width
//! big-endian keys to [`RecordId`](tblload_types::RecordId)s and keeps them in
//! key order, duplicates included.

#![forbid(unsafe_code)]

pub mod index;
pub mod key;

mod page;

pub use index::{IndexFile, create_index, destroy_index, index_artifact_name};
pub use key::{IndexKey, KeyType};
