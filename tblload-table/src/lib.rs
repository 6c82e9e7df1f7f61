//! Primary record store for tblload.
//!
//! A [`Table`] persists opaque encoded records on top of any
//! [`Pager`](tblload_storage::Pager) and hands back a
//! [`RecordId`](tblload_types::RecordId) for each insert. The schema the store
//! was created with lives in its root page, so a reopened store can be checked
//! against (or adopt) the dataset schema.

pub mod table;

mod meta;
mod page;

pub use table::Table;
